//! Homepage parsing: which courses are open and where their reports live.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{HarvesterError, Result};
use crate::markup::find_balanced;
use crate::types::CourseLink;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COURSE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"<tr bgcolor="#(?:dd|ee)ffff">"##).expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ROW_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<tr|</tr>").expect("valid regex"));

const ROW_OPEN: &str = "<tr";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static REPORT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="viewReport\.php\?subject_id=([0-9]+)&student_id=([0-9]+)">"#)
        .expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ENROLLMENT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2})-\d{2}").expect("valid regex"));

/// Extract the open courses from a whitespace-normalised homepage.
///
/// Rows without a date are empty and rows without a report link are closed;
/// both are logged and skipped. Output keeps the homepage order, which is the
/// order reports are fetched in.
///
/// # Errors
/// `NoOpenReports` when the page has no course rows at all.
pub fn parse_homepage(page: &str) -> Result<Vec<CourseLink>> {
    let mut row = find_balanced(page, &COURSE_ROW, &ROW_BOUNDARY, ROW_OPEN)
        .ok_or(HarvesterError::NoOpenReports)?;

    let mut links = Vec::new();
    loop {
        if let Some(link) = parse_course_row(row.content) {
            links.push(link);
        }

        match find_balanced(row.after, &COURSE_ROW, &ROW_BOUNDARY, ROW_OPEN) {
            Some(next) => row = next,
            None => break,
        }
    }

    Ok(links)
}

fn parse_course_row(row: &str) -> Option<CourseLink> {
    let Some(date) = ENROLLMENT_DATE.captures(row) else {
        tracing::warn!(row, "empty homepage row");
        return None;
    };
    let Some(ids) = REPORT_LINK.captures(row) else {
        tracing::warn!(row, "course closed");
        return None;
    };

    Some(CourseLink {
        course_id: ids[1].to_string(),
        student_id: ids[2].to_string(),
        enrollment_date: date[1].to_string(),
    })
}
