//! Course report parsing: name, weighting table and marks.
//!
//! A missing weighting or assessments table is not an error; the course
//! carries `None` for it. A table that is present but unreadable is.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{HarvesterError, Result};
use crate::markup::{extract_elements, find_balanced};
use crate::types::{Course, Mark, Strand};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COURSE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<h2>(\S+?)</h2>").expect("valid regex"));

/// Colour that opens the weighting table (its Knowledge/Understanding row).
const WEIGHT_TABLE_MARKER: &str = "#ffffaa";

/// Bytes of text after the marker that hold the whole weighting table.
const WEIGHT_TABLE_WINDOW: usize = 800;

/// Rows in the weighting table: K, T, C, A, Other and Final.
const WEIGHT_TABLE_ROWS: usize = 6;

/// Row of the Final (culminating) share within the weighting table.
const FINAL_WEIGHT_ROW: usize = 5;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9.]+)%").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ASSESSMENT_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<table border="1" cellpadding="3" cellspacing="0" width="100%">"#)
        .expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TABLE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<table|</table>").expect("valid regex"));

const TABLE_OPEN: &str = "<table";

/// Teacher feedback rows interleaved with the assessment rows.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static FEEDBACK_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<tr> <td colspan="[0-5]" bgcolor="white"> [^&]*&nbsp; </td> </tr>"#)
        .expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ROW_BEGIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<tr>").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ROW_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<tr>|</tr>").expect("valid regex"));

const ROW_OPEN: &str = "<tr>";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MORE_ROWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<tr>.+</tr>").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CELL_BEGIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<td").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CELL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<td|</td>").expect("valid regex"));

const CELL_OPEN: &str = "<td";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MORE_CELLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<td.+</td>").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ASSESSMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<td rowspan="2">(.+?)</td>"#).expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static STRAND_COLOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<td bgcolor="([#0-9a-f]+)""#).expect("valid regex"));

/// One mark inside a strand cell. "no mark" and "no weight" leave groups empty.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"align="center" id="e,(?P<id>\d+)">"#,
        r"(?:no mark|(?P<numerator>\d+(?:\.\d+)?)? / (?P<denominator>\d+(?:\.\d+)?)[^<]+<br> ",
        r#"<font size="-2">(?:no weight|weight=(?P<weight>\d+(?:\.\d+)?))</font>)"#,
    ))
    .expect("valid regex")
});

/// Parse one course's whitespace-normalised report page.
///
/// # Arguments
/// * `page` - Report page text
/// * `student_id` - Account the marks are attributed to
/// * `enrollment_date` - Enrollment month from the homepage (YYYY-MM)
///
/// # Errors
/// `MalformedPage` when the course name is missing, the weighting table is
/// unreadable, or a mark row is inconsistent (including unknown strand colours).
pub fn parse_report(page: &str, student_id: &str, enrollment_date: &str) -> Result<Course> {
    let name = parse_course_name(page)
        .ok_or_else(|| HarvesterError::malformed("course name not found", page))?;

    let weights = parse_weights(page)?;
    if weights.is_none() {
        tracing::warn!(course = name, "course weights not found");
    }

    let marks = parse_marks(page, student_id)?;
    if marks.is_none() {
        tracing::warn!(course = name, "course assessments not found");
    }

    Ok(Course::new(name, enrollment_date, weights, marks))
}

/// Course code from the page heading.
#[must_use]
pub fn parse_course_name(page: &str) -> Option<&str> {
    COURSE_NAME
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Course weighting as `[K, T, C, A, Final]` percentages.
///
/// Strand rows carry two percentages (category weighting, then course
/// weighting); the course weighting is used. The Final row carries one. The
/// Other row has no share of its own and is skipped.
pub fn parse_weights(page: &str) -> Result<Option<Vec<f64>>> {
    let Some(start) = page.find(WEIGHT_TABLE_MARKER) else {
        return Ok(None);
    };

    let mut end = (start + WEIGHT_TABLE_WINDOW).min(page.len());
    while !page.is_char_boundary(end) {
        end -= 1;
    }
    let window = &page[start..end];

    let rows: Vec<&str> = window.split('#').skip(1).take(WEIGHT_TABLE_ROWS).collect();
    if rows.len() < WEIGHT_TABLE_ROWS {
        return Err(HarvesterError::malformed(
            format!(
                "weight table has {} rows, expected {WEIGHT_TABLE_ROWS}",
                rows.len()
            ),
            window,
        ));
    }

    let mut weights = Vec::with_capacity(Strand::ALL.len());
    for row in &rows[..4] {
        let course_weighting = row.find('%').map_or(*row, |idx| &row[idx + 1..]);
        weights.push(parse_percentage(course_weighting, row)?);
    }
    weights.push(parse_percentage(rows[FINAL_WEIGHT_ROW], rows[FINAL_WEIGHT_ROW])?);

    Ok(Some(weights))
}

fn parse_percentage(text: &str, row: &str) -> Result<f64> {
    PERCENTAGE
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .ok_or_else(|| {
            HarvesterError::malformed("found weight table but no readable percentage", row)
        })
}

/// All marks in the assessments table, or `None` if the page has no such table.
///
/// `Some(vec![])` means the table exists and holds no marks.
pub fn parse_marks(page: &str, student_id: &str) -> Result<Option<Vec<Mark>>> {
    let Some(table) = find_balanced(page, &ASSESSMENT_TABLE, &TABLE_BOUNDARY, TABLE_OPEN) else {
        return Ok(None);
    };

    let table = FEEDBACK_ROW.replace_all(table.content, "");
    let rows = extract_elements(&table, &ROW_BEGIN, &ROW_BOUNDARY, ROW_OPEN, &MORE_ROWS)?;

    let mut marks = Vec::new();
    // First row holds the column headers.
    for row in rows.iter().skip(1) {
        marks.extend(parse_row(row, student_id)?);
    }

    Ok(Some(marks))
}

fn parse_row(row: &str, student_id: &str) -> Result<Vec<Mark>> {
    let cells = extract_elements(row, &CELL_BEGIN, &CELL_BOUNDARY, CELL_OPEN, &MORE_CELLS)?;
    let Some((name_cell, strand_cells)) = cells.split_first() else {
        return Err(HarvesterError::malformed("found no data in row", row));
    };

    let name = ASSESSMENT_NAME
        .captures(name_cell)
        .map(|caps| caps[1].trim().to_string())
        .ok_or_else(|| HarvesterError::malformed("assessment name not found", row))?;

    let mut marks = Vec::new();
    for cell in strand_cells {
        let colour = STRAND_COLOUR
            .captures(cell)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| HarvesterError::malformed("no strand colour in cell", cell))?;
        let strand = Strand::from_colour(&colour).ok_or_else(|| {
            HarvesterError::malformed(format!("unknown strand colour '{colour}'"), row)
        })?;

        for caps in MARK.captures_iter(cell) {
            let number = |group: &str| -> Result<f64> {
                match caps.name(group) {
                    Some(m) => m.as_str().parse().map_err(|_| {
                        HarvesterError::malformed(format!("unreadable {group}"), cell)
                    }),
                    None => Ok(0.0),
                }
            };

            marks.push(Mark::new(
                strand,
                student_id,
                &caps["id"],
                name.as_str(),
                number("weight")?,
                number("numerator")?,
                number("denominator")?,
            ));
        }
    }

    Ok(marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WEIGHTS: &str = r##"<table border="1" cellpadding="3" cellspacing="0"> <tr> <th>Category</th> <th>Weighting</th> <th>Course Weighting</th> </tr> <tr> <td bgcolor="#ffffaa">Knowledge/Understanding</td> <td align="right">25%</td> <td align="right">17.5%</td> </tr> <tr> <td bgcolor="#c0fea4">Thinking</td> <td align="right">25%</td> <td align="right">17.5%</td> </tr> <tr> <td bgcolor="#afafff">Communication</td> <td align="right">25%</td> <td align="right">17.5%</td> </tr> <tr> <td bgcolor="#ffd490">Application</td> <td align="right">25%</td> <td align="right">17.5%</td> </tr> <tr> <td bgcolor="#eeeeee">Other</td> <td align="right">0%</td> <td align="right">0%</td> </tr> <tr> <td bgcolor="#cccccc">Final/Culminating</td> <td align="right">30%</td> </tr> </table>"##;

    fn mark_cell(colour: &str, id: &str, score: &str, weight: &str) -> String {
        format!(
            r#"<td bgcolor="{colour}" align="center" id="e,{id}">{score}<br> <font size="-2">{weight}</font> </td>"#
        )
    }

    fn report(rows: &str) -> String {
        format!(
            r#"<html> <h2>MHF4U1-01</h2> <table border="1" cellpadding="3" cellspacing="0" width="100%"> <tr> <th rowspan="2">Assessment</th> <th>K / U</th> <th>T</th> <th>C</th> <th>A</th> <th>F</th> </tr> {rows} </table> {WEIGHTS} </html>"#
        )
    }

    #[test]
    fn test_parse_course_name() {
        assert_eq!(parse_course_name("<h2>SBI4U1-03</h2>"), Some("SBI4U1-03"));
        assert_eq!(parse_course_name("<h2>Two words</h2>"), None);
        assert_eq!(parse_course_name("<h3>SBI4U1-03</h3>"), None);
    }

    #[test]
    fn test_parse_weights() {
        let weights = parse_weights(WEIGHTS).unwrap();
        assert_eq!(weights, Some(vec![17.5, 17.5, 17.5, 17.5, 30.0]));
    }

    #[test]
    fn test_missing_weight_table_is_none() {
        assert_eq!(parse_weights("<h2>X</h2> no table here").unwrap(), None);
    }

    #[test]
    fn test_truncated_weight_table_is_fatal() {
        let page = r##"<td bgcolor="#ffffaa">K</td> <td>25%</td> <td>17.5%</td> <td bgcolor="#c0fea4">T</td>"##;
        assert!(parse_weights(page).unwrap_err().is_malformed_page());
    }

    #[test]
    fn test_weight_row_without_percentage_is_fatal() {
        let page = WEIGHTS.replace("17.5%</td> </tr> <tr> <td bgcolor=\"#c0fea4\">", "n/a</td> </tr> <tr> <td bgcolor=\"#c0fea4\">");
        assert!(parse_weights(&page).unwrap_err().is_malformed_page());
    }

    #[test]
    fn test_parse_marks_by_strand() {
        let row = format!(
            r#"<tr> <td rowspan="2"> Unit 1 Test </td> {} {} {} {} {} </tr>"#,
            mark_cell("ffffaa", "101", "18 / 20 = 90%", "weight=2"),
            mark_cell("c0fea4", "101", "7.5 / 10 = 75%", "weight=2"),
            mark_cell("afafff", "101", "no mark", "no weight"),
            mark_cell("ffd490", "101", "0 / 5 = 0%", "no weight"),
            r##"<td bgcolor="#dedede" align="center" id="e,101"> </td>"##,
        );
        let marks = parse_marks(&report(&row), "uid-1").unwrap().unwrap();

        let summary: Vec<(Strand, f64, f64, f64)> = marks
            .iter()
            .map(|m| (m.strand, m.numerator, m.denominator, m.weight))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Strand::K, 18.0, 20.0, 2.0),
                (Strand::T, 7.5, 10.0, 2.0),
                (Strand::C, 0.0, 0.0, 0.0),
                (Strand::A, 0.0, 5.0, 0.0),
            ]
        );
        assert!(marks.iter().all(|m| m.name == "Unit 1 Test"));
        assert!(marks.iter().all(|m| m.portal_id == "101"));
        assert!(marks.iter().all(|m| m.student_id == "uid-1"));
    }

    #[test]
    fn test_feedback_rows_are_ignored() {
        let rows = format!(
            r#"<tr> <td rowspan="2">Quiz</td> {} </tr> <tr> <td colspan="4" bgcolor="white"> Good work &nbsp; </td> </tr>"#,
            mark_cell("ffffaa", "7", "4 / 5 = 80%", "weight=1"),
        );
        let marks = parse_marks(&report(&rows), "uid").unwrap().unwrap();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].name, "Quiz");
    }

    #[test]
    fn test_empty_table_is_some_empty() {
        let marks = parse_marks(&report(""), "uid").unwrap();
        assert_eq!(marks, Some(vec![]));
    }

    #[test]
    fn test_missing_table_is_none() {
        assert_eq!(parse_marks("<h2>X</h2>", "uid").unwrap(), None);
    }

    #[test]
    fn test_unknown_colour_is_fatal() {
        let row = format!(
            r#"<tr> <td rowspan="2">Lab</td> {} </tr>"#,
            mark_cell("123456", "9", "1 / 2 = 50%", "weight=1"),
        );
        let err = parse_marks(&report(&row), "uid").unwrap_err();
        assert!(err.to_string().contains("unknown strand colour '123456'"));
    }

    #[test]
    fn test_missing_name_cell_is_fatal() {
        let row = format!(
            "<tr> <td>Lab</td> {} </tr>",
            mark_cell("ffffaa", "9", "1 / 2 = 50%", "weight=1"),
        );
        assert!(parse_marks(&report(&row), "uid").unwrap_err().is_malformed_page());
    }

    #[test]
    fn test_parse_report_without_name_is_fatal() {
        let page = report("").replace("<h2>MHF4U1-01</h2>", "");
        assert!(parse_report(&page, "uid", "2024-09").unwrap_err().is_malformed_page());
    }

    #[test]
    fn test_parse_report() {
        let row = format!(
            r#"<tr> <td rowspan="2">Essay</td> {} </tr>"#,
            mark_cell("afafff", "55", "8 / 10 = 80%", "weight=3"),
        );
        let course = parse_report(&report(&row), "uid-9", "2024-09").unwrap();
        assert_eq!(course.name, "MHF4U1-01");
        assert_eq!(course.enrollment_date, "2024-09");
        assert_eq!(course.weights, Some(vec![17.5, 17.5, 17.5, 17.5, 30.0]));
        assert_eq!(course.mark_count(), 1);
        assert_eq!(
            course.marks.unwrap()[0],
            Mark::new(Strand::C, "uid-9", "55", "Essay", 3.0, 8.0, 10.0)
        );
    }
}
