//! Main harvester service that ties all components together.

use crate::config::validate_credentials;
use crate::error::Result;
use crate::homepage::parse_homepage;
use crate::portal::{Credentials, PortalClient};
use crate::report::parse_report;
use crate::types::Course;

/// Log in as one account and read every open course.
///
/// Reports are fetched one by one in homepage order on a single session. A
/// report that fails to parse is logged and skipped; any login, session or
/// network failure aborts the account.
///
/// # Arguments
/// * `portal` - Portal client
/// * `credentials` - Portal login
/// * `student_id` - Account id the marks are attributed to
pub fn harvest_courses(
    portal: &PortalClient,
    credentials: &Credentials,
    student_id: &str,
) -> Result<Vec<Course>> {
    validate_credentials(&credentials.username, &credentials.password)?;

    tracing::info!(username = %credentials.username, "logging in");
    let started = std::time::Instant::now();
    let session = portal.login(credentials)?;
    let homepage = portal.fetch_homepage(&session)?;
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "homepage retrieved"
    );

    let links = parse_homepage(&homepage)?;
    let mut courses = Vec::with_capacity(links.len());

    for link in &links {
        let page = portal.fetch_report(&session, link)?;
        match parse_report(&page, student_id, &link.enrollment_date) {
            Ok(course) => courses.push(course),
            Err(e) if e.is_malformed_page() => {
                tracing::warn!(course_id = %link.course_id, error = %e, "skipping unreadable report");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(courses)
}
