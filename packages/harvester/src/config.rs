//! Configuration constants and validation functions for the harvester.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{HarvesterError, Result};

/// Base URL of the TeachAssist student portal.
pub const PORTAL_BASE_URL: &str = "https://ta.yrdsb.ca";

/// Path the login form posts to.
pub const LOGIN_PATH: &str = "/live/index.php";

/// Path of a single course report page.
pub const REPORT_PATH: &str = "/live/students/viewReport.php";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient failures.
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Number of characters of page text kept in error messages.
pub const MAX_EXCERPT_CHARS: usize = 200;

/// Combined length of a student number and its portal password.
///
/// The portal issues 9-digit student numbers and 8-character passwords, so any
/// other combined length cannot log in and is rejected without a request.
pub const CREDENTIALS_LENGTH: usize = 17;

/// Enrollment date pattern: YYYY-MM.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ENROLLMENT_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid regex"));

/// Connection settings for the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: PORTAL_BASE_URL.to_string(),
            timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

impl PortalConfig {
    /// Point the harvester at another host (mirrors, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the login URL.
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}{LOGIN_PATH}", self.base_url)
    }

    /// Build the report page URL for one course.
    ///
    /// # Examples
    /// ```
    /// use gradesync_harvester::config::PortalConfig;
    ///
    /// assert_eq!(
    ///     PortalConfig::default().report_url("123", "456"),
    ///     "https://ta.yrdsb.ca/live/students/viewReport.php?subject_id=123&student_id=456"
    /// );
    /// ```
    #[must_use]
    pub fn report_url(&self, course_id: &str, student_id: &str) -> String {
        format!(
            "{}{REPORT_PATH}?subject_id={course_id}&student_id={student_id}",
            self.base_url
        )
    }
}

/// Validate a username/password pair before contacting the portal.
///
/// # Examples
/// ```
/// use gradesync_harvester::config::validate_credentials;
///
/// assert!(validate_credentials("123456789", "abcd1234").is_ok());
/// assert!(validate_credentials("123", "x").is_err());
/// ```
pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
    if username.chars().count() + password.chars().count() == CREDENTIALS_LENGTH {
        Ok(())
    } else {
        Err(HarvesterError::InvalidCredentials(username.to_string()))
    }
}

/// Validate an enrollment date (YYYY-MM).
///
/// # Examples
/// ```
/// use gradesync_harvester::config::validate_enrollment_date;
///
/// assert!(validate_enrollment_date("2024-09").is_ok());
/// assert!(validate_enrollment_date("2024-13").is_err());
/// assert!(validate_enrollment_date("2024-09-01").is_err());
/// ```
pub fn validate_enrollment_date(date: &str) -> Result<()> {
    if !ENROLLMENT_DATE_PATTERN.is_match(date) {
        return Err(HarvesterError::InvalidDate(date.to_string()));
    }

    chrono::NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d")
        .map_err(|_| HarvesterError::InvalidDate(date.to_string()))?;

    Ok(())
}
