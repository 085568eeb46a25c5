//! Error types for the harvester.
//!
//! `MalformedPage` is fatal for the single page being parsed; callers that walk
//! several course reports catch it per course. Login, session and network errors
//! are fatal for the whole account being harvested.

use thiserror::Error;

use crate::config::MAX_EXCERPT_CHARS;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// The page does not have the structure the parser relies on.
    #[error("Malformed page: {reason} (near: {excerpt})")]
    MalformedPage { reason: String, excerpt: String },

    /// Credentials rejected before contacting the portal.
    #[error("Invalid credentials for user '{0}'")]
    InvalidCredentials(String),

    /// The portal did not hand out a usable session.
    #[error("Login failed for user '{username}': {reason}")]
    Login { username: String, reason: String },

    /// The session could not be used to load a page.
    #[error("Session error: {0}")]
    Session(String),

    /// The homepage lists no course rows at all.
    #[error("No open reports found on homepage")]
    NoOpenReports,

    /// Invalid enrollment date format.
    #[error("Invalid enrollment date: '{0}'. Expected YYYY-MM (e.g., 2024-09)")]
    InvalidDate(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to download a portal page.
    #[error("Failed to load {context}: {source}")]
    PageDownload {
        context: String,
        #[source]
        source: Box<HarvesterError>,
    },

    /// All retry attempts exhausted.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Invalid portal URL.
    #[error("Invalid portal URL: {0}")]
    Url(#[from] url::ParseError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvesterError {
    /// Build a `MalformedPage` error, keeping only the start of the offending text.
    pub fn malformed(reason: impl Into<String>, text: &str) -> Self {
        Self::MalformedPage {
            reason: reason.into(),
            excerpt: excerpt(text),
        }
    }

    /// Wrap an error with the page it happened on.
    #[must_use]
    pub fn while_loading(self, context: impl Into<String>) -> Self {
        Self::PageDownload {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error only invalidates the page it was raised for.
    #[must_use]
    pub fn is_malformed_page(&self) -> bool {
        matches!(self, Self::MalformedPage { .. })
    }
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
