//! Gradesync Harvester - Extract courses and marks from the TeachAssist portal.
//!
//! The portal renders reports in a fixed, slightly invalid HTML dialect. This
//! crate isolates elements by balanced-tag scanning over whitespace-normalised
//! text and turns report pages into content-addressed [`Course`] and [`Mark`]
//! values.
//!
//! # Example
//!
//! ```
//! use gradesync_harvester::{parse_report, Strand};
//!
//! let page = r#"<h2>MHF4U1-01</h2> <table border="1" cellpadding="3" cellspacing="0" width="100%"> <tr> <th>Assessment</th> </tr> <tr> <td rowspan="2">Quiz</td> <td bgcolor="ffffaa" align="center" id="e,7">4 / 5 = 80%<br> <font size="-2">weight=1</font> </td> </tr> </table>"#;
//!
//! let course = parse_report(page, "uid-1", "2024-09").unwrap();
//! assert_eq!(course.name, "MHF4U1-01");
//! assert_eq!(course.weights, None);
//! assert_eq!(course.marks.unwrap()[0].strand, Strand::K);
//! ```
//!
//! # Architecture
//!
//! - [`markup`]: Whitespace normalisation and balanced-tag scanning
//! - [`homepage`]: Open courses listed on the homepage
//! - [`report`]: Course name, weighting and marks from a report page
//! - [`identity`]: Content hashes for marks and courses
//! - [`types`]: Core data types (Course, Mark, Strand, CourseLink)
//! - [`config`]: Configuration constants and validation
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP client with retry
//! - [`portal`]: Login and sequential page fetching
//! - [`harvester`]: Full harvest of one account
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod harvester;
pub mod homepage;
pub mod http;
pub mod identity;
pub mod markup;
pub mod portal;
pub mod report;
pub mod types;

// Re-export main functions
pub use harvester::harvest_courses;
pub use homepage::parse_homepage;
pub use report::parse_report;

// Re-export commonly used items
pub use config::PortalConfig;
pub use error::{HarvesterError, Result};
pub use portal::{Credentials, PortalClient};
pub use types::{Course, CourseLink, Mark, Strand};
