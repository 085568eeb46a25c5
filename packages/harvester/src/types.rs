//! Core data types for the harvester.
//!
//! `Course` and `Mark` are value objects: produced once per parse and never
//! mutated. Their `hash` fields are content addresses computed on construction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{course_hash, mark_hash};

/// Assessment categories reported by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strand {
    /// Knowledge/Understanding.
    K,

    /// Thinking.
    T,

    /// Communication.
    C,

    /// Application.
    A,

    /// Final/culminating.
    F,
}

impl Strand {
    /// All strands, in report column order.
    pub const ALL: [Strand; 5] = [Self::K, Self::T, Self::C, Self::A, Self::F];

    /// Get the string value used in hashes and output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::K => "k",
            Self::T => "t",
            Self::C => "c",
            Self::A => "a",
            Self::F => "f",
        }
    }

    /// Resolve the cell background colour the report uses for a strand.
    ///
    /// The final column's colour is written with a leading `#`, the others without.
    #[must_use]
    pub fn from_colour(colour: &str) -> Option<Self> {
        match colour {
            "ffffaa" => Some(Self::K),
            "c0fea4" => Some(Self::T),
            "afafff" => Some(Self::C),
            "ffd490" => Some(Self::A),
            "#dedede" => Some(Self::F),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scored entry for one assessment within one strand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub strand: Strand,

    /// Account the mark belongs to.
    pub student_id: String,

    /// Assessment identifier assigned by the portal.
    pub portal_id: String,

    /// Assessment name as shown in the report.
    pub name: String,

    /// Content address of all other fields.
    pub hash: String,

    pub weight: f64,
    pub numerator: f64,
    pub denominator: f64,
}

impl Mark {
    /// Create a mark, deriving its hash from the other fields.
    #[must_use]
    pub fn new(
        strand: Strand,
        student_id: impl Into<String>,
        portal_id: impl Into<String>,
        name: impl Into<String>,
        weight: f64,
        numerator: f64,
        denominator: f64,
    ) -> Self {
        let student_id = student_id.into();
        let portal_id = portal_id.into();
        let name = name.into();
        let hash = mark_hash(
            strand,
            &student_id,
            &portal_id,
            &name,
            weight,
            numerator,
            denominator,
        );

        Self {
            strand,
            student_id,
            portal_id,
            name,
            hash,
            weight,
            numerator,
            denominator,
        }
    }
}

/// One course as read from its report page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Course code (e.g., "MHF4U1-01").
    pub name: String,

    /// Enrollment month (YYYY-MM).
    pub enrollment_date: String,

    /// Content address of `name` and `enrollment_date`.
    pub hash: String,

    /// Course weighting (K, T, C, A, Final), absent when the page had no weight table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,

    /// Marks, absent when the page had no assessments table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl Course {
    /// Create a course, deriving its hash from name and enrollment date.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        enrollment_date: impl Into<String>,
        weights: Option<Vec<f64>>,
        marks: Option<Vec<Mark>>,
    ) -> Self {
        let name = name.into();
        let enrollment_date = enrollment_date.into();
        let hash = course_hash(&name, &enrollment_date);

        Self {
            name,
            enrollment_date,
            hash,
            weights,
            marks,
        }
    }

    /// Number of marks, treating a missing table as zero.
    #[must_use]
    pub fn mark_count(&self) -> usize {
        self.marks.as_ref().map_or(0, Vec::len)
    }
}

/// An open course listed on the homepage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseLink {
    /// Portal subject id used to request the report.
    pub course_id: String,

    /// Portal student id used to request the report.
    pub student_id: String,

    /// Enrollment month (YYYY-MM).
    pub enrollment_date: String,
}
