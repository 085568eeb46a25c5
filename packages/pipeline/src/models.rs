use std::collections::BTreeSet;
use std::fmt;

use gradesync_harvester::{Course, Credentials, Mark};
use serde::{Deserialize, Serialize};

/// The persisted course document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub name: String,
    pub date: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

impl CourseRecord {
    pub fn from_course(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            date: course.enrollment_date.clone(),
            hash: course.hash.clone(),
            weights: course.weights.clone(),
        }
    }
}

/// What has already been synced for one student in one course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentCourseState {
    pub known_mark_hashes: BTreeSet<String>,
}

impl StudentCourseState {
    pub fn from_hashes<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_mark_hashes: hashes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where a change record lands in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Destination {
    Course {
        course_hash: String,
    },
    Mark {
        course_hash: String,
        mark_hash: String,
    },
    StudentState {
        course_hash: String,
        student_id: String,
    },
}

impl Destination {
    pub fn course(course_hash: impl Into<String>) -> Self {
        Self::Course {
            course_hash: course_hash.into(),
        }
    }

    pub fn mark(course_hash: impl Into<String>, mark_hash: impl Into<String>) -> Self {
        Self::Mark {
            course_hash: course_hash.into(),
            mark_hash: mark_hash.into(),
        }
    }

    pub fn student_state(course_hash: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self::StudentState {
            course_hash: course_hash.into(),
            student_id: student_id.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Course { course_hash } => write!(f, "courses/{course_hash}"),
            Self::Mark {
                course_hash,
                mark_hash,
            } => write!(f, "courses/{course_hash}/assessments/{mark_hash}"),
            Self::StudentState {
                course_hash,
                student_id,
            } => write!(f, "courses/{course_hash}/students/{student_id}"),
        }
    }
}

/// Document written by a create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Course(CourseRecord),
    Mark(Mark),
    StudentState(StudentCourseState),
}

/// One unit of persistence work derived from a diff.
///
/// A changed mark is never an `Update`: its content address changes, so it
/// shows up as a `Delete` of the old hash plus a `Create` of the new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ChangeRecord {
    Create {
        destination: Destination,
        payload: Payload,
    },
    Update {
        destination: Destination,
        payload: Payload,
    },
    Delete {
        destination: Destination,
    },
}

impl ChangeRecord {
    pub fn destination(&self) -> &Destination {
        match self {
            Self::Create { destination, .. }
            | Self::Update { destination, .. }
            | Self::Delete { destination } => destination,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Create { payload, .. } | Self::Update { payload, .. } => Some(payload),
            Self::Delete { .. } => None,
        }
    }

    pub fn is_mark_change(&self) -> bool {
        matches!(self.destination(), Destination::Mark { .. })
    }

    fn op(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op(), self.destination())
    }
}

/// A registered user whose portal account is synced.
///
/// NOTE: `Debug` is implemented by hand so the password never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub uid: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub devices: Vec<String>,
}

impl UserAccount {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.as_str(), self.password.as_str())
    }
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("uid", &self.uid)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("devices", &self.devices.len())
            .finish()
    }
}
