//! Change detection between freshly parsed courses and stored state.
//!
//! Everything here is pure: the same inputs always yield the same records, and
//! feeding the result back as stored state yields no records at all.

mod assessments;
mod weights;

pub use assessments::{assessment_changes, diff_marks, MarkDiff};
pub use weights::{course_change, decide_weights, WeightDecision};

use gradesync_harvester::Course;

use crate::models::{ChangeRecord, CourseRecord, StudentCourseState};

/// All change records for one course and one student.
///
/// The course record (if any) comes first, then the student's mark records
/// in the order [`assessment_changes`] produces them.
pub fn reconcile_course(
    course: &Course,
    stored_course: Option<&CourseRecord>,
    stored_state: Option<&StudentCourseState>,
    student_id: &str,
) -> Vec<ChangeRecord> {
    let mut changes: Vec<ChangeRecord> = course_change(course, stored_course).into_iter().collect();
    changes.extend(assessment_changes(
        &course.hash,
        student_id,
        course.marks.as_deref(),
        stored_state,
    ));
    changes
}
