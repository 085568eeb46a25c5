//! Course weight reconciliation.
//!
//! A course is identified by name and enrollment date, so its weights are the
//! only thing that can change on an existing course record.

use gradesync_harvester::Course;

use crate::models::{ChangeRecord, CourseRecord, Destination, Payload};

/// Outcome of comparing fresh weights against the stored course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightDecision {
    /// No course record yet: write whatever the page had.
    Create,
    /// Stored weights are missing or differ from the page.
    Update,
    Unchanged,
}

/// Decide what to do with a course record.
///
/// Absent fresh weights never overwrite a stored course, since the portal
/// sometimes omits the weight table for a course it showed before.
pub fn decide_weights(fresh: Option<&[f64]>, stored: Option<&CourseRecord>) -> WeightDecision {
    let Some(stored) = stored else {
        return WeightDecision::Create;
    };
    let Some(fresh) = fresh else {
        return WeightDecision::Unchanged;
    };

    match stored.weights.as_deref() {
        Some(known) if known == fresh => WeightDecision::Unchanged,
        _ => WeightDecision::Update,
    }
}

/// The course create/update record, if one is needed.
pub fn course_change(course: &Course, stored: Option<&CourseRecord>) -> Option<ChangeRecord> {
    let destination = Destination::course(course.hash.as_str());
    let payload = Payload::Course(CourseRecord::from_course(course));

    match decide_weights(course.weights.as_deref(), stored) {
        WeightDecision::Create => Some(ChangeRecord::Create {
            destination,
            payload,
        }),
        WeightDecision::Update => Some(ChangeRecord::Update {
            destination,
            payload,
        }),
        WeightDecision::Unchanged => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(weights: Option<Vec<f64>>) -> CourseRecord {
        CourseRecord {
            name: "MHF4U1-01".into(),
            date: "2024-09".into(),
            hash: "h".into(),
            weights,
        }
    }

    #[test]
    fn test_equal_weights_are_unchanged() {
        let record = stored(Some(vec![17.5, 17.5, 14.0, 21.0, 30.0]));
        assert_eq!(
            decide_weights(Some(&[17.5, 17.5, 14.0, 21.0, 30.0][..]), Some(&record)),
            WeightDecision::Unchanged
        );
    }

    #[test]
    fn test_course_change_update_carries_fresh_weights() {
        let course = Course::new("MHF4U1-01", "2024-09", Some(vec![25.0; 5]), None);
        let change = course_change(&course, Some(&stored(Some(vec![20.0; 5])))).unwrap();

        let (destination, record) = match change {
            ChangeRecord::Update {
                destination,
                payload: Payload::Course(record),
            } => (destination, record),
            other => panic!("expected a course update, got {other:?}"),
        };
        assert_eq!(destination, Destination::course(course.hash.as_str()));
        assert_eq!(record.weights, Some(vec![25.0; 5]));
    }
}
