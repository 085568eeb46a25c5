//! Mark set reconciliation for one student in one course.

use std::collections::BTreeSet;

use gradesync_harvester::Mark;

use crate::models::{ChangeRecord, Destination, Payload, StudentCourseState};

/// Set difference between the fresh marks and the known hashes.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkDiff<'a> {
    /// Known hashes no longer on the page, sorted.
    pub removed: Vec<String>,
    /// Fresh marks not yet known, in page order.
    pub added: Vec<&'a Mark>,
    /// Every fresh hash, which is the known set after the diff is applied.
    pub fresh_hashes: BTreeSet<String>,
}

impl MarkDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Compare fresh marks against the hashes already synced.
///
/// Duplicate marks on the page collapse to their first occurrence.
pub fn diff_marks<'a>(fresh: &'a [Mark], known: &BTreeSet<String>) -> MarkDiff<'a> {
    let mut fresh_hashes = BTreeSet::new();
    let mut added = Vec::new();

    for mark in fresh {
        if fresh_hashes.insert(mark.hash.clone()) && !known.contains(&mark.hash) {
            added.push(mark);
        }
    }

    let removed = known.difference(&fresh_hashes).cloned().collect();

    MarkDiff {
        removed,
        added,
        fresh_hashes,
    }
}

/// Change records for one student's marks in one course.
///
/// Order is deletes, then creates, then the state record, so a state rewrite
/// only lands once the mark documents it points at do.
///
/// - No stored state: every fresh mark is created along with the state, even
///   when there are none, to mark the course as synced.
/// - Stored state but no assessments table: nothing, the known hashes stay.
/// - Stored state equal to the fresh hashes: nothing, not even a state rewrite.
pub fn assessment_changes(
    course_hash: &str,
    student_id: &str,
    fresh: Option<&[Mark]>,
    stored: Option<&StudentCourseState>,
) -> Vec<ChangeRecord> {
    let state_destination = Destination::student_state(course_hash, student_id);

    let Some(stored) = stored else {
        let diff = diff_marks(fresh.unwrap_or_default(), &BTreeSet::new());
        let mut changes = mark_records(course_hash, &diff);
        changes.push(ChangeRecord::Create {
            destination: state_destination,
            payload: Payload::StudentState(StudentCourseState {
                known_mark_hashes: diff.fresh_hashes,
            }),
        });
        return changes;
    };

    let Some(fresh) = fresh else {
        return Vec::new();
    };

    let diff = diff_marks(fresh, &stored.known_mark_hashes);
    if diff.is_empty() {
        return Vec::new();
    }

    let mut changes = mark_records(course_hash, &diff);
    changes.push(ChangeRecord::Update {
        destination: state_destination,
        payload: Payload::StudentState(StudentCourseState {
            known_mark_hashes: diff.fresh_hashes,
        }),
    });
    changes
}

fn mark_records(course_hash: &str, diff: &MarkDiff<'_>) -> Vec<ChangeRecord> {
    let deletes = diff.removed.iter().map(|hash| ChangeRecord::Delete {
        destination: Destination::mark(course_hash, hash.as_str()),
    });
    let creates = diff.added.iter().map(|mark| ChangeRecord::Create {
        destination: Destination::mark(course_hash, mark.hash.as_str()),
        payload: Payload::Mark((*mark).clone()),
    });
    deletes.chain(creates).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradesync_harvester::Strand;
    use pretty_assertions::assert_eq;

    fn mark(id: &str, numerator: f64) -> Mark {
        Mark::new(Strand::K, "uid", id, "Quiz", 1.0, numerator, 10.0)
    }

    #[test]
    fn test_duplicate_fresh_marks_collapse() {
        let m = mark("1", 5.0);
        let fresh = vec![m.clone(), m.clone()];

        let diff = diff_marks(&fresh, &BTreeSet::new());
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.fresh_hashes.len(), 1);
    }

    #[test]
    fn test_changed_mark_is_delete_plus_create() {
        let before = mark("1", 5.0);
        let after = mark("1", 6.0);
        let known = BTreeSet::from([before.hash.clone()]);
        let fresh = vec![after.clone()];

        let diff = diff_marks(&fresh, &known);
        assert_eq!(diff.removed, vec![before.hash]);
        assert_eq!(diff.added, vec![&after]);
    }

    #[test]
    fn test_first_sync_without_table_creates_empty_state() {
        let changes = assessment_changes("c1", "uid", None, None);
        assert_eq!(
            changes,
            vec![ChangeRecord::Create {
                destination: Destination::student_state("c1", "uid"),
                payload: Payload::StudentState(StudentCourseState::default()),
            }]
        );
    }

    #[test]
    fn test_missing_table_keeps_known_hashes() {
        let stored = StudentCourseState::from_hashes(["h1", "h2"]);
        assert!(assessment_changes("c1", "uid", None, Some(&stored)).is_empty());
    }
}
