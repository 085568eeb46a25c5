//! End-to-end parsing tests over saved portal pages.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

use gradesync_harvester::markup::normalize_whitespace;
use gradesync_harvester::{parse_homepage, parse_report, CourseLink, Mark, Strand};

/// Load a fixture page, normalised the way the portal client does.
fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let raw = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e));
    normalize_whitespace(&raw).into_owned()
}

#[test]
fn test_homepage_lists_open_courses_only() {
    let links = parse_homepage(&load_fixture("homepage.html")).unwrap();

    assert_eq!(
        links,
        vec![
            CourseLink {
                course_id: "281734".to_string(),
                student_id: "99112".to_string(),
                enrollment_date: "2024-09".to_string(),
            },
            CourseLink {
                course_id: "281790".to_string(),
                student_id: "99112".to_string(),
                enrollment_date: "2024-09".to_string(),
            },
        ]
    );
}

#[test]
fn test_report_weights() {
    let course = parse_report(&load_fixture("report.html"), "uid-1", "2024-09").unwrap();

    assert_eq!(course.name, "MHF4U1-01");
    assert_eq!(course.weights, Some(vec![17.5, 17.5, 14.0, 21.0, 30.0]));
}

#[test]
fn test_report_marks() {
    let course = parse_report(&load_fixture("report.html"), "uid-1", "2024-09").unwrap();
    let marks = course.marks.unwrap();

    let summary: Vec<(&str, Strand, f64, f64, f64)> = marks
        .iter()
        .map(|m| (m.name.as_str(), m.strand, m.numerator, m.denominator, m.weight))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Unit 1 Test", Strand::K, 18.0, 20.0, 4.0),
            ("Unit 1 Test", Strand::T, 7.5, 10.0, 4.0),
            ("Unit 1 Test", Strand::C, 0.0, 0.0, 0.0),
            ("Unit 1 Test", Strand::A, 9.0, 10.0, 0.0),
            ("Quiz 2", Strand::K, 4.0, 5.0, 1.0),
            ("Final Exam", Strand::F, 63.0, 70.0, 30.0),
        ]
    );
    assert_eq!(
        marks[4],
        Mark::new(Strand::K, "uid-1", "71044", "Quiz 2", 1.0, 4.0, 5.0)
    );
}

#[test]
fn test_report_identity_is_stable() {
    let page = load_fixture("report.html");
    let first = parse_report(&page, "uid-1", "2024-09").unwrap();
    let second = parse_report(&page, "uid-1", "2024-09").unwrap();

    assert_eq!(first.hash, second.hash);
    assert_eq!(first, second);

    // A different enrollment month is a different course.
    let other_term = parse_report(&page, "uid-1", "2025-02").unwrap();
    assert_ne!(first.hash, other_term.hash);
}

#[test]
fn test_report_without_tables() {
    let course = parse_report(&load_fixture("report_no_tables.html"), "uid-1", "2024-09").unwrap();

    assert_eq!(course.name, "ENG4U1-03");
    assert!(course.weights.is_none());
    assert!(course.marks.is_none());
}

#[test]
fn test_course_serializes_without_absent_tables() {
    let course = parse_report(&load_fixture("report_no_tables.html"), "uid-1", "2024-09").unwrap();
    let json = serde_json::to_value(&course).unwrap();

    assert_eq!(json["name"], "ENG4U1-03");
    assert!(json.get("weights").is_none());
    assert!(json.get("marks").is_none());
}
