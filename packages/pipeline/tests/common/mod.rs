#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gradesync_harvester::{Course, HarvesterError, Mark, Strand};

use gradesync_pipeline::error::{PipelineError, Result};
use gradesync_pipeline::models::UserAccount;
use gradesync_pipeline::notify::{DeliveryOutcome, Notifier};
use gradesync_pipeline::source::CourseSource;

pub fn user(uid: &str, devices: &[&str]) -> UserAccount {
    UserAccount {
        uid: uid.to_string(),
        username: format!("34000{uid:0>4}"),
        password: "pass1234".to_string(),
        devices: devices.iter().map(|d| d.to_string()).collect(),
    }
}

pub fn mark(student_id: &str, portal_id: &str, numerator: f64) -> Mark {
    Mark::new(Strand::K, student_id, portal_id, "Quiz", 1.0, numerator, 10.0)
}

pub fn course(name: &str, weights: Option<Vec<f64>>, marks: Option<Vec<Mark>>) -> Course {
    Course::new(name, "2024-09", weights, marks)
}

/// Course source answering from a fixed table, failing users it has no entry for.
#[derive(Default)]
pub struct MockSource {
    courses: Mutex<HashMap<String, Vec<Course>>>,
}

impl MockSource {
    pub fn set(&self, uid: &str, courses: Vec<Course>) {
        self.courses.lock().unwrap().insert(uid.to_string(), courses);
    }
}

#[async_trait]
impl CourseSource for MockSource {
    async fn fetch_courses(&self, account: &UserAccount) -> Result<Vec<Course>> {
        let courses = self
            .courses
            .lock()
            .map_err(|e| PipelineError::Store(format!("mock lock poisoned: {e}")))?;
        courses.get(&account.uid).cloned().ok_or_else(|| {
            PipelineError::Harvester(HarvesterError::Login {
                username: account.username.clone(),
                reason: "no session cookie in login response".into(),
            })
        })
    }
}

/// Notifier that records messages and fails chosen tokens with a fixed code.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Vec<String>, String, String)>>,
    failures: Mutex<HashMap<String, String>>,
}

impl RecordingNotifier {
    pub fn fail_token(&self, token: &str, code: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(token.to_string(), code.to_string());
    }

    pub fn sent(&self) -> Vec<(Vec<String>, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, tokens: &[String], title: &str, body: &str) -> Result<Vec<DeliveryOutcome>> {
        let failures = self
            .failures
            .lock()
            .map_err(|e| PipelineError::Notification(format!("mock lock poisoned: {e}")))?;
        let outcomes = tokens
            .iter()
            .map(|token| match failures.get(token) {
                Some(code) => DeliveryOutcome::Failed { code: code.clone() },
                None => DeliveryOutcome::Delivered,
            })
            .collect();

        self.sent
            .lock()
            .map_err(|e| PipelineError::Notification(format!("mock lock poisoned: {e}")))?
            .push((tokens.to_vec(), title.to_string(), body.to_string()));
        Ok(outcomes)
    }
}
