//! Persistence collaborator: the trait the sync pass talks to, plus an
//! in-memory and a JSON-file implementation.
//!
//! A `Delete` of a mark never removes the mark document. The mark is flagged as
//! superseded and stays in the store as history; only the student's known hash
//! set stops referring to it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gradesync_harvester::Mark;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::{ChangeRecord, CourseRecord, Destination, Payload, StudentCourseState, UserAccount};

/// How long a processed invocation id is remembered. Older ids are dropped
/// on the next insert.
pub const INVOCATION_RETENTION_DAYS: i64 = 7;

/// Trait for stores, enabling in-memory fakes in tests.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// The stored course document, if the course has been seen before.
    async fn course(&self, course_hash: &str) -> Result<Option<CourseRecord>>;

    /// The student's synced state for a course, if it has ever been synced.
    async fn student_state(
        &self,
        course_hash: &str,
        student_id: &str,
    ) -> Result<Option<StudentCourseState>>;

    /// Apply records in order.
    async fn apply_changes(&self, changes: &[ChangeRecord]) -> Result<()>;

    async fn users(&self) -> Result<Vec<UserAccount>>;

    /// Replace a user's device tokens.
    async fn update_devices(&self, uid: &str, devices: &[String]) -> Result<()>;

    /// Record an invocation id, failing with `DuplicateInvocation` if it was seen before.
    async fn record_invocation(&self, invocation_id: &str) -> Result<()>;
}

/// Full store contents. Documents are keyed by their destination path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub courses: BTreeMap<String, CourseRecord>,
    #[serde(default)]
    pub marks: BTreeMap<String, Mark>,
    #[serde(default)]
    pub superseded_marks: BTreeSet<String>,
    #[serde(default)]
    pub student_states: BTreeMap<String, StudentCourseState>,
    #[serde(default)]
    pub users: Vec<UserAccount>,
    #[serde(default)]
    pub invocations: BTreeMap<String, DateTime<Utc>>,
}

impl StoreSnapshot {
    pub fn with_users(users: Vec<UserAccount>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn course(&self, course_hash: &str) -> Option<&CourseRecord> {
        self.courses
            .get(&Destination::course(course_hash).to_string())
    }

    pub fn student_state(&self, course_hash: &str, student_id: &str) -> Option<&StudentCourseState> {
        self.student_states
            .get(&Destination::student_state(course_hash, student_id).to_string())
    }

    /// Apply one record.
    ///
    /// # Errors
    /// `Store` when the payload kind does not fit the destination.
    pub fn apply(&mut self, change: &ChangeRecord) -> Result<()> {
        let destination = change.destination();
        let key = destination.to_string();

        match (change.payload(), destination) {
            (Some(Payload::Course(record)), Destination::Course { .. }) => {
                self.courses.insert(key, record.clone());
            }
            (Some(Payload::Mark(mark)), Destination::Mark { .. }) => {
                self.superseded_marks.remove(&key);
                self.marks.insert(key, mark.clone());
            }
            (Some(Payload::StudentState(state)), Destination::StudentState { .. }) => {
                self.student_states.insert(key, state.clone());
            }
            (None, Destination::Mark { .. }) => {
                tracing::debug!(destination = %key, "retaining superseded mark");
                self.superseded_marks.insert(key);
            }
            (None, Destination::Course { .. }) => {
                self.courses.remove(&key);
            }
            (None, Destination::StudentState { .. }) => {
                self.student_states.remove(&key);
            }
            (Some(_), _) => {
                return Err(PipelineError::Store(format!(
                    "payload does not match destination {key}"
                )));
            }
        }
        Ok(())
    }

    fn set_devices(&mut self, uid: &str, devices: &[String]) -> Result<()> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.uid == uid)
            .ok_or_else(|| PipelineError::Store(format!("user not found: {uid}")))?;
        user.devices = devices.to_vec();
        Ok(())
    }

    fn insert_invocation(&mut self, invocation_id: &str) -> Result<()> {
        self.insert_invocation_at(invocation_id, Utc::now())
    }

    fn insert_invocation_at(&mut self, invocation_id: &str, now: DateTime<Utc>) -> Result<()> {
        let cutoff = now - Duration::days(INVOCATION_RETENTION_DAYS);
        self.invocations.retain(|_, seen| *seen >= cutoff);

        if self.invocations.contains_key(invocation_id) {
            return Err(PipelineError::DuplicateInvocation(invocation_id.to_string()));
        }
        self.invocations.insert(invocation_id.to_string(), now);
        Ok(())
    }
}

/// Store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreSnapshot>> {
        self.snapshot
            .lock()
            .map_err(|e| PipelineError::Store(format!("store lock poisoned: {e}")))
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn course(&self, course_hash: &str) -> Result<Option<CourseRecord>> {
        Ok(self.lock()?.course(course_hash).cloned())
    }

    async fn student_state(
        &self,
        course_hash: &str,
        student_id: &str,
    ) -> Result<Option<StudentCourseState>> {
        Ok(self.lock()?.student_state(course_hash, student_id).cloned())
    }

    async fn apply_changes(&self, changes: &[ChangeRecord]) -> Result<()> {
        let mut snapshot = self.lock()?;
        let mut next = snapshot.clone();
        for change in changes {
            next.apply(change)?;
        }
        *snapshot = next;
        Ok(())
    }

    async fn users(&self) -> Result<Vec<UserAccount>> {
        Ok(self.lock()?.users.clone())
    }

    async fn update_devices(&self, uid: &str, devices: &[String]) -> Result<()> {
        self.lock()?.set_devices(uid, devices)
    }

    async fn record_invocation(&self, invocation_id: &str) -> Result<()> {
        self.lock()?.insert_invocation(invocation_id)
    }
}

/// Store persisted as one JSON document.
///
/// Every mutation rewrites the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new snapshot on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    snapshot: tokio::sync::Mutex<StoreSnapshot>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "store file not found, starting empty");
                StoreSnapshot::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            snapshot: tokio::sync::Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.lock().await.clone()
    }

    /// Apply `mutate` to a copy and keep it only if it succeeds and is written out.
    async fn commit<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<()> + Send,
    {
        let mut snapshot = self.snapshot.lock().await;
        let mut next = snapshot.clone();
        mutate(&mut next)?;
        write_snapshot(&self.path, &next).await?;
        *snapshot = next;
        Ok(())
    }
}

async fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CourseStore for FileStore {
    async fn course(&self, course_hash: &str) -> Result<Option<CourseRecord>> {
        Ok(self.snapshot.lock().await.course(course_hash).cloned())
    }

    async fn student_state(
        &self,
        course_hash: &str,
        student_id: &str,
    ) -> Result<Option<StudentCourseState>> {
        Ok(self
            .snapshot
            .lock()
            .await
            .student_state(course_hash, student_id)
            .cloned())
    }

    async fn apply_changes(&self, changes: &[ChangeRecord]) -> Result<()> {
        self.commit(|snapshot| {
            for change in changes {
                snapshot.apply(change)?;
            }
            Ok(())
        })
        .await
    }

    async fn users(&self) -> Result<Vec<UserAccount>> {
        Ok(self.snapshot.lock().await.users.clone())
    }

    async fn update_devices(&self, uid: &str, devices: &[String]) -> Result<()> {
        self.commit(|snapshot| snapshot.set_devices(uid, devices)).await
    }

    async fn record_invocation(&self, invocation_id: &str) -> Result<()> {
        self.commit(|snapshot| snapshot.insert_invocation(invocation_id))
            .await
    }
}
