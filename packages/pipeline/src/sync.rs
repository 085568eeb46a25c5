//! Sync passes: one user at a time, and every user in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::config::{SyncConfig, SyncOptions};
use crate::diff::reconcile_course;
use crate::error::Result;
use crate::models::UserAccount;
use crate::notify::{deliver, summarize_mark_changes, Notifier};
use crate::source::CourseSource;
use crate::store::CourseStore;

/// What one user's sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSyncReport {
    pub uid: String,
    pub courses: usize,
    /// Records produced (and applied, unless dry run).
    pub changes: usize,
    pub notifications: usize,
}

/// Outcome of a full run across users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub invocation_id: String,
    /// Successful users, sorted by uid.
    pub synced: Vec<UserSyncReport>,
    /// Users whose sync failed, sorted.
    pub failed: Vec<String>,
}

impl SyncReport {
    pub fn total_changes(&self) -> usize {
        self.synced.iter().map(|r| r.changes).sum()
    }
}

/// Fetch one user's courses, reconcile them with the store and notify.
///
/// Records are applied course by course. Notifications go out after all
/// courses are stored, one per course with mark changes.
pub async fn sync_user(
    store: &dyn CourseStore,
    source: &dyn CourseSource,
    notifier: &dyn Notifier,
    account: &UserAccount,
    options: SyncOptions,
) -> Result<UserSyncReport> {
    let started = std::time::Instant::now();
    let courses = source.fetch_courses(account).await?;
    tracing::info!(
        uid = %account.uid,
        courses = courses.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "fetched courses"
    );

    let mut report = UserSyncReport {
        uid: account.uid.clone(),
        courses: courses.len(),
        ..UserSyncReport::default()
    };
    let mut messages = Vec::new();

    for course in &courses {
        let stored_course = store.course(&course.hash).await?;
        let stored_state = store.student_state(&course.hash, &account.uid).await?;
        let changes = reconcile_course(
            course,
            stored_course.as_ref(),
            stored_state.as_ref(),
            &account.uid,
        );

        if changes.is_empty() {
            tracing::debug!(uid = %account.uid, course = %course.name, "course unchanged");
            continue;
        }

        if options.dry_run {
            for change in &changes {
                tracing::info!(uid = %account.uid, course = %course.name, %change, "dry run");
            }
        } else {
            store.apply_changes(&changes).await?;
            tracing::info!(
                uid = %account.uid,
                course = %course.name,
                changes = changes.len(),
                "applied changes"
            );
        }
        report.changes += changes.len();

        if let Some(body) = summarize_mark_changes(&changes) {
            messages.push((course.name.clone(), body));
        }
    }

    if options.notify && !options.dry_run {
        report.notifications = notify_user(store, notifier, account, &messages).await;
    }

    Ok(report)
}

/// Send one message per changed course, pruning dead tokens as they turn up.
///
/// Delivery problems are logged and never fail the user's sync.
async fn notify_user(
    store: &dyn CourseStore,
    notifier: &dyn Notifier,
    account: &UserAccount,
    messages: &[(String, String)],
) -> usize {
    let mut tokens = account.devices.clone();
    let mut sent = 0;

    for (title, body) in messages {
        if tokens.is_empty() {
            break;
        }
        match deliver(notifier, &tokens, title, body).await {
            Ok(surviving) => {
                tokens = surviving;
                sent += 1;
            }
            Err(e) => {
                tracing::warn!(uid = %account.uid, error = %e, "failed to send notification");
            }
        }
    }

    if tokens.len() < account.devices.len() {
        if let Err(e) = store.update_devices(&account.uid, &tokens).await {
            tracing::warn!(uid = %account.uid, error = %e, "failed to prune device tokens");
        }
    }

    sent
}

/// Sync every user once.
///
/// The invocation id is recorded before anything else, so a redelivered
/// trigger fails here with `DuplicateInvocation` instead of syncing twice.
/// Users run in parallel up to `max_concurrent_users`; a failing user is
/// logged and listed in the report without affecting the others.
pub async fn run_sync(
    store: Arc<dyn CourseStore>,
    source: Arc<dyn CourseSource>,
    notifier: Arc<dyn Notifier>,
    config: &SyncConfig,
) -> Result<SyncReport> {
    store.record_invocation(&config.invocation_id).await?;

    let users = store.users().await?;
    if users.is_empty() {
        tracing::warn!("no users found");
    }
    tracing::info!(
        invocation_id = %config.invocation_id,
        users = users.len(),
        dry_run = config.dry_run,
        "starting sync"
    );

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_users));
    let options = config.options();
    let mut tasks = JoinSet::new();
    let mut task_users: HashMap<Id, String> = HashMap::new();

    for account in users {
        let uid = account.uid.clone();
        let store = Arc::clone(&store);
        let source = Arc::clone(&source);
        let notifier = Arc::clone(&notifier);
        let semaphore = Arc::clone(&semaphore);

        let handle = tasks.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = semaphore.acquire_owned().await.ok();
            let result = sync_user(
                store.as_ref(),
                source.as_ref(),
                notifier.as_ref(),
                &account,
                options,
            )
            .await;
            (account.uid, result)
        });
        task_users.insert(handle.id(), uid);
    }

    let mut report = SyncReport {
        invocation_id: config.invocation_id.clone(),
        ..SyncReport::default()
    };

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, (_, Ok(user_report)))) => report.synced.push(user_report),
            Ok((_, (uid, Err(e)))) => {
                tracing::error!(uid = %uid, error = %e, "sync failed for user");
                report.failed.push(uid);
            }
            Err(e) => {
                let uid = task_users.remove(&e.id()).unwrap_or_default();
                tracing::error!(uid = %uid, error = %e, "sync task panicked or was cancelled");
                report.failed.push(uid);
            }
        }
    }

    report.synced.sort_by(|a, b| a.uid.cmp(&b.uid));
    report.failed.sort();

    tracing::info!(
        synced = report.synced.len(),
        failed = report.failed.len(),
        changes = report.total_changes(),
        "sync finished"
    );

    Ok(report)
}
