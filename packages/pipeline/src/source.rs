//! Where fresh courses come from.

use async_trait::async_trait;
use gradesync_harvester::{harvest_courses, Course, PortalClient, PortalConfig};

use crate::error::Result;
use crate::models::UserAccount;

/// Trait for course sources, enabling mocking in tests.
#[async_trait]
pub trait CourseSource: Send + Sync {
    /// Every open course for one account, in portal order.
    async fn fetch_courses(&self, account: &UserAccount) -> Result<Vec<Course>>;
}

/// Reads courses from the live portal.
#[derive(Debug, Clone)]
pub struct PortalSource {
    config: PortalConfig,
}

impl PortalSource {
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CourseSource for PortalSource {
    async fn fetch_courses(&self, account: &UserAccount) -> Result<Vec<Course>> {
        let config = self.config.clone();
        let credentials = account.credentials();
        let uid = account.uid.clone();

        // The portal client is blocking; keep it off the async workers.
        let courses = tokio::task::spawn_blocking(move || {
            let portal = PortalClient::new(config)?;
            harvest_courses(&portal, &credentials, &uid)
        })
        .await??;

        Ok(courses)
    }
}
