use std::path::PathBuf;

use gradesync_harvester::PortalConfig;

use crate::error::{PipelineError, Result};

const DEFAULT_MAX_CONCURRENT_USERS: usize = 4;

/// Settings for one sync invocation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub store_path: PathBuf,
    pub portal: PortalConfig,
    pub max_concurrent_users: usize,
    /// Idempotency key for this invocation.
    pub invocation_id: String,
    pub dry_run: bool,
    pub notify: bool,
}

/// Behaviour switches passed down to each user's sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub notify: bool,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_path = lookup("GRADESYNC_STORE_PATH")
            .ok_or_else(|| PipelineError::Config("GRADESYNC_STORE_PATH not set".into()))?;

        let mut builder = Self::builder(store_path);

        if let Some(url) = lookup("GRADESYNC_PORTAL_URL") {
            builder = builder.portal(PortalConfig::default().with_base_url(url));
        }

        if let Some(value) = lookup("GRADESYNC_MAX_CONCURRENT_USERS") {
            let max = value.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                PipelineError::Config(format!(
                    "GRADESYNC_MAX_CONCURRENT_USERS must be a positive integer, got '{value}'"
                ))
            })?;
            builder = builder.max_concurrent_users(max);
        }

        if let Some(id) = lookup("GRADESYNC_INVOCATION_ID").filter(|id| !id.is_empty()) {
            builder = builder.invocation_id(id);
        }

        let dry_run = lookup("GRADESYNC_DRY_RUN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let notify = lookup("GRADESYNC_NOTIFY")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(builder.dry_run(dry_run).notify(notify).build())
    }

    pub fn builder(store_path: impl Into<PathBuf>) -> SyncConfigBuilder {
        SyncConfigBuilder {
            config: Self {
                store_path: store_path.into(),
                portal: PortalConfig::default(),
                max_concurrent_users: DEFAULT_MAX_CONCURRENT_USERS,
                invocation_id: uuid::Uuid::new_v4().to_string(),
                dry_run: false,
                notify: true,
            },
        }
    }

    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            dry_run: self.dry_run,
            notify: self.notify,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn portal(mut self, portal: PortalConfig) -> Self {
        self.config.portal = portal;
        self
    }

    pub fn max_concurrent_users(mut self, max: usize) -> Self {
        self.config.max_concurrent_users = max.max(1);
        self
    }

    pub fn invocation_id(mut self, id: impl Into<String>) -> Self {
        self.config.invocation_id = id.into();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn notify(mut self, notify: bool) -> Self {
        self.config.notify = notify;
        self
    }

    pub fn build(self) -> SyncConfig {
        self.config
    }
}
