use gradesync_harvester::HarvesterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("harvest failed: {0}")]
    Harvester(#[from] HarvesterError),

    #[error("store error: {0}")]
    Store(String),

    #[error("invocation {0} was already processed")]
    DuplicateInvocation(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
