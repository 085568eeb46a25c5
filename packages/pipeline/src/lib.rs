pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod notify;
pub mod source;
pub mod store;
pub mod sync;

pub use config::{SyncConfig, SyncOptions};
pub use diff::reconcile_course;
pub use error::{PipelineError, Result};
pub use models::{ChangeRecord, CourseRecord, Destination, Payload, StudentCourseState, UserAccount};
pub use notify::{LogNotifier, Notifier};
pub use source::{CourseSource, PortalSource};
pub use store::{CourseStore, FileStore, MemoryStore, StoreSnapshot};
pub use sync::{run_sync, sync_user, SyncReport, UserSyncReport};
