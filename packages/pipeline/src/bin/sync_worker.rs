use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use gradesync_pipeline::config::SyncConfig;
use gradesync_pipeline::notify::LogNotifier;
use gradesync_pipeline::source::PortalSource;
use gradesync_pipeline::store::FileStore;
use gradesync_pipeline::sync::run_sync;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let store = match FileStore::open(config.store_path.clone()).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, path = %config.store_path.display(), "failed to open store");
            std::process::exit(1);
        }
    };

    let source = PortalSource::new(config.portal.clone());

    // Per-user failures are part of the report; only run-level errors fail the process.
    match run_sync(Arc::new(store), Arc::new(source), Arc::new(LogNotifier), &config).await {
        Ok(report) => {
            tracing::info!(
                invocation_id = %report.invocation_id,
                synced = report.synced.len(),
                failed = report.failed.len(),
                "sync worker done"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "sync run failed");
            std::process::exit(1);
        }
    }
}
