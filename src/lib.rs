pub mod config;
pub mod models;
pub mod db;
pub mod storage;
pub mod extraction;
pub mod pipeline;
pub mod notify;
pub mod generator;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and harnesses embedding this crate.
///
/// Callers that already install their own subscriber should skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
