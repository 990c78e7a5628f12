//! Engine configuration.
//!
//! Every knob the pipeline needs is carried here explicitly and validated
//! once at construction. Nothing downstream reads the process environment
//! at call time.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "CaseBuilder";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Blob path of the internal case-writing guide, relative to the store root.
pub const GUIDE_PATH: &str = "internal-docs/CaseWritingGuide.pdf";

/// Default per-stage backend timeout (seconds).
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 300;

/// Tracing filter used when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "casebuilder=info"
}

/// Get the application data directory
/// ~/CaseBuilder/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("CaseBuilder")
}

/// Conversation history database path
pub fn history_db_path() -> PathBuf {
    app_data_dir().join("history.db")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("backend URL must be http(s), got: {0}")]
    InvalidBackendUrl(String),

    #[error("default model must not be empty")]
    MissingModel,

    #[error("stage timeout must be at least 1 second")]
    InvalidTimeout,
}

/// Configuration for one generation engine instance.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseBuilderConfig {
    /// Base URL of the chat-completion backend.
    pub backend_url: String,
    /// Default model identifier; substituted for `${MODEL}` in role files.
    pub model: String,
    /// Per-stage backend call budget, in seconds.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
    /// Role definition file. `None` uses the embedded defaults.
    #[serde(default)]
    pub roles_path: Option<PathBuf>,
    /// Root directory of the local file store.
    pub store_root: PathBuf,
}

fn default_stage_timeout_secs() -> u64 {
    DEFAULT_STAGE_TIMEOUT_SECS
}

impl CaseBuilderConfig {
    /// Local backend on the standard port, store under the app data dir.
    pub fn default_local(model: &str) -> Self {
        Self {
            backend_url: "http://localhost:11434".into(),
            model: model.into(),
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            roles_path: None,
            store_root: app_data_dir().join("documents"),
        }
    }

    /// Validate once at startup; the pipeline assumes a valid config after this.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(ConfigError::InvalidBackendUrl(self.backend_url.clone()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.stage_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_local_validates() {
        let config = CaseBuilderConfig::default_local("llama3");
        assert!(config.validate().is_ok());
        assert_eq!(config.stage_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn rejects_non_http_backend() {
        let mut config = CaseBuilderConfig::default_local("llama3");
        config.backend_url = "ftp://example.com".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBackendUrl(_))
        ));
    }

    #[test]
    fn rejects_empty_model() {
        let config = CaseBuilderConfig::default_local("  ");
        assert!(matches!(config.validate(), Err(ConfigError::MissingModel)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = CaseBuilderConfig::default_local("llama3");
        config.stage_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("CaseBuilder"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.2.0");
    }
}
