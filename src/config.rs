//! Configuration System
//!
//! Layered configuration for the studio: built-in defaults, the user's global
//! file, the workspace's `config/` directory, then `ATELIER__*` environment
//! variables. Validation collects every problem instead of stopping at the
//! first one.

use crate::cache::CacheConfig;
use crate::history::HistoryConfig;
use crate::logging::LoggingConfig;
use crate::provider::ServiceConfig;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtelierConfig {
    /// Remote generation service
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Service(String),
    Retry(String),
    History(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Service(msg) => write!(f, "Service: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::History(msg) => write!(f, "History: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AtelierConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.service.validate() {
            errors.push(ValidationError::Service(e));
        }

        if self.retry.initial_delay_ms == 0 && self.retry.max_retries > 0 {
            errors.push(ValidationError::Retry(
                "initial_delay_ms must be greater than 0 when retries are enabled".to_string(),
            ));
        }

        if self.history.capacity == 0 {
            errors.push(ValidationError::History(
                "capacity must be greater than 0".to_string(),
            ));
        }
        if self.history.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::History(
                "store_path cannot be empty".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Default location of the history database: the platform data directory,
/// or `.atelier/history` when none can be determined.
pub fn default_history_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "atelier")
        .map(|dirs| dirs.data_dir().join("history"))
        .unwrap_or_else(|| PathBuf::from(".atelier").join("history"))
}
