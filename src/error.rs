//! Error types for the Atelier generation studio.

use thiserror::Error;

/// Failures of a single generation request.
///
/// `Clone` because one in-flight pipeline hands the same outcome to every
/// caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Request rejected by content moderation: {0}")]
    ModeratedContent(String),

    #[error("Generation failed after {attempts} attempts: {message}")]
    TransientFailure { attempts: usize, message: String },

    #[error("Malformed result from generation service: {0}")]
    MalformedResult(String),

    #[error("Request superseded by a newer submission")]
    Superseded,

    #[error("Generation service rejected the request (status {status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Generation service error: {0}")]
    Remote(String),

    #[error("Generation service not configured: {0}")]
    ServiceNotConfigured(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    /// Message shown at the presentation boundary.
    ///
    /// Moderation rejections read differently from technical failures so the
    /// user knows rephrasing, not retrying, is what helps.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::ModeratedContent(_) => {
                "The studio declined this subject on content-policy grounds. \
                 Try rephrasing it or choosing a different reference."
                    .to_string()
            }
            GenerationError::TransientFailure { attempts, .. } => format!(
                "The generation service is unavailable right now ({} attempts). Please try again shortly.",
                attempts
            ),
            GenerationError::MalformedResult(_) => {
                "The generation service returned an incomplete study. Please try again.".to_string()
            }
            GenerationError::Superseded => "Replaced by a newer request.".to_string(),
            GenerationError::ClientError { status, .. } => {
                format!("The generation service rejected the request (status {}).", status)
            }
            GenerationError::Remote(_) => {
                "The generation service reported an error. Please try again.".to_string()
            }
            GenerationError::ServiceNotConfigured(msg) => {
                format!("The generation service is not configured: {}", msg)
            }
            GenerationError::InvalidRequest(msg) => format!("Invalid request: {}", msg),
        }
    }
}

/// History persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("History database error: {0}")]
    Database(String),

    #[error("History encoding error: {0}")]
    Codec(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}

/// Application-level errors (configuration, CLI, export)
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("No history entry at position {0}")]
    HistoryEntryNotFound(usize),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
