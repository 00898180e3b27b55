//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
/// Generation failures use their user-facing wording.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Generation(err) => err.user_message(),
        other => other.to_string(),
    }
}
