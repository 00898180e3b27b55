//! Retry policy for remote generation calls
//!
//! Transient failures are retried with exponential backoff (`initial_delay`,
//! then doubled each retry) until the budget runs out. Moderation rejections,
//! client errors and configuration problems fail on the first attempt.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Substrings that mark a content-moderation rejection (matched lowercase).
const MODERATION_MARKERS: [&str; 7] = [
    "safety",
    "moderat",
    "blocked",
    "prohibited",
    "blocklist",
    "content policy",
    "responsible ai",
];

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay before the first retry (milliseconds); doubles on each retry
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

/// How a failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Content moderation rejection; never retried
    Moderated,
    /// Retrying cannot help
    Permanent,
    /// Retry may succeed
    Transient,
}

fn mentions_moderation(message: &str) -> bool {
    let lowered = message.to_lowercase();
    MODERATION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Classify a failure from a remote call.
pub fn classify(error: &GenerationError) -> FailureClass {
    match error {
        GenerationError::ModeratedContent(_) => return FailureClass::Moderated,
        GenerationError::Superseded
        | GenerationError::ServiceNotConfigured(_)
        | GenerationError::InvalidRequest(_) => return FailureClass::Permanent,
        _ => {}
    }

    if mentions_moderation(&error.to_string()) {
        return FailureClass::Moderated;
    }

    match error {
        // Timeouts and rate limits are worth another try
        GenerationError::ClientError { status, .. } if *status == 408 || *status == 429 => {
            FailureClass::Transient
        }
        GenerationError::ClientError { .. } => FailureClass::Permanent,
        // Already the product of an exhausted retry loop
        GenerationError::TransientFailure { .. } => FailureClass::Permanent,
        _ => FailureClass::Transient,
    }
}

fn into_moderated(error: GenerationError) -> GenerationError {
    match error {
        GenerationError::ModeratedContent(message) => GenerationError::ModeratedContent(message),
        other => GenerationError::ModeratedContent(other.to_string()),
    }
}

fn into_exhausted(error: GenerationError, attempts: usize) -> GenerationError {
    match error {
        GenerationError::MalformedResult(message) => GenerationError::MalformedResult(message),
        other => GenerationError::TransientFailure {
            attempts,
            message: other.to_string(),
        },
    }
}

/// Bounded exponential-backoff retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let exponent = retry.saturating_sub(1).min(31) as u32;
        self.initial_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut attempt = 1;
        let mut retries_left = self.max_retries;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Remote call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            match classify(&error) {
                FailureClass::Moderated => {
                    warn!(operation = operation_name, attempt, error = %error, "Request rejected by content moderation");
                    return Err(into_moderated(error));
                }
                FailureClass::Permanent => {
                    warn!(operation = operation_name, attempt, error = %error, "Remote call failed permanently");
                    return Err(error);
                }
                FailureClass::Transient if retries_left == 0 => {
                    warn!(operation = operation_name, attempts = attempt, error = %error, "Retry budget exhausted");
                    return Err(into_exhausted(error, attempt));
                }
                FailureClass::Transient => {
                    let delay = self.delay_for_retry(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        retries_left,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    sleep(delay).await;
                    retries_left -= 1;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(config.max_retries, Duration::from_millis(config.initial_delay_ms))
    }
}
