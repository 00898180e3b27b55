//! Generation Service Abstraction
//!
//! The three remote operations the orchestrator depends on. Implementations
//! report failures through [`GenerationError`] so the retry policy can tell
//! moderation rejections, client errors and transient hiccups apart.

use crate::error::GenerationError;
use crate::types::{ArtStyle, AspectRatio, ImagePayload, Inspiration};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod gemini;

pub use gemini::GeminiClient;

/// Remote image and commentary generation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate an image from a text prompt
    async fn synthesize_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, GenerationError>;

    /// Re-imagine a reference image according to a text prompt
    async fn edit_image(
        &self,
        reference: &ImagePayload,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, GenerationError>;

    /// Produce painter's notes for a generated image
    async fn synthesize_commentary(
        &self,
        image: &ImagePayload,
        subject: &str,
        style: ArtStyle,
    ) -> Result<Inspiration, GenerationError>;
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key; falls back to `GEMINI_API_KEY` / `GOOGLE_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_commentary_model")]
    pub commentary_model: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_commentary_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            image_model: default_image_model(),
            commentary_model: default_commentary_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl ServiceConfig {
    /// Configured key, else the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .or_else(|| non_empty_env("GEMINI_API_KEY"))
            .or_else(|| non_empty_env("GOOGLE_API_KEY"))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(format!("api_base must be an http(s) URL: {}", self.api_base));
        }
        if self.image_model.trim().is_empty() {
            return Err("image_model cannot be empty".to_string());
        }
        if self.commentary_model.trim().is_empty() {
            return Err("commentary_model cannot be empty".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
