//! Atelier: Generation Studio
//!
//! Request orchestration and caching for an art generator. A request becomes
//! an image and painter's notes through a two-stage remote pipeline; identical
//! requests share one pipeline, completed results are cached for the session,
//! recent studies persist in a bounded gallery, and responses to superseded
//! submissions are dropped.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod inflight;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod retry;
pub mod studio;
pub mod style;
pub mod types;

pub use cache::ResultCache;
pub use error::{ApiError, GenerationError};
pub use guard::{RequestToken, StaleResponseGuard};
pub use history::HistoryStore;
pub use orchestrator::Orchestrator;
pub use studio::Studio;
pub use types::{ArtStyle, AspectRatio, GenerationRequest, GenerationResult, GenerationStatus};
