//! History Store
//!
//! Newest-first gallery of completed studies, bounded to a fixed capacity and
//! unique by artifact identity. The whole sequence is rewritten to the
//! backend under one fixed key on every mutation; loading never fails (a
//! missing or unreadable record is an empty gallery).

use crate::types::{ArtStyle, AspectRatio, GenerationRequest, GenerationResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod persistence;

pub use persistence::{HistoryBackend, MemoryHistoryBackend, SledHistoryBackend};

/// Storage key the gallery lives under.
pub const HISTORY_STORAGE_KEY: &str = "current_history";

pub const DEFAULT_HISTORY_CAPACITY: usize = 15;

/// History configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory of the history database
    #[serde(default = "crate::config::default_history_path")]
    pub store_path: PathBuf,

    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            store_path: crate::config::default_history_path(),
            capacity: default_capacity(),
        }
    }
}

/// One gallery entry: the result plus what is needed to replay its request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub result: GenerationResult,
    /// Subject exactly as the user typed it (may be empty)
    pub requested_subject: String,
    pub had_reference: bool,
}

impl HistoryEntry {
    pub fn new(result: GenerationResult, request: &GenerationRequest) -> Self {
        Self {
            result,
            requested_subject: request.subject.clone(),
            had_reference: request.reference.is_some(),
        }
    }

    pub fn artifact_id(&self) -> &str {
        &self.result.artifact.id
    }

    /// Text-only request that reproduces this entry's parameters. The
    /// reference image of an edit is not retained, so the display subject
    /// stands in for it.
    pub fn to_request(&self) -> GenerationRequest {
        let subject = if self.had_reference && self.requested_subject.trim().is_empty() {
            self.result.subject.clone()
        } else {
            self.requested_subject.clone()
        };
        GenerationRequest::new(subject, self.result.style, self.result.aspect_ratio)
    }
}

impl From<GenerationResult> for HistoryEntry {
    fn from(result: GenerationResult) -> Self {
        Self {
            requested_subject: result.subject.clone(),
            had_reference: false,
            result,
        }
    }
}

/// Bounded, persisted gallery
pub struct HistoryStore {
    entries: RwLock<Vec<HistoryEntry>>,
    backend: Arc<dyn HistoryBackend>,
    capacity: usize,
}

impl HistoryStore {
    /// Open the store and load whatever the backend holds.
    pub fn open(backend: Arc<dyn HistoryBackend>, capacity: usize) -> Self {
        let store = Self {
            entries: RwLock::new(Vec::new()),
            backend,
            capacity: capacity.max(1),
        };
        store.load();
        store
    }

    /// Store backed by memory only.
    pub fn in_memory(capacity: usize) -> Self {
        Self::open(Arc::new(MemoryHistoryBackend::new()), capacity)
    }

    /// Reload from the backend, replacing the in-memory sequence.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let mut loaded = match self.backend.load_history() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to load history, starting with an empty gallery");
                Vec::new()
            }
        };
        loaded.truncate(self.capacity);
        debug!(entries = loaded.len(), "Loaded history");

        let mut entries = self.entries.write();
        *entries = loaded;
        entries.clone()
    }

    /// Prepend an entry, replacing any entry with the same artifact identity
    /// and evicting the oldest beyond capacity.
    pub fn append(&self, entry: impl Into<HistoryEntry>) {
        let entry = entry.into();
        let mut entries = self.entries.write();
        entries.retain(|existing| existing.artifact_id() != entry.artifact_id());
        entries.insert(0, entry);
        entries.truncate(self.capacity);
        self.persist(&entries);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        if let Err(e) = self.backend.clear_history() {
            warn!(error = %e, "Failed to clear persisted history");
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().clone()
    }

    pub fn get(&self, index: usize) -> Option<HistoryEntry> {
        self.entries.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn persist(&self, entries: &[HistoryEntry]) {
        if let Err(e) = self.backend.save_history(entries) {
            warn!(error = %e, entries = entries.len(), "Failed to persist history");
        }
    }
}

/// File name for an exported study: `AtelierMuse_{safe_subject}.{ext}`.
///
/// Non-alphanumeric characters become `_`, the subject is lowercased and
/// cut to 30 characters.
pub fn export_file_name(subject: &str, mime_type: &str) -> String {
    let safe: String = subject
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .take(30)
        .collect();
    format!("AtelierMuse_{}.{}", safe, extension_for_mime(mime_type))
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
