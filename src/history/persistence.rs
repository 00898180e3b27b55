//! Persistence backends for the history gallery

use crate::error::StorageError;
use crate::history::{HistoryEntry, HISTORY_STORAGE_KEY};
use parking_lot::Mutex;
use std::path::Path;

/// Durable storage for the whole gallery as one unit.
pub trait HistoryBackend: Send + Sync {
    /// Empty when nothing has been saved yet.
    fn load_history(&self) -> Result<Vec<HistoryEntry>, StorageError>;

    /// Replace the stored sequence.
    fn save_history(&self, entries: &[HistoryEntry]) -> Result<(), StorageError>;

    fn clear_history(&self) -> Result<(), StorageError>;
}

/// Sled-based history backend
///
/// The gallery is bincode-encoded and stored under [`HISTORY_STORAGE_KEY`].
pub struct SledHistoryBackend {
    db: sled::Db,
}

impl SledHistoryBackend {
    /// Open (or create) the database at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::Database(format!(
                "Failed to open history database at {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Ok(Self { db })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

impl HistoryBackend for SledHistoryBackend {
    fn load_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        match self.db.get(HISTORY_STORAGE_KEY)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_history(&self, entries: &[HistoryEntry]) -> Result<(), StorageError> {
        let value = bincode::serialize(entries)?;
        self.db.insert(HISTORY_STORAGE_KEY, value)?;
        self.db.flush()?;
        Ok(())
    }

    fn clear_history(&self) -> Result<(), StorageError> {
        self.db.remove(HISTORY_STORAGE_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory history backend for tests and ephemeral sessions
///
/// Keeps the encoded bytes so the codec path matches the sled backend.
#[derive(Default)]
pub struct MemoryHistoryBackend {
    stored: Mutex<Option<Vec<u8>>>,
    saves: Mutex<usize>,
}

impl MemoryHistoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of full rewrites performed so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Overwrite the stored record with raw bytes.
    pub fn put_raw(&self, bytes: Vec<u8>) {
        *self.stored.lock() = Some(bytes);
    }
}

impl HistoryBackend for MemoryHistoryBackend {
    fn load_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        match self.stored.lock().as_deref() {
            Some(bytes) => Ok(bincode::deserialize(bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_history(&self, entries: &[HistoryEntry]) -> Result<(), StorageError> {
        let bytes = bincode::serialize(entries)?;
        *self.stored.lock() = Some(bytes);
        *self.saves.lock() += 1;
        Ok(())
    }

    fn clear_history(&self) -> Result<(), StorageError> {
        *self.stored.lock() = None;
        Ok(())
    }
}
