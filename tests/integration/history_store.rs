//! Integration tests for the History Store on the sled backend

use atelier::history::{
    HistoryBackend, HistoryEntry, HistoryStore, SledHistoryBackend, DEFAULT_HISTORY_CAPACITY,
    HISTORY_STORAGE_KEY,
};
use atelier::types::{ArtStyle, Artifact, AspectRatio, GenerationResult, Inspiration};
use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;

fn study(seed: u32) -> GenerationResult {
    GenerationResult {
        artifact: Artifact::new(seed.to_le_bytes().to_vec(), "image/png"),
        subject: format!("study {}", seed),
        style: ArtStyle::Pastel,
        aspect_ratio: AspectRatio::Landscape,
        inspiration: Inspiration {
            technique: "broken color".to_string(),
            palette: vec![
                "lilac".to_string(),
                "straw".to_string(),
                "sky".to_string(),
                "moss".to_string(),
            ],
            mood: "airy".to_string(),
            challenge: "paint outdoors".to_string(),
        },
        created_at: Utc::now(),
    }
}

fn open_store(dir: &TempDir) -> HistoryStore {
    let backend = Arc::new(SledHistoryBackend::new(dir.path().join("history")).unwrap());
    HistoryStore::open(backend, DEFAULT_HISTORY_CAPACITY)
}

#[test]
fn test_history_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open_store(&temp_dir);
        store.append(study(1));
        store.append(study(2));
    }

    let store = open_store(&temp_dir);
    let subjects: Vec<String> = store
        .entries()
        .into_iter()
        .map(|entry| entry.result.subject)
        .collect();
    assert_eq!(subjects, vec!["study 2", "study 1"]);
}

#[test]
fn test_sixteenth_append_evicts_oldest_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open_store(&temp_dir);
        for seed in 1..=16 {
            store.append(study(seed));
        }
        assert_eq!(store.len(), 15);
    }

    let store = open_store(&temp_dir);
    assert_eq!(store.len(), 15);
    assert_eq!(store.get(0).unwrap().result.subject, "study 16");
    assert_eq!(store.get(14).unwrap().result.subject, "study 2");
    assert!(store
        .entries()
        .iter()
        .all(|entry| entry.result.subject != "study 1"));
}

#[test]
fn test_duplicate_identity_moves_to_front() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    let first = study(1);
    store.append(first.clone());
    store.append(study(2));
    store.append(study(3));
    store.append(first);

    let ids: Vec<String> = store
        .entries()
        .iter()
        .map(|entry| entry.artifact_id().to_string())
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], study(1).artifact.id);
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3);
}

#[test]
fn test_corrupt_record_loads_as_empty_gallery() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history");
    {
        let backend = SledHistoryBackend::new(&path).unwrap();
        backend
            .db()
            .insert(HISTORY_STORAGE_KEY, b"definitely not bincode".to_vec())
            .unwrap();
        backend.db().flush().unwrap();
    }

    let backend = Arc::new(SledHistoryBackend::new(&path).unwrap());
    let store = HistoryStore::open(backend.clone(), DEFAULT_HISTORY_CAPACITY);
    assert!(store.is_empty());

    // The next append overwrites the unreadable record
    store.append(study(5));
    assert_eq!(backend.load_history().unwrap().len(), 1);
}

#[test]
fn test_clear_removes_persisted_record() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open_store(&temp_dir);
        store.append(study(1));
        store.clear();
    }
    let store = open_store(&temp_dir);
    assert!(store.is_empty());
}

#[test]
fn test_replay_request_from_entry() {
    let entry = HistoryEntry::from(study(9));
    let request = entry.to_request();
    assert_eq!(request.subject, "study 9");
    assert_eq!(request.style, ArtStyle::Pastel);
    assert_eq!(request.aspect_ratio, AspectRatio::Landscape);
}
