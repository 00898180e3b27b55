//! In-flight request registry
//!
//! Coalesces concurrent requests for the same key onto one shared pipeline.
//! Lookup and registration happen under a single lock, so two callers can
//! never both start an operation for one key. The entry removes itself when
//! its operation completes, success or failure, so the next request for that
//! key starts fresh.

use crate::error::GenerationError;
use crate::guard::{RequestToken, StaleResponseGuard};
use crate::types::GenerationResult;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub type GenerationOutcome = Result<GenerationResult, GenerationError>;

/// Pending operation every joined caller awaits.
pub type SharedGeneration = Shared<BoxFuture<'static, GenerationOutcome>>;

/// Who is still waiting on a pipeline.
///
/// Unguarded callers always want the result. Guarded callers only want it
/// while their token is still the latest one issued.
#[derive(Debug, Default)]
pub struct Interest {
    unguarded: AtomicUsize,
    newest_token: AtomicU64,
}

impl Interest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: Option<RequestToken>) {
        match token {
            Some(token) => {
                self.newest_token.fetch_max(token.as_u64(), Ordering::SeqCst);
            }
            None => {
                self.unguarded.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn is_live(&self, guard: &StaleResponseGuard) -> bool {
        if self.unguarded.load(Ordering::SeqCst) > 0 {
            return true;
        }
        let newest = self.newest_token.load(Ordering::SeqCst);
        newest != 0 && guard.latest().map(RequestToken::as_u64) == Some(newest)
    }
}

struct InFlightEntry {
    flight_id: u64,
    future: SharedGeneration,
    interest: Arc<Interest>,
}

/// Handle returned by [`InFlightRegistry::get_or_create`]
pub struct Flight {
    pub future: SharedGeneration,
    pub interest: Arc<Interest>,
    /// `true` when the caller attached to an operation someone else started
    pub joined: bool,
}

#[derive(Default)]
pub struct InFlightRegistry {
    entries: Arc<Mutex<HashMap<String, InFlightEntry>>>,
    next_flight_id: AtomicU64,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the operation registered for `key`, or register the one built by
    /// `factory`. The factory only builds the future; nothing runs until a
    /// caller awaits it.
    pub fn get_or_create<F, Fut>(
        &self,
        key: &str,
        token: Option<RequestToken>,
        factory: F,
    ) -> Flight
    where
        F: FnOnce(Arc<Interest>) -> Fut,
        Fut: Future<Output = GenerationOutcome> + Send + 'static,
    {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(key) {
            entry.interest.register(token);
            debug!(request_key = %key, flight_id = entry.flight_id, "Joined in-flight generation");
            return Flight {
                future: entry.future.clone(),
                interest: Arc::clone(&entry.interest),
                joined: true,
            };
        }

        let flight_id = self.next_flight_id.fetch_add(1, Ordering::Relaxed) + 1;
        let interest = Arc::new(Interest::new());
        interest.register(token);

        let operation = factory(Arc::clone(&interest));
        let registry = Arc::clone(&self.entries);
        let owned_key = key.to_string();
        let future = async move {
            let outcome = operation.await;
            let mut entries = registry.lock();
            if entries
                .get(&owned_key)
                .is_some_and(|entry| entry.flight_id == flight_id)
            {
                entries.remove(&owned_key);
            }
            outcome
        }
        .boxed()
        .shared();

        entries.insert(
            key.to_string(),
            InFlightEntry {
                flight_id,
                future: future.clone(),
                interest: Arc::clone(&interest),
            },
        );
        debug!(request_key = %key, flight_id, "Registered in-flight generation");

        Flight {
            future,
            interest,
            joined: false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
