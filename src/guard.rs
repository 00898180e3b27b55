//! Stale-response guard
//!
//! Every user-initiated submission takes a fresh token before doing any async
//! work. A response is applied only if its token is still the newest one
//! issued; anything older is dropped silently.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number of one submission. Compared, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues request tokens and answers "is this still the latest?"
#[derive(Debug, Default)]
pub struct StaleResponseGuard {
    latest: AtomicU64,
}

impl StaleResponseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token newer than every token issued before it.
    pub fn begin_request(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Most recently issued token, if any.
    pub fn latest(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }
}
