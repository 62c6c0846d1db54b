//! Authenticated-session store.
//!
//! The core writes an opaque session record after successful
//! verification and reads it back for session checks; everything else
//! about session handling (cookies, transport) stays outside. The store
//! is injected through the [`SessionStore`] trait so a different backend
//! can replace the in-memory map without touching the core.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Default lifetime of an authenticated session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Marker written after a user proves possession of their key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedSession {
    pub user_id: String,
    /// Unix seconds at which verification succeeded.
    pub established_at: i64,
}

/// Errors from session-store operations.
///
/// The in-memory store never fails, but the trait is fallible so remote
/// backends surface their faults through the same seam.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionStoreError {
    #[error("session store unavailable")]
    Unavailable,
}

/// Opaque key-value session storage with TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(
        &self,
        token: &str,
        session: AuthenticatedSession,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn get(&self, token: &str) -> Result<Option<AuthenticatedSession>, SessionStoreError>;

    async fn delete(&self, token: &str) -> Result<(), SessionStoreError>;
}

/// Generate an opaque session token: 32 bytes of OS entropy, hex-encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

struct StoredSession {
    session: AuthenticatedSession,
    stored: Instant,
    ttl: Duration,
}

/// In-memory session store with lazy TTL expiry.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, StoredSession>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired sessions. Optional; reads ignore expired entries.
    pub fn sweep_expired(&self) {
        self.entries
            .retain(|_, stored| stored.stored.elapsed() < stored.ttl);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        token: &str,
        session: AuthenticatedSession,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.entries.insert(
            token.to_string(),
            StoredSession {
                session,
                stored: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<AuthenticatedSession>, SessionStoreError> {
        let Some(stored) = self.entries.get(token) else {
            return Ok(None);
        };
        if stored.stored.elapsed() >= stored.ttl {
            return Ok(None);
        }
        Ok(Some(stored.session.clone()))
    }

    async fn delete(&self, token: &str) -> Result<(), SessionStoreError> {
        self.entries.remove(token);
        Ok(())
    }
}
