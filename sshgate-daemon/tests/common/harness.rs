//! Shared harness for end-to-end authentication tests.
//!
//! Wires an [`Authenticator`] to an in-memory SQLite directory and an
//! in-memory session store, with configurable challenge TTL.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sshgate_auth::ledger::ChallengeLedger;
use sshgate_auth::testutil::TestKeypair;
use sshgate_daemon::directory::SqliteUserDirectory;
use sshgate_daemon::http;
use sshgate_daemon::service::Authenticator;
use sshgate_daemon::sessions::MemorySessionStore;

pub struct TestHarness {
    pub auth: Arc<Authenticator>,
    pub directory: Arc<SqliteUserDirectory>,
    pub sessions: Arc<MemorySessionStore>,
}

impl TestHarness {
    /// Harness with production-like TTLs.
    pub async fn new() -> Self {
        Self::with_challenge_ttl(Duration::from_secs(300)).await
    }

    /// Harness with a custom challenge TTL (for expiry tests).
    pub async fn with_challenge_ttl(challenge_ttl: Duration) -> Self {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let directory = Arc::new(
            SqliteUserDirectory::with_pool(pool)
                .await
                .expect("directory schema"),
        );
        let sessions = Arc::new(MemorySessionStore::new());
        let ledger = Arc::new(ChallengeLedger::new(challenge_ttl));

        let auth = Arc::new(Authenticator::new(
            directory.clone(),
            sessions.clone(),
            ledger,
            Duration::from_secs(3600),
        ));

        Self {
            auth,
            directory,
            sessions,
        }
    }

    /// Register a user with a generated keypair's public record.
    pub async fn register(&self, id: &str, pair: &TestKeypair) {
        self.directory
            .register(id, id, pair.record())
            .await
            .expect("registration");
    }

    /// Build the JSON API router over this harness's authenticator.
    pub fn router(&self) -> axum::Router {
        http::router(self.auth.clone())
    }
}
