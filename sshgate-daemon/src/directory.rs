//! User directory backed by SQLite.
//!
//! The authentication core only needs read access through the
//! [`UserDirectory`] trait; registration and removal live on the concrete
//! store and back the `user` CLI subcommands. Uniqueness of both the user
//! id and the public-key record is enforced at write time by the schema.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

/// Errors from user-directory operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user id already registered")]
    DuplicateId,
    #[error("public key already registered")]
    DuplicateKey,
    #[error("public key record rejected")]
    InvalidKey,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A registered account as the directory stores it.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub public_key_record: String,
    pub created_at: i64,
}

/// Read-side interface the authentication core depends on.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up an account by its user id.
    async fn lookup_by_id(&self, id: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Look up an account by its exact public-key record.
    async fn lookup_by_public_key(
        &self,
        record: &str,
    ) -> Result<Option<UserRecord>, DirectoryError>;
}

/// SQLite-backed user directory.
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    /// Open or create the directory database at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                sqlx::Error::Configuration(
                    format!("failed to create directory for db: {e}").into(),
                )
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true);

        // SQLite performs best with a single writer
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Build a directory over an existing pool (`sqlite::memory:` in tests).
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, DirectoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                public_key_record TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Register a new account.
    ///
    /// The record must parse as a supported public key, and neither the
    /// id nor the key may already be registered.
    pub async fn register(
        &self,
        id: &str,
        display_name: &str,
        public_key_record: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let record = public_key_record.trim();
        sshgate_auth::keys::parse(record).map_err(|_| DirectoryError::InvalidKey)?;

        let created_at = current_timestamp();
        let result = sqlx::query(
            "INSERT INTO users (id, display_name, public_key_record, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(display_name)
        .bind(record)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(UserRecord {
                id: id.to_string(),
                display_name: display_name.to_string(),
                public_key_record: record.to_string(),
                created_at,
            }),
            Err(e) if is_unique_violation(&e) => {
                // Disambiguate which constraint fired for the operator.
                if self.lookup_by_id(id).await?.is_some() {
                    Err(DirectoryError::DuplicateId)
                } else {
                    Err(DirectoryError::DuplicateKey)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List all registered accounts.
    pub async fn list(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let rows = sqlx::query(
            "SELECT id, display_name, public_key_record, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    /// Remove an account. Returns whether a row was deleted.
    pub async fn remove(&self, id: &str) -> Result<bool, DirectoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn lookup_by_id(&self, id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let row = sqlx::query(
            "SELECT id, display_name, public_key_record, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn lookup_by_public_key(
        &self,
        record: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let row = sqlx::query(
            "SELECT id, display_name, public_key_record, created_at FROM users
             WHERE public_key_record = ?",
        )
        .bind(record.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_record))
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        display_name: row.get("display_name"),
        public_key_record: row.get("public_key_record"),
        created_at: row.get("created_at"),
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use sshgate_auth::testutil;

    async fn test_directory() -> SqliteUserDirectory {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteUserDirectory::with_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let directory = test_directory().await;
        let pair = testutil::generate_ed25519();

        directory
            .register("alice", "Alice", pair.record())
            .await
            .unwrap();

        let user = directory.lookup_by_id("alice").await.unwrap().unwrap();
        assert_eq!(user.display_name, "Alice");
        assert_eq!(user.public_key_record, pair.record());

        let by_key = directory
            .lookup_by_public_key(pair.record())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, "alice");

        assert!(directory.lookup_by_id("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_rejected() {
        let directory = test_directory().await;
        let first = testutil::generate_ed25519();
        let second = testutil::generate_ed25519();

        directory
            .register("alice", "Alice", first.record())
            .await
            .unwrap();

        let result = directory.register("alice", "Alice Again", second.record()).await;
        assert!(matches!(result, Err(DirectoryError::DuplicateId)));
    }

    #[tokio::test]
    async fn duplicate_public_key_rejected() {
        let directory = test_directory().await;
        let pair = testutil::generate_ed25519();

        directory
            .register("alice", "Alice", pair.record())
            .await
            .unwrap();

        let result = directory.register("bob", "Bob", pair.record()).await;
        assert!(matches!(result, Err(DirectoryError::DuplicateKey)));
    }

    #[tokio::test]
    async fn unparseable_key_rejected_at_registration() {
        let directory = test_directory().await;
        let result = directory.register("mallory", "Mallory", "not a key").await;
        assert!(matches!(result, Err(DirectoryError::InvalidKey)));
        assert!(directory.lookup_by_id("mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_and_remove() {
        let directory = test_directory().await;
        let alice = testutil::generate_ed25519();
        let bob = testutil::generate_ed25519();

        directory.register("alice", "Alice", alice.record()).await.unwrap();
        directory.register("bob", "Bob", bob.record()).await.unwrap();

        let users = directory.list().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, "alice");

        assert!(directory.remove("alice").await.unwrap());
        assert!(!directory.remove("alice").await.unwrap());
        assert_eq!(directory.list().await.unwrap().len(), 1);
    }
}
