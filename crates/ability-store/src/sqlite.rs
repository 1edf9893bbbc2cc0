//! SQLite backend: every user's files live as rows in `user_files`.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tracing::instrument;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::storage::{FileStorage, validate_name};

/// File storage for one user backed by a shared [`Database`].
#[derive(Clone)]
pub struct SqliteStorage {
    db: Database,
    user: String,
}

impl SqliteStorage {
    /// Storage scoped to `user`.  The database must already be migrated.
    pub fn new(db: Database, user: &str) -> StoreResult<Self> {
        validate_name(user)?;
        Ok(Self {
            db,
            user: user.to_string(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Names of this user's files, sorted.
    pub async fn names(&self) -> StoreResult<Vec<String>> {
        let user = self.user.clone();
        self.db
            .execute(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT name FROM user_files WHERE user_id = ?1 ORDER BY name")?;
                let rows = stmt.query_map(params![user], |row| row.get(0))?;
                let mut names = Vec::new();
                for row in rows {
                    names.push(row?);
                }
                Ok(names)
            })
            .await
    }
}

#[async_trait]
impl FileStorage for SqliteStorage {
    #[instrument(skip(self), fields(user = %self.user))]
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        let (user, name) = (self.user.clone(), name.to_string());
        self.db
            .execute(move |conn| {
                let found: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM user_files WHERE user_id = ?1 AND name = ?2",
                        params![user, name],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await
    }

    #[instrument(skip(self), fields(user = %self.user))]
    async fn read(&self, name: &str) -> StoreResult<String> {
        validate_name(name)?;
        let (user, name) = (self.user.clone(), name.to_string());
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT content FROM user_files WHERE user_id = ?1 AND name = ?2",
                    params![user, name],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::NotFound { name })
            })
            .await
    }

    #[instrument(skip(self, content), fields(user = %self.user, bytes = content.len()))]
    async fn write(&self, name: &str, content: &str) -> StoreResult<()> {
        validate_name(name)?;
        let (user, name, content) = (self.user.clone(), name.to_string(), content.to_string());
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO user_files (user_id, name, content, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(user_id, name) DO UPDATE SET
                         content = user_files.content || excluded.content,
                         updated_at = excluded.updated_at",
                    params![user, name, content, chrono::Utc::now().timestamp()],
                )?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self), fields(user = %self.user))]
    async fn delete(&self, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        let (user, name) = (self.user.clone(), name.to_string());
        self.db
            .execute(move |conn| {
                let changed = conn.execute(
                    "DELETE FROM user_files WHERE user_id = ?1 AND name = ?2",
                    params![user, name],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// Single upsert; the old content is never observable as missing.
    #[instrument(skip(self, content), fields(user = %self.user, bytes = content.len()))]
    async fn replace(&self, name: &str, content: &str) -> StoreResult<()> {
        validate_name(name)?;
        let (user, name, content) = (self.user.clone(), name.to_string(), content.to_string());
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO user_files (user_id, name, content, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(user_id, name) DO UPDATE SET
                         content = excluded.content,
                         updated_at = excluded.updated_at",
                    params![user, name, content, chrono::Utc::now().timestamp()],
                )?;
                Ok(())
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
