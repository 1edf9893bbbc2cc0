//! The per-user file storage contract.
//!
//! Abilities see exactly four primitives (exists, read, write, delete).
//! `write` appends, which is why structured documents go through
//! [`FileStorage::replace`] instead; see [`crate::document`].
//!
//! Storage is scoped to a user, not to an ability, so callers namespace
//! their file names (`grocery_list.json`, `voice_journal_prefs.json`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

/// Per-user file storage.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Whether `name` exists.
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Full contents of `name`.  Missing files yield [`StoreError::NotFound`].
    async fn read(&self, name: &str) -> StoreResult<String>;

    /// Append `content` to `name`, creating it on first write.
    async fn write(&self, name: &str, content: &str) -> StoreResult<()>;

    /// Remove `name`.  Returns `false` if it did not exist.
    async fn delete(&self, name: &str) -> StoreResult<bool>;

    /// Overwrite `name` with `content`.
    ///
    /// The default is delete-then-write; backends that can do better
    /// (atomic rename, single upsert) override it.
    async fn replace(&self, name: &str, content: &str) -> StoreResult<()> {
        self.delete(name).await?;
        self.write(name, content).await
    }
}

/// Reject names that could escape the user's scope.
pub fn validate_name(name: &str) -> StoreResult<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("path separators are not allowed")
    } else if name == "." || name == ".." || name.contains("..") {
        Some("relative path components are not allowed")
    } else if name.chars().any(char::is_control) {
        Some("control characters are not allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local storage.  Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored files, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds consistent strings; keep going.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        Ok(self.lock().contains_key(name))
    }

    async fn read(&self, name: &str) -> StoreResult<String> {
        validate_name(name)?;
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })
    }

    async fn write(&self, name: &str, content: &str) -> StoreResult<()> {
        validate_name(name)?;
        self.lock()
            .entry(name.to_string())
            .or_default()
            .push_str(content);
        Ok(())
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        Ok(self.lock().remove(name).is_some())
    }

    async fn replace(&self, name: &str, content: &str) -> StoreResult<()> {
        validate_name(name)?;
        self.lock().insert(name.to_string(), content.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
