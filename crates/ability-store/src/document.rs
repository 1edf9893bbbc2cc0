//! Structured persistence on top of [`FileStorage`].
//!
//! JSON documents are never appended to.  [`save_json`] keeps a backup
//! copy alive while the main file is replaced, and [`load_json`] falls
//! back to that copy (or to `T::default()`) so a caller always gets valid
//! state.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::storage::FileStorage;

fn backup_name(name: &str) -> String {
    format!("{name}.bak")
}

/// Persist `value` as compact JSON under `name`.
///
/// Order: serialize, write `<name>.bak`, replace `<name>`, drop the
/// backup.  A crash at any point leaves one of the two files holding the
/// previous or the new value.
pub async fn save_json<T>(storage: &dyn FileStorage, name: &str, value: &T) -> StoreResult<()>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_string(value)?;
    let backup = backup_name(name);

    storage.replace(&backup, &body).await?;
    storage.replace(name, &body).await?;
    storage.delete(&backup).await?;

    debug!(file = name, bytes = body.len(), "document saved");
    Ok(())
}

/// Load `name`, recovering from a corrupt or missing main file.
pub async fn load_json<T>(storage: &dyn FileStorage, name: &str) -> StoreResult<T>
where
    T: DeserializeOwned + Default,
{
    if let Some(value) = read_valid::<T>(storage, name).await? {
        return Ok(value);
    }

    let backup = backup_name(name);
    if let Some(value) = read_valid::<T>(storage, &backup).await? {
        warn!(file = name, "restoring document from backup");
        let body = storage.read(&backup).await?;
        storage.replace(name, &body).await?;
        storage.delete(&backup).await?;
        return Ok(value);
    }

    Ok(T::default())
}

/// `Some` when `name` holds valid JSON for `T`.  Corrupt files are deleted.
async fn read_valid<T: DeserializeOwned>(
    storage: &dyn FileStorage,
    name: &str,
) -> StoreResult<Option<T>> {
    let raw = match storage.read(name).await {
        Ok(raw) => raw,
        Err(StoreError::NotFound { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(file = name, error = %e, "corrupt document, deleting");
            storage.delete(name).await?;
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Line logs
// ---------------------------------------------------------------------------

/// A line-delimited text file (journal entries and the like).
#[derive(Clone)]
pub struct LineLog {
    storage: Arc<dyn FileStorage>,
    name: String,
}

impl LineLog {
    pub fn new(storage: Arc<dyn FileStorage>, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one line.  Embedded newlines are flattened to spaces.
    pub async fn append(&self, line: &str) -> StoreResult<()> {
        let flat = line.replace(['\r', '\n'], " ");
        self.storage.write(&self.name, &format!("{flat}\n")).await
    }

    /// Non-blank lines, oldest first.  A missing file is empty.
    pub async fn lines(&self) -> StoreResult<Vec<String>> {
        match self.storage.read(&self.name).await {
            Ok(raw) => Ok(raw
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(StoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Replace the whole log.
    pub async fn rewrite(&self, lines: &[String]) -> StoreResult<()> {
        let mut body = String::new();
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        self.storage.replace(&self.name, &body).await
    }

    /// Remove and return the newest line.
    pub async fn pop_last(&self) -> StoreResult<Option<String>> {
        let mut lines = self.lines().await?;
        let last = lines.pop();
        if last.is_some() {
            self.rewrite(&lines).await?;
        }
        Ok(last)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn save_is_compact_and_idempotent() {
        let storage = MemoryStorage::new();
        let items = vec!["eggs".to_string()];

        save_json(&storage, "grocery_list.json", &items).await.unwrap();
        let first = storage.read("grocery_list.json").await.unwrap();
        save_json(&storage, "grocery_list.json", &items).await.unwrap();
        let second = storage.read("grocery_list.json").await.unwrap();

        assert_eq!(first, r#"["eggs"]"#);
        assert_eq!(first, second);
        assert_eq!(storage.names(), vec!["grocery_list.json".to_string()]);
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let storage = MemoryStorage::new();
        let items: Vec<String> = load_json(&storage, "grocery_list.json").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_deleted_and_defaults() {
        let storage = MemoryStorage::new();
        storage.write("list.json", r#"["milk"]["eggs"]"#).await.unwrap();

        let items: Vec<String> = load_json(&storage, "list.json").await.unwrap();
        assert!(items.is_empty());
        assert!(!storage.exists("list.json").await.unwrap());
    }

    #[tokio::test]
    async fn backup_is_restored_when_main_is_missing() {
        // Simulates a crash after the main file was removed.
        let storage = MemoryStorage::new();
        storage.replace("list.json.bak", r#"["milk"]"#).await.unwrap();

        let items: Vec<String> = load_json(&storage, "list.json").await.unwrap();
        assert_eq!(items, vec!["milk".to_string()]);
        assert_eq!(storage.read("list.json").await.unwrap(), r#"["milk"]"#);
        assert!(!storage.exists("list.json.bak").await.unwrap());
    }

    #[tokio::test]
    async fn line_log_round() {
        let storage: Arc<dyn FileStorage> = Arc::new(MemoryStorage::new());
        let log = LineLog::new(storage, "entries.txt");

        assert!(log.lines().await.unwrap().is_empty());
        log.append("first").await.unwrap();
        log.append("second\nline").await.unwrap();
        assert_eq!(
            log.lines().await.unwrap(),
            vec!["first".to_string(), "second line".to_string()]
        );

        assert_eq!(log.pop_last().await.unwrap().as_deref(), Some("second line"));
        assert_eq!(log.lines().await.unwrap(), vec!["first".to_string()]);

        log.rewrite(&["only".to_string()]).await.unwrap();
        assert_eq!(log.lines().await.unwrap(), vec!["only".to_string()]);
        assert_eq!(log.pop_last().await.unwrap().as_deref(), Some("only"));
        assert_eq!(log.pop_last().await.unwrap(), None);
    }
}
