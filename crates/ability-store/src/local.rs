//! Filesystem backend: one directory per user.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::storage::{FileStorage, validate_name};

/// Stores files under `<root>/<user>/<name>`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    dir: PathBuf,
}

impl LocalFileStorage {
    /// Storage for `user` under `root`.  The directory is created lazily on
    /// first write.
    pub fn new(root: impl AsRef<Path>, user: &str) -> StoreResult<Self> {
        validate_name(user)?;
        Ok(Self {
            dir: root.as_ref().join(user),
        })
    }

    /// The user's directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> StoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.path(name)?).await?)
    }

    async fn read(&self, name: &str) -> StoreResult<String> {
        match tokio::fs::read_to_string(self.path(name)?).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, content: &str) -> StoreResult<()> {
        let path = self.path(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        match tokio::fs::remove_file(self.path(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn replace(&self, name: &str, content: &str) -> StoreResult<()> {
        let path = self.path(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = self.dir.join(format!(".{name}.tmp"));
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), bytes = content.len(), "file replaced");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn files_are_scoped_per_user() {
        let root = tempfile::tempdir().unwrap();
        let alice = LocalFileStorage::new(root.path(), "alice").unwrap();
        let bob = LocalFileStorage::new(root.path(), "bob").unwrap();

        alice.write("notes.txt", "hi").await.unwrap();
        assert!(alice.exists("notes.txt").await.unwrap());
        assert!(!bob.exists("notes.txt").await.unwrap());
        assert!(root.path().join("alice").join("notes.txt").exists());
    }

    #[tokio::test]
    async fn append_then_replace() {
        let root = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(root.path(), "u").unwrap();

        storage.write("log.txt", "a\n").await.unwrap();
        storage.write("log.txt", "b\n").await.unwrap();
        assert_eq!(storage.read("log.txt").await.unwrap(), "a\nb\n");

        storage.replace("log.txt", "c\n").await.unwrap();
        assert_eq!(storage.read("log.txt").await.unwrap(), "c\n");
        assert!(!root.path().join("u").join(".log.txt.tmp").exists());
    }

    #[tokio::test]
    async fn missing_and_invalid_names() {
        let root = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(root.path(), "u").unwrap();

        assert!(matches!(
            storage.read("absent.json").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(!storage.delete("absent.json").await.unwrap());
        assert!(storage.write("../escape", "x").await.is_err());
        assert!(LocalFileStorage::new(root.path(), "../evil").is_err());
    }
}
