//! Core key-value engine: one file per key directly under a canonical root.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance::{self, TMP_MARKER};
use crate::security::{self, Key};
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// The internal shared state of a [`Storage`] instance.
#[derive(Debug)]
pub struct StorageInner {
    /// The canonicalized physical path on the disk where all values are stored.
    pub(crate) root: PathBuf,
    /// A unique counter used to generate temporary file names.
    pub(crate) tmp_counter: AtomicU64,
}

/// A thread-safe handle to the key-value store.
///
/// Every key maps to exactly one file under the root. Keys are validated
/// before any filesystem access, so traversal outside the root is impossible.
/// Values are opaque bytes; [`Storage::get_string`] is a UTF-8 convenience.
///
/// The handle is reference-counted and cheap to clone across tasks.
///
/// # Example
///
/// ```rust
/// use bazaar_storage::{Storage, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     # let root = tmp.path().join("data");
///     let storage = Storage::builder().root(&root).create(true).connect().await?;
///
///     storage.set("token", b"secret").await?;
///     assert_eq!(storage.get_string("token").await?.as_deref(), Some("secret"));
///
///     assert!(storage.remove("token").await?);
///     assert!(!storage.contains("token").await?);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for malformed keys and
    /// [`StorageError::Io`] for anything but a missing file.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = Key::parse(key)?.resolve(&self.root);

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", path.display()).into()),
            }),
        }
    }

    /// Reads the value under `key` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::get`]; a non-UTF-8 value is reported as
    /// [`StorageError::Io`] with [`ErrorKind::InvalidData`].
    pub async fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(bytes) = self.get(key).await? else {
            return Ok(None);
        };

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
            .context(format!("Value of '{key}' is not UTF-8"))
    }

    /// Stores `value` under `key`, replacing any previous value atomically.
    ///
    /// The bytes go to a unique temp file in the root, which is synced and then
    /// renamed over the target. Readers see either the old or the new value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for malformed keys and
    /// [`StorageError::Io`] if the disk rejects the write.
    pub async fn set(&self, key: &str, value: impl AsRef<[u8]>) -> Result<(), StorageError> {
        let key = Key::parse(key)?;
        let target = key.resolve(&self.root);
        let temp = self.unique_tmp_path(key);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(value.as_ref()).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap failed: {} -> {}", temp.display(), target.display()).into(),
                ),
            });
        }

        Self::sync_dir(&self.root).await;

        debug!(key = key.as_str(), "Value saved atomically");
        Ok(())
    }

    /// Deletes the value under `key`.
    ///
    /// Returns `false` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for malformed keys and
    /// [`StorageError::Io`] for permission or hardware failures.
    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let key = Key::parse(key)?;
        let path = key.resolve(&self.root);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = key.as_str(), "Value removed");
                Ok(true)
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", path.display()).into()),
            }),
        }
    }

    /// Checks whether a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for malformed keys.
    pub async fn contains(&self, key: &str) -> Result<bool, StorageError> {
        let path = Key::parse(key)?.resolve(&self.root);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to stat: {}", path.display()).into()),
            }),
        }
    }

    /// Lists stored keys in lexical order. Temp files and foreign entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root cannot be listed.
    pub async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .context(format!("Failed to list: {}", self.root.display()))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Directory walk failed")? {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if let Some(name) = entry.file_name().to_str()
                && is_file
                && security::is_key_name(name)
            {
                keys.push(name.to_owned());
            }
        }

        keys.sort_unstable();
        Ok(keys)
    }

    /// Removes temp files left over from interrupted writes. Returns how many were removed.
    pub async fn purge_tmp(&self) -> usize {
        maintenance::purge_tmp(&self.root).await
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }

    fn unique_tmp_path(&self, key: Key<'_>) -> PathBuf {
        let counter = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(".{}{TMP_MARKER}{}.{counter}", key.as_str(), std::process::id()))
    }
}
