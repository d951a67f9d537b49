//! Named key-value slots holding a whole serialized collection.
//!
//! A slot is read and rewritten as a single string payload. `MemorySlot`
//! lives for the process; `FileSlot` keeps `<data_dir>/<key>.json` on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot `{key}` could not be read from `{path}`: {source}")]
    Read { key: String, path: PathBuf, source: std::io::Error },
    #[error("slot `{key}` could not be written to `{path}`: {source}")]
    Write { key: String, path: PathBuf, source: std::io::Error },
}

#[async_trait]
pub trait StorageSlot: Send + Sync {
    fn key(&self) -> &str;

    /// `None` when nothing has been written to the slot yet.
    async fn read(&self) -> Result<Option<String>, SlotError>;

    async fn write(&self, payload: &str) -> Result<(), SlotError>;
}

#[derive(Debug)]
pub struct MemorySlot {
    key: String,
    value: RwLock<Option<String>>,
}

impl MemorySlot {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), value: RwLock::new(None) }
    }

    pub fn with_payload(key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { key: key.into(), value: RwLock::new(Some(payload.into())) }
    }
}

#[async_trait]
impl StorageSlot for MemorySlot {
    fn key(&self) -> &str {
        &self.key
    }

    async fn read(&self) -> Result<Option<String>, SlotError> {
        Ok(self.value.read().await.clone())
    }

    async fn write(&self, payload: &str) -> Result<(), SlotError> {
        *self.value.write().await = Some(payload.to_string());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct FileSlot {
    key: String,
    path: PathBuf,
}

impl FileSlot {
    pub fn new(data_dir: impl AsRef<Path>, key: impl Into<String>) -> Self {
        let key = key.into();
        let path = data_dir.as_ref().join(format!("{key}.json"));
        Self { key, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn write_error(&self, path: PathBuf, source: std::io::Error) -> SlotError {
        SlotError::Write { key: self.key.clone(), path, source }
    }
}

#[async_trait]
impl StorageSlot for FileSlot {
    fn key(&self) -> &str {
        &self.key
    }

    async fn read(&self) -> Result<Option<String>, SlotError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(payload) => Ok(Some(payload)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => {
                Err(SlotError::Read { key: self.key.clone(), path: self.path.clone(), source })
            }
        }
    }

    async fn write(&self, payload: &str) -> Result<(), SlotError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(parent.to_path_buf(), source))?;
        }

        // Stage, sync, then rename: readers never observe a partial payload
        // and the rename never lands ahead of the data.
        let staging = self.staging_path();
        let mut file = tokio::fs::File::create(&staging)
            .await
            .map_err(|source| self.write_error(staging.clone(), source))?;
        file.write_all(payload.as_bytes())
            .await
            .map_err(|source| self.write_error(staging.clone(), source))?;
        file.sync_all().await.map_err(|source| self.write_error(staging.clone(), source))?;
        drop(file);

        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| self.write_error(self.path.clone(), source))
    }
}
