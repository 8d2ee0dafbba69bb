use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key")]
    InvalidKey,
    #[error("Blob not found")]
    NotFound,
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Content-addressed byte storage. Keys are the lowercase hex SHA-256 of the
/// content, so writing the same bytes twice is a no-op.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: &[u8]) -> Result<String, StorageError>;
    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

pub fn content_key(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `ab/abcdef…` so no single directory grows unbounded.
    fn resolve_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(StorageError::InvalidKey);
        }
        Ok(self.root.join(&key[..2]).join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<String, StorageError> {
        let key = content_key(bytes);
        let path = self.resolve_path(&key)?;
        if tokio::fs::try_exists(&path).await? {
            debug!(%key, "Blob already stored");
            return Ok(key);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write then rename so readers never observe a partial blob
        let staging = path.with_extension(format!("tmp-{}", nanoid::nanoid!(8)));
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &path).await?;
        debug!(%key, size = bytes.len(), "Blob stored");
        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
