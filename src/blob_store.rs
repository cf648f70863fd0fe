//! Snapshot Blob Storage
//!
//! Rendered contract HTML is uploaded as an immutable blob; the contract
//! records the returned reference. Implementations target the local
//! filesystem (development, CLI) or memory (tests). An S3-compatible store
//! plugs in behind the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Invalid blob reference: {0}")]
    InvalidRef(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, return the blob reference
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, BlobStoreError>;

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError>;

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError>;

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError>;
}

/// Keys are relative, slash-separated, without `.`/`..` segments
fn validate_key(key: &str) -> Result<(), BlobStoreError> {
    if key.is_empty() || key.starts_with('/') {
        return Err(BlobStoreError::InvalidKey(key.to_string()));
    }
    let all_normal = Path::new(key)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if all_normal {
        Ok(())
    } else {
        Err(BlobStoreError::InvalidKey(key.to_string()))
    }
}

/// Filesystem store; blob references are `file://` URIs
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_from_ref(&self, blob_ref: &str) -> Result<PathBuf, BlobStoreError> {
        blob_ref
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| {
                BlobStoreError::InvalidRef(format!("Expected file:// prefix: {}", blob_ref))
            })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<String, BlobStoreError> {
        validate_key(key)?;
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        tracing::debug!(key, bytes = content.len(), "stored blob");
        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if !path.exists() {
            return Err(BlobStoreError::NotFound(blob_ref.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        Ok(self.path_from_ref(blob_ref)?.exists())
    }
}

/// A stored blob with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content: Vec<u8>,
    pub content_type: String,
}

/// In-memory store; blob references are `memory://<key>`
#[derive(Default, Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn get(&self, blob_ref: &str) -> Option<StoredBlob> {
        self.blobs.read().await.get(blob_ref).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, BlobStoreError> {
        validate_key(key)?;
        let blob_ref = format!("memory://{}", key);
        self.blobs.write().await.insert(
            blob_ref.clone(),
            StoredBlob {
                content: content.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(blob_ref)
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        self.blobs
            .read()
            .await
            .get(blob_ref)
            .map(|b| b.content.clone())
            .ok_or_else(|| BlobStoreError::NotFound(blob_ref.to_string()))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        self.blobs.write().await.remove(blob_ref);
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        Ok(self.blobs.read().await.contains_key(blob_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_blob_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());

        let html = b"<p>Fee: $200.00</p>";
        let blob_ref = store
            .store("contracts/abc/unsigned-1.html", html, "text/html")
            .await
            .unwrap();
        assert!(blob_ref.starts_with("file://"));
        assert!(store.exists(&blob_ref).await.unwrap());
        assert_eq!(store.fetch(&blob_ref).await.unwrap(), html);

        store.delete(&blob_ref).await.unwrap();
        assert!(!store.exists(&blob_ref).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());

        for key in ["../outside.html", "/etc/passwd", "./a.html", "a/../../b", ""] {
            let result = store.store(key, b"x", "text/plain").await;
            assert!(
                matches!(result, Err(BlobStoreError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[tokio::test]
    async fn test_in_memory_blob_store() {
        let store = InMemoryBlobStore::new();
        let blob_ref = store
            .store("contracts/x/unsigned.html", b"<p/>", "text/html; charset=utf-8")
            .await
            .unwrap();
        assert_eq!(blob_ref, "memory://contracts/x/unsigned.html");
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get(&blob_ref).await.unwrap().content_type,
            "text/html; charset=utf-8"
        );

        store.delete(&blob_ref).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_not_found_error() {
        let store = InMemoryBlobStore::new();
        let result = store.fetch("memory://nonexistent").await;
        assert!(matches!(result, Err(BlobStoreError::NotFound(_))));
    }
}
