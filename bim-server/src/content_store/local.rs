//! Filesystem-backed `ContentStore`. Never returns a direct-upload URL
//! at all. Writes a `<key>.meta` sidecar alongside each object to carry
//! the content type, since the filesystem itself has no such field.

use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use super::key::reject_traversal;
use super::{ByteStream, ContentStore, StoreError, StoreHealth};

pub struct LocalContentStore {
    base_dir: PathBuf,
}

impl LocalContentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Resolves `key` to a path under `base_dir`, after traversal
    /// rejection. The caller must have already validated the key belongs
    /// to the expected workspace/project.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        Ok(self.base_dir.join(key))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut s = path.as_os_str().to_owned();
        s.push(".meta");
        PathBuf::from(s)
    }
}

#[async_trait::async_trait]
impl ContentStore for LocalContentStore {
    async fn put(&self, key: &str, mut stream: ByteStream, content_type: Option<&str>) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        if path.exists() {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StoreError::Backend(e.to_string()))?;
            file.write_all(&chunk).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        file.flush().await.map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(ct) = content_type {
            tokio::fs::write(Self::meta_path(&path), ct)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn open_read(&self, key: &str) -> Result<Option<ByteStream>, StoreError> {
        let path = self.resolve(key)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };
        let stream = tokio_util::io::ReaderStream::new(file).map(|r| r.map(Bytes::from));
        Ok(Some(Box::pin(stream)))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.resolve(key)?;
        let _ = tokio::fs::remove_file(Self::meta_path(&path)).await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    async fn generate_upload_url(&self, _key: &str, _content_type: Option<&str>, _expires_at: DateTime<Utc>) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn generate_download_url(&self, _key: &str, _expires_at: DateTime<Utc>) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn check_health(&self) -> StoreHealth {
        let sentinel = self.base_dir.join(".health-sentinel");
        let result: std::io::Result<()> = async {
            tokio::fs::create_dir_all(&self.base_dir).await?;
            tokio::fs::write(&sentinel, b"ok").await?;
            let mut buf = BytesMut::new();
            buf.extend_from_slice(&tokio::fs::read(&sentinel).await?);
            tokio::fs::remove_file(&sentinel).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => StoreHealth {
                healthy: true,
                message: None,
                data: Some(serde_json::json!({ "base_dir": self.base_dir.display().to_string() })),
            },
            Err(e) => StoreHealth { healthy: false, message: Some(e.to_string()), data: None },
        }
    }
}
