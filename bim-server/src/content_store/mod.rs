//! Content Store: pluggable blob/file backend.
//!
//! `ContentStore` is the capability trait every backend implements; the two
//! shipped implementations (`local::LocalContentStore`,
//! `cloud::CloudContentStore`) are chosen at startup from `AppConfig`.

pub mod cloud;
pub mod key;
pub mod local;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::Stream;

/// Liveness-probe result: `{healthy?, message?, data?}`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreHealth {
    pub healthy: bool,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// Failure taxonomy a `ContentStore` may report, distinct from `AppError`
/// so callers (the upload coordinator, the conversion orchestrator) decide
/// how to react before it's surfaced at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("transient storage failure: {0}")]
    Transient(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type ByteStream = std::pin::Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Capability set implemented once per backend. All operations
/// are cancellable by virtue of being plain `async fn`s driven by a
/// cancel-aware caller (the request's `CancellationToken` / Axum's
/// connection-drop future).
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Writes `stream` under `key`. Fails with `AlreadyExists` if the key
    /// is already occupied — puts never overwrite.
    async fn put(&self, key: &str, stream: ByteStream, content_type: Option<&str>) -> Result<(), StoreError>;

    /// Returns `None` if the key is absent — never an error.
    async fn open_read(&self, key: &str) -> Result<Option<ByteStream>, StoreError>;

    /// Idempotent; `false` if the key was already absent.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn size(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// `None` when the backend cannot produce direct-upload URLs (e.g. the
    /// local filesystem backend, always).
    async fn generate_upload_url(&self, key: &str, content_type: Option<&str>, expires_at: DateTime<Utc>) -> Result<Option<String>, StoreError>;

    /// `None` when the backend cannot produce direct-download URLs; the
    /// caller falls back to streaming the bytes through itself.
    async fn generate_download_url(&self, key: &str, expires_at: DateTime<Utc>) -> Result<Option<String>, StoreError>;

    async fn check_health(&self) -> StoreHealth;
}

pub type DynContentStore = Arc<dyn ContentStore>;

/// Builds a single in-memory `Bytes` chunk into the `ByteStream` shape the
/// trait expects — convenient for small writes (presigned-URL confirmation
/// bodies, test fixtures) where chunked streaming isn't necessary.
pub fn single_chunk_stream(bytes: Bytes) -> ByteStream {
    Box::pin(futures_util::stream::once(async move { Ok(bytes) }))
}
