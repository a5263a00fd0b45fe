//! S3-backed `ContentStore`. Added to the dependency set specifically for
//! this capability — no teacher crate offers blob storage (see DESIGN.md).
//! `generate_upload_url` issues a presigned PUT that grants only
//! create+write on the one key and expires at the requested instant.

use std::time::Duration as StdDuration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt};

use super::key::reject_traversal;
use super::{ByteStream, ContentStore, StoreError, StoreHealth};

pub struct CloudContentStore {
    client: Client,
    bucket: String,
}

impl CloudContentStore {
    pub async fn new(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self { client: Client::new(&config), bucket: bucket.into() }
    }

    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }
}

#[async_trait::async_trait]
impl ContentStore for CloudContentStore {
    async fn put(&self, key: &str, mut stream: ByteStream, content_type: Option<&str>) -> Result<(), StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;

        if self.exists(key).await? {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }

        // Buffered: the SDK's streaming body needs a known length for a
        // single-shot PUT; a production engine would switch to multipart
        // upload above a size threshold instead.
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StoreError::Backend(e.to_string()))?;
            buf.extend_from_slice(&chunk);
        }

        let mut req = self.client.put_object().bucket(&self.bucket).key(key).body(S3ByteStream::from(buf));
        if let Some(ct) = content_type {
            req = req.content_type(ct);
        }
        req.send().await.map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn open_read(&self, key: &str) -> Result<Option<ByteStream>, StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        let resp = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(resp) => resp,
            Err(err) => {
                let svc_err = err.into_service_error();
                if svc_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(StoreError::Backend(svc_err.to_string()));
            }
        };
        let stream = resp
            .body
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            .map_ok(Bytes::from);
        Ok(Some(Box::pin(stream)))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        let existed = self.exists(key).await?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let svc_err = err.into_service_error();
                if svc_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StoreError::Transient(svc_err.to_string()))
                }
            }
        }
    }

    async fn size(&self, key: &str) -> Result<Option<u64>, StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(resp) => Ok(resp.content_length().map(|l| l as u64)),
            Err(err) => {
                let svc_err = err.into_service_error();
                if svc_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(StoreError::Transient(svc_err.to_string()))
                }
            }
        }
    }

    async fn generate_upload_url(&self, key: &str, content_type: Option<&str>, expires_at: DateTime<Utc>) -> Result<Option<String>, StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        let ttl = (expires_at - Utc::now()).to_std().unwrap_or(StdDuration::from_secs(60));
        let presign_config = PresigningConfig::expires_in(ttl).map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut req = self.client.put_object().bucket(&self.bucket).key(key);
        if let Some(ct) = content_type {
            req = req.content_type(ct);
        }
        let presigned = req
            .presigned(presign_config)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Some(presigned.uri().to_string()))
    }

    async fn generate_download_url(&self, key: &str, expires_at: DateTime<Utc>) -> Result<Option<String>, StoreError> {
        reject_traversal(key).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
        let ttl = (expires_at - Utc::now()).to_std().unwrap_or(StdDuration::from_secs(60));
        let presign_config = PresigningConfig::expires_in(ttl).map_err(|e| StoreError::Backend(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Some(presigned.uri().to_string()))
    }

    async fn check_health(&self) -> StoreHealth {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => StoreHealth { healthy: true, message: None, data: Some(serde_json::json!({ "bucket": self.bucket })) },
            Err(e) => StoreHealth { healthy: false, message: Some(e.to_string()), data: None },
        }
    }
}
