//! Upload Coordinator: the reserve → upload → commit state machine,
//! composing the Entity Store (`store`) and the Content Store
//! (`content_store`) behind one API the HTTP surface calls.

use bytes::Bytes;
use chrono::{Duration, Utc};
use futures_util::Stream;
use uuid::Uuid;

use crate::content_store::key::{artifact_key, upload_key};
use crate::content_store::{single_chunk_stream, ByteStream, DynContentStore};
use crate::error::AppError;
use crate::queue::{JobEnvelope, JobQueueHandle};
use crate::store::model::{FileCategory, UploadMode, UploadSession, UploadStatus};
use crate::store::Store;

#[derive(Clone)]
pub struct UploadCoordinator {
    store: Store,
    content_store: DynContentStore,
    queue: JobQueueHandle,
    session_ttl: Duration,
}

pub struct ReserveOptions<'a> {
    pub file_name: &'a str,
    pub content_type: Option<&'a str>,
    pub expected_size_bytes: Option<i64>,
    pub mode: UploadMode,
}

pub struct ReserveResult {
    pub session: UploadSession,
    pub upload_url: Option<String>,
}

/// What `commit_upload` should do with the newly-created `File`.
/// `model_id` is `Some` only when the caller also wants a `ModelVersion`
/// created from this file — which only makes sense for `category = Ifc`.
pub struct CommitOptions {
    pub category: FileCategory,
    pub kind: String,
    pub model_id: Option<Uuid>,
}

impl UploadCoordinator {
    pub fn new(store: Store, content_store: DynContentStore, queue: JobQueueHandle, session_ttl: Duration) -> Self {
        Self { store, content_store, queue, session_ttl }
    }

    /// Reserves a session and, in `DirectToBlob` mode, a presigned upload
    /// URL bound to a fresh key. `NotSupported` if the backend can't
    /// produce one.
    pub async fn reserve_upload(&self, workspace_id: Uuid, project_id: Uuid, opts: ReserveOptions<'_>) -> Result<ReserveResult, AppError> {
        let session_id = Uuid::new_v4();
        let ext = extension_of(opts.file_name);
        let temp_key = upload_key(workspace_id, project_id, session_id, ext.as_deref());

        let upload_url = match opts.mode {
            UploadMode::ServerProxy => None,
            UploadMode::DirectToBlob => {
                let expires_at = Utc::now() + self.session_ttl;
                Some(
                    self.content_store
                        .generate_upload_url(&temp_key, opts.content_type, expires_at)
                        .await?
                        .ok_or_else(|| AppError::NotSupported("this content store backend does not support direct uploads".into()))?,
                )
            }
        };

        let session = self
            .store
            .reserve_upload_session(
                session_id,
                project_id,
                opts.file_name,
                opts.content_type,
                opts.expected_size_bytes,
                opts.mode,
                Some(&temp_key),
                upload_url.as_deref(),
                self.session_ttl,
            )
            .await?;

        Ok(ReserveResult { session, upload_url })
    }

    pub async fn get_upload_session(&self, project_id: Uuid, session_id: Uuid) -> Result<UploadSession, AppError> {
        let session = self.store.get_upload_session(session_id).await?;
        if session.project_id != project_id {
            return Err(AppError::NotFound(format!("upload session {session_id} not found")));
        }
        Ok(session)
    }

    /// Streams bytes into the temp key through the content store.
    /// `ServerProxy` mode only, from `Reserved` or `Uploading` (idempotent
    /// once already `Uploading`).
    pub async fn upload_content<S>(&self, project_id: Uuid, session_id: Uuid, content_type: Option<&str>, stream: S) -> Result<UploadSession, AppError>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        let session = self.get_upload_session(project_id, session_id).await?;
        if session.upload_mode != UploadMode::ServerProxy {
            return Err(AppError::Conflict("this session does not accept server-proxied content".into()));
        }
        if !matches!(session.status, UploadStatus::Reserved | UploadStatus::Uploading) {
            return Err(AppError::Conflict(format!("upload session is in state {:?} and cannot accept content", session.status)));
        }
        let key = session
            .temp_storage_key
            .clone()
            .ok_or_else(|| AppError::Internal("server-proxy session is missing its temp storage key".into()))?;

        let boxed: ByteStream = Box::pin(stream);
        if let Err(e) = self.content_store.put(&key, boxed, content_type).await {
            self.store.set_upload_status(session_id, UploadStatus::Failed).await?;
            return Err(e.into());
        }
        self.store.set_upload_status(session_id, UploadStatus::Uploading).await
    }

    /// Commits a session: verifies the bytes are present, records a
    /// `File`, optionally creates a `ModelVersion` and enqueues a
    /// conversion job, and transitions the session to `Committed` —
    /// idempotent when called again on an already-committed session.
    pub async fn commit_upload(&self, project_id: Uuid, session_id: Uuid, opts: CommitOptions) -> Result<crate::store::model::File, AppError> {
        let session = self.get_upload_session(project_id, session_id).await?;

        if session.status == UploadStatus::Committed {
            let file_id = session
                .committed_file_id
                .ok_or_else(|| AppError::Internal("committed session is missing its file id".into()))?;
            return self.store.get_file(file_id).await;
        }
        if !matches!(session.status, UploadStatus::Reserved | UploadStatus::Uploading) {
            return Err(AppError::Conflict(format!("upload session is in state {:?} and cannot be committed", session.status)));
        }

        let key = session
            .temp_storage_key
            .clone()
            .ok_or_else(|| AppError::Internal("session is missing its temp storage key".into()))?;

        if !self.content_store.exists(&key).await? {
            self.store.set_upload_status(session_id, UploadStatus::Failed).await?;
            return Err(AppError::Conflict("no bytes were found for this upload session".into()));
        }
        let size_bytes = self.content_store.size(&key).await?.unwrap_or(0) as i64;

        let file = self
            .store
            .insert_file(crate::store::files::NewFile {
                project_id,
                name: &session.file_name,
                content_type: session.content_type.as_deref(),
                size_bytes,
                checksum: None,
                kind: &opts.kind,
                category: opts.category,
                storage_provider: self.content_store_name(),
                storage_key: &key,
            })
            .await?;

        if let (Some(model_id), FileCategory::Ifc) = (opts.model_id, opts.category) {
            let version = self.store.create_model_version(model_id, file.id).await?;
            let job = self.store.create_processing_job(version.id, "IfcToWexBim").await?;
            self.queue
                .enqueue(JobEnvelope::with_id(job.id, "IfcToWexBim", serde_json::json!({ "modelVersionId": version.id })))
                .await?;
        }

        self.store.commit_upload_session(session_id, file.id).await
    }

    /// Creates a `ModelVersion` from an already-committed Ifc `File` and
    /// enqueues its conversion job — the same step `commit_upload` takes
    /// inline, exposed separately for `POST /models/{id}/versions`, which
    /// operates on a file committed in an earlier request.
    pub async fn create_version_and_enqueue(&self, model_id: Uuid, ifc_file_id: Uuid) -> Result<crate::store::model::ModelVersion, AppError> {
        let version = self.store.create_model_version(model_id, ifc_file_id).await?;
        let job = self.store.create_processing_job(version.id, "IfcToWexBim").await?;
        self.queue
            .enqueue(JobEnvelope::with_id(job.id, "IfcToWexBim", serde_json::json!({ "modelVersionId": version.id })))
            .await?;
        Ok(version)
    }

    fn content_store_name(&self) -> &'static str {
        // The coordinator is only ever constructed with one backend at a
        // time; the name tags the `File` row for diagnostics, not for
        // dispatch (the backend itself is resolved once at startup).
        "default"
    }

    /// Periodic sweep: expires stale sessions and queues
    /// their temp keys for deletion. Idempotent — safe to call on a
    /// fixed interval from `main.rs`.
    pub async fn sweep_expired_sessions(&self) -> Result<usize, AppError> {
        let expired = self.store.expire_stale_upload_sessions(Utc::now()).await?;
        for session in &expired {
            if let Some(key) = &session.temp_storage_key {
                let _ = self.content_store.delete(key).await;
            }
        }
        Ok(expired.len())
    }

    /// Writes a finished conversion artifact and returns its key, for the
    /// conversion orchestrator, which shares this coordinator's
    /// content store and key scheme.
    pub async fn write_artifact(&self, workspace_id: Uuid, project_id: Uuid, artifact_type: &str, ext: &str, bytes: Bytes) -> Result<String, AppError> {
        let key = artifact_key(workspace_id, project_id, artifact_type, ext);
        self.content_store.put(&key, single_chunk_stream(bytes), Some(content_type_for(ext))).await?;
        Ok(key)
    }

    pub fn content_store(&self) -> &DynContentStore {
        &self.content_store
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name).extension().and_then(|e| e.to_str()).map(str::to_string)
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "wexbim" => "application/octet-stream",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
