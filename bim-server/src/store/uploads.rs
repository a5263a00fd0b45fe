//! `UploadSession` persistence and its monotonic state machine.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::model::{UploadMode, UploadSession, UploadStatus};
use super::Store;
use crate::error::AppError;

impl Store {
    #[allow(clippy::too_many_arguments)]
    pub async fn reserve_upload_session(
        &self,
        id: Uuid,
        project_id: Uuid,
        file_name: &str,
        content_type: Option<&str>,
        expected_size_bytes: Option<i64>,
        upload_mode: UploadMode,
        temp_storage_key: Option<&str>,
        direct_upload_url: Option<&str>,
        ttl: Duration,
    ) -> Result<UploadSession, AppError> {
        let now = Utc::now();
        let session = UploadSession {
            id,
            project_id,
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
            expected_size_bytes,
            status: UploadStatus::Reserved,
            upload_mode,
            temp_storage_key: temp_storage_key.map(str::to_string),
            direct_upload_url: direct_upload_url.map(str::to_string),
            committed_file_id: None,
            created_at: now,
            expires_at: now + ttl,
        };
        sqlx::query(
            "INSERT INTO upload_sessions (id, project_id, file_name, content_type, expected_size_bytes, \
             status, upload_mode, temp_storage_key, direct_upload_url, committed_file_id, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id)
        .bind(session.project_id)
        .bind(&session.file_name)
        .bind(&session.content_type)
        .bind(session.expected_size_bytes)
        .bind(session.status)
        .bind(session.upload_mode)
        .bind(&session.temp_storage_key)
        .bind(&session.direct_upload_url)
        .bind(session.committed_file_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(self.pool())
        .await?;
        Ok(session)
    }

    pub async fn get_upload_session(&self, id: Uuid) -> Result<UploadSession, AppError> {
        sqlx::query_as::<_, UploadSession>("SELECT * FROM upload_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("upload session {id} not found")))
    }

    pub async fn set_upload_status(&self, id: Uuid, status: UploadStatus) -> Result<UploadSession, AppError> {
        sqlx::query("UPDATE upload_sessions SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_upload_session(id).await
    }

    pub async fn commit_upload_session(&self, id: Uuid, file_id: Uuid) -> Result<UploadSession, AppError> {
        sqlx::query("UPDATE upload_sessions SET status = ?, committed_file_id = ? WHERE id = ?")
            .bind(UploadStatus::Committed)
            .bind(file_id)
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_upload_session(id).await
    }

    /// Idempotent sweep: transitions every `Reserved`/`Uploading` session
    /// past `expires_at` to `Expired`. Returns the sessions that were
    /// transitioned so the caller can queue their temp keys for deletion.
    pub async fn expire_stale_upload_sessions(&self, now: DateTime<Utc>) -> Result<Vec<UploadSession>, AppError> {
        let stale = sqlx::query_as::<_, UploadSession>(
            "SELECT * FROM upload_sessions WHERE status IN ('reserved', 'uploading') AND expires_at < ?",
        )
        .bind(now)
        .fetch_all(self.pool())
        .await?;
        for session in &stale {
            sqlx::query("UPDATE upload_sessions SET status = ? WHERE id = ?")
                .bind(UploadStatus::Expired)
                .bind(session.id)
                .execute(self.pool())
                .await?;
        }
        Ok(stale)
    }
}
