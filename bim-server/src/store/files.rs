//! `File` and `FileLink` persistence. Files are logically
//! referenced by `FileLink`s without cascading deletes — physical byte
//! deletion is the content store's decision (see `content_store`).

use chrono::Utc;
use uuid::Uuid;

use super::model::{File, FileCategory, FileLink, FileLinkType};
use super::Store;
use crate::content_store::key::{reject_traversal, validate_project};
use crate::error::AppError;

pub struct NewFile<'a> {
    pub project_id: Uuid,
    pub name: &'a str,
    pub content_type: Option<&'a str>,
    pub size_bytes: i64,
    pub checksum: Option<&'a str>,
    pub kind: &'a str,
    pub category: FileCategory,
    pub storage_provider: &'a str,
    pub storage_key: &'a str,
}

impl Store {
    /// Enforces I1 before the row is written: `storage_key` must start
    /// with `<workspaceUid>/<projectUid>/...` and must not escape the
    /// content store's base directory.
    pub async fn insert_file(&self, f: NewFile<'_>) -> Result<File, AppError> {
        reject_traversal(f.storage_key)?;
        let project = self.get_project(f.project_id).await?;
        validate_project(f.storage_key, project.workspace_id, f.project_id)?;

        let file = File {
            id: Uuid::new_v4(),
            project_id: f.project_id,
            name: f.name.to_string(),
            content_type: f.content_type.map(str::to_string),
            size_bytes: f.size_bytes,
            checksum: f.checksum.map(str::to_string),
            kind: f.kind.to_string(),
            category: f.category,
            storage_provider: f.storage_provider.to_string(),
            storage_key: f.storage_key.to_string(),
            is_deleted: false,
            created_at: Utc::now(),
            deleted_at: None,
        };
        sqlx::query(
            "INSERT INTO files (id, project_id, name, content_type, size_bytes, checksum, kind, \
             category, storage_provider, storage_key, is_deleted, created_at, deleted_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.id)
        .bind(file.project_id)
        .bind(&file.name)
        .bind(&file.content_type)
        .bind(file.size_bytes)
        .bind(&file.checksum)
        .bind(&file.kind)
        .bind(file.category)
        .bind(&file.storage_provider)
        .bind(&file.storage_key)
        .bind(file.is_deleted)
        .bind(file.created_at)
        .bind(file.deleted_at)
        .execute(self.pool())
        .await?;
        Ok(file)
    }

    pub async fn get_file(&self, id: Uuid) -> Result<File, AppError> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {id} not found")))
    }

    pub async fn list_files(&self, project_id: Uuid, page: i64, page_size: i64) -> Result<(Vec<File>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE project_id = ? AND is_deleted = 0")
            .bind(project_id)
            .fetch_one(self.pool())
            .await?;
        let rows = sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE project_id = ? AND is_deleted = 0 ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(project_id)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(self.pool())
        .await?;
        Ok((rows, total))
    }

    /// Soft delete: flips `is_deleted`. Bytes are retained until the
    /// garbage-collection sweep (see DESIGN.md for the sweep policy).
    pub async fn soft_delete_file(&self, id: Uuid) -> Result<File, AppError> {
        sqlx::query("UPDATE files SET is_deleted = 1, deleted_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_file(id).await
    }

    pub async fn insert_file_link(&self, source_file_id: Uuid, target_file_id: Uuid, link_type: FileLinkType) -> Result<FileLink, AppError> {
        let link = FileLink {
            id: Uuid::new_v4(),
            source_file_id,
            target_file_id,
            link_type,
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO file_links (id, source_file_id, target_file_id, link_type, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(link.id)
            .bind(link.source_file_id)
            .bind(link.target_file_id)
            .bind(link.link_type)
            .bind(link.created_at)
            .execute(self.pool())
            .await?;
        Ok(link)
    }

    /// Files with no incoming link whose referencing model version failed,
    /// older than `older_than`: candidates for the orphan-artifact sweep.
    pub async fn find_orphaned_failed_artifacts(&self, older_than: chrono::DateTime<Utc>) -> Result<Vec<File>, AppError> {
        let rows = sqlx::query_as::<_, File>(
            "SELECT f.* FROM files f \
             LEFT JOIN file_links l ON l.target_file_id = f.id \
             WHERE l.id IS NULL AND f.is_deleted = 0 AND f.created_at < ? \
             AND f.category IN ('wex_bim', 'properties') \
             AND NOT EXISTS (SELECT 1 FROM model_versions mv WHERE mv.wex_bim_file_id = f.id OR mv.properties_file_id = f.id)",
        )
        .bind(older_than)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
