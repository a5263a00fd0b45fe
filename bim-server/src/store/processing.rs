//! `Model`, `ModelVersion`, and `ProcessingJob` persistence, including the
//! version status machine, which only ever advances linearly.

use chrono::Utc;
use uuid::Uuid;

use super::model::{JobStatus, Model, ModelVersion, ModelVersionStatus, ProcessingJob};
use super::Store;
use crate::error::AppError;

impl Store {
    pub async fn create_model(&self, project_id: Uuid, name: &str) -> Result<Model, AppError> {
        let model = Model { id: Uuid::new_v4(), project_id, name: name.to_string() };
        sqlx::query("INSERT INTO models (id, project_id, name) VALUES (?, ?, ?)")
            .bind(model.id)
            .bind(model.project_id)
            .bind(&model.name)
            .execute(self.pool())
            .await?;
        Ok(model)
    }

    pub async fn get_model(&self, id: Uuid) -> Result<Model, AppError> {
        sqlx::query_as::<_, Model>("SELECT * FROM models WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("model {id} not found")))
    }

    /// Creates the next dense version number for `model_id` and the
    /// version row, in one transaction (§3: `(modelId, versionNumber)` is
    /// unique and dense per model.
    pub async fn create_model_version(&self, model_id: Uuid, ifc_file_id: Uuid) -> Result<ModelVersion, AppError> {
        let mut tx = self.pool().begin().await?;
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version_number), 0) + 1 FROM model_versions WHERE model_id = ?")
            .bind(model_id)
            .fetch_one(&mut *tx)
            .await?;
        let version = ModelVersion {
            id: Uuid::new_v4(),
            model_id,
            version_number: next,
            ifc_file_id,
            wex_bim_file_id: None,
            properties_file_id: None,
            status: ModelVersionStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        sqlx::query(
            "INSERT INTO model_versions (id, model_id, version_number, ifc_file_id, wex_bim_file_id, \
             properties_file_id, status, error_message, created_at, processed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(version.id)
        .bind(version.model_id)
        .bind(version.version_number)
        .bind(version.ifc_file_id)
        .bind(version.wex_bim_file_id)
        .bind(version.properties_file_id)
        .bind(version.status)
        .bind(&version.error_message)
        .bind(version.created_at)
        .bind(version.processed_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(version)
    }

    pub async fn get_model_version(&self, id: Uuid) -> Result<ModelVersion, AppError> {
        sqlx::query_as::<_, ModelVersion>("SELECT * FROM model_versions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("model version {id} not found")))
    }

    pub async fn mark_version_processing(&self, id: Uuid) -> Result<ModelVersion, AppError> {
        sqlx::query("UPDATE model_versions SET status = ? WHERE id = ? AND status = ?")
            .bind(ModelVersionStatus::Processing)
            .bind(id)
            .bind(ModelVersionStatus::Pending)
            .execute(self.pool())
            .await?;
        self.get_model_version(id).await
    }

    /// Terminal transition to `Ready`: sets the derived-artifact file ids,
    /// which are only ever populated once the version reaches `Ready`, in
    /// the same statement.
    pub async fn mark_version_ready(&self, id: Uuid, wex_bim_file_id: Uuid, properties_file_id: Uuid) -> Result<ModelVersion, AppError> {
        sqlx::query(
            "UPDATE model_versions SET status = ?, wex_bim_file_id = ?, properties_file_id = ?, processed_at = ? WHERE id = ?",
        )
        .bind(ModelVersionStatus::Ready)
        .bind(wex_bim_file_id)
        .bind(properties_file_id)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;
        self.get_model_version(id).await
    }

    pub async fn mark_version_failed(&self, id: Uuid, error_message: &str) -> Result<ModelVersion, AppError> {
        let truncated: String = error_message.chars().take(4000).collect();
        sqlx::query("UPDATE model_versions SET status = ?, error_message = ?, processed_at = ? WHERE id = ?")
            .bind(ModelVersionStatus::Failed)
            .bind(truncated)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_model_version(id).await
    }

    pub async fn create_processing_job(&self, model_version_id: Uuid, job_type: &str) -> Result<ProcessingJob, AppError> {
        let job = ProcessingJob {
            id: Uuid::new_v4(),
            model_version_id,
            job_type: job_type.to_string(),
            status: JobStatus::Queued,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        sqlx::query(
            "INSERT INTO processing_jobs (id, model_version_id, job_type, status, error_message, created_at, started_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id)
        .bind(job.model_version_id)
        .bind(&job.job_type)
        .bind(job.status)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(self.pool())
        .await?;
        Ok(job)
    }

    pub async fn mark_job_running(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE processing_jobs SET status = ?, started_at = ? WHERE id = ?")
            .bind(JobStatus::Running)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn mark_job_completed(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE processing_jobs SET status = ?, completed_at = ? WHERE id = ?")
            .bind(JobStatus::Completed)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn mark_job_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError> {
        let truncated: String = error_message.chars().take(4000).collect();
        sqlx::query("UPDATE processing_jobs SET status = ?, error_message = ?, completed_at = ? WHERE id = ?")
            .bind(JobStatus::Failed)
            .bind(truncated)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
