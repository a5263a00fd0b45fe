//! IFC Conversion Orchestrator: the worker-side handler that turns
//! a committed IFC file into a WexBIM artifact, a property index, and the
//! `IfcElement` rows behind `GET /versions/{id}/properties`.

pub mod progress;

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use self::progress::{ProcessingProgress, ProgressNotifier};
use crate::content_store::ByteStream;
use crate::error::AppError;
use crate::queue::worker::JobHandler;
use crate::queue::JobEnvelope;
use crate::store::files::NewFile;
use crate::store::ifc::ExtractedElement;
use crate::store::model::{FileCategory, FileLinkType};
use crate::store::Store;
use crate::uploads::UploadCoordinator;

/// The geometry engine is an external collaborator the orchestrator
/// delegates to; this stub produces deterministic,
/// content-addressed bytes and makes no claim to be a real tessellation
/// kernel.
#[async_trait::async_trait]
pub trait IfcGeometryEngine: Send + Sync {
    async fn tessellate(&self, ifc_bytes: &[u8]) -> Result<Bytes, AppError>;
}

pub struct StubGeometryEngine;

#[async_trait::async_trait]
impl IfcGeometryEngine for StubGeometryEngine {
    async fn tessellate(&self, ifc_bytes: &[u8]) -> Result<Bytes, AppError> {
        let mut hasher = Sha256::new();
        hasher.update(ifc_bytes);
        Ok(Bytes::from(hasher.finalize().to_vec()))
    }
}

/// Extracts `IfcElement` rows from the raw IFC STEP text. A minimal
/// line-oriented reader: it recognizes `#<label>=<TYPE>(...)` entity
/// instances and pulls the first two quoted strings as `globalId`/`name`,
/// which covers the common single-inheritance entity shapes without a
/// full EXPRESS schema. Property sets and quantity sets are left empty —
/// a fuller extractor is out of scope here.
pub trait PropertyExtractor: Send + Sync {
    fn extract(&self, ifc_bytes: &[u8]) -> Result<Vec<ExtractedElement>, AppError>;
}

pub struct StepLinePropertyExtractor;

impl PropertyExtractor for StepLinePropertyExtractor {
    fn extract(&self, ifc_bytes: &[u8]) -> Result<Vec<ExtractedElement>, AppError> {
        let text = String::from_utf8_lossy(ifc_bytes);
        let mut elements = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            let Some(rest) = line.strip_prefix('#') else { continue };
            let Some(eq) = rest.find('=') else { continue };
            let Ok(entity_label) = rest[..eq].trim().parse::<i64>() else { continue };
            let body = rest[eq + 1..].trim();
            let Some(paren) = body.find('(') else { continue };
            let type_name = body[..paren].trim().to_string();
            if !type_name.starts_with("IFC") {
                continue;
            }
            let args = body[paren + 1..].trim_end_matches(';').trim_end_matches(')');
            let quoted = quoted_strings(args);
            elements.push(ExtractedElement {
                entity_label,
                global_id: quoted.first().cloned(),
                name: quoted.get(1).cloned(),
                type_name: Some(type_name),
                description: None,
                object_type: None,
                type_object_name: None,
                type_object_type: None,
                property_sets: Vec::new(),
                quantity_sets: Vec::new(),
            });
        }
        Ok(elements)
    }
}

fn quoted_strings(s: &str) -> Vec<String> {
    s.split('\'').enumerate().filter(|(i, _)| i % 2 == 1).map(|(_, s)| s.to_string()).collect()
}

#[derive(serde::Serialize)]
struct PropertiesIndexEntry<'a> {
    #[serde(rename = "entityLabel")]
    entity_label: i64,
    #[serde(rename = "globalId")]
    global_id: Option<&'a str>,
    name: Option<&'a str>,
    #[serde(rename = "typeName")]
    type_name: Option<&'a str>,
}

fn properties_index(elements: &[ExtractedElement]) -> Vec<PropertiesIndexEntry<'_>> {
    elements
        .iter()
        .map(|e| PropertiesIndexEntry {
            entity_label: e.entity_label,
            global_id: e.global_id.as_deref(),
            name: e.name.as_deref(),
            type_name: e.type_name.as_deref(),
        })
        .collect()
}

pub struct IfcConversionOrchestrator {
    store: Store,
    uploads: UploadCoordinator,
    geometry_engine: Arc<dyn IfcGeometryEngine>,
    property_extractor: Arc<dyn PropertyExtractor>,
    progress: ProgressNotifier,
}

impl IfcConversionOrchestrator {
    pub fn new(store: Store, uploads: UploadCoordinator, progress: ProgressNotifier) -> Self {
        Self {
            store,
            uploads,
            geometry_engine: Arc::new(StubGeometryEngine),
            property_extractor: Arc::new(StepLinePropertyExtractor),
            progress,
        }
    }

    pub fn with_geometry_engine(mut self, engine: Arc<dyn IfcGeometryEngine>) -> Self {
        self.geometry_engine = engine;
        self
    }

    pub fn with_property_extractor(mut self, extractor: Arc<dyn PropertyExtractor>) -> Self {
        self.property_extractor = extractor;
        self
    }

    pub async fn run(&self, job_id: Uuid, model_version_id: Uuid) -> Result<(), AppError> {
        self.store.mark_job_running(job_id).await?;
        match self.convert(job_id, model_version_id).await {
            Ok(()) => {
                self.store.mark_job_completed(job_id).await?;
                Ok(())
            }
            Err(err) => {
                let _ = self.store.mark_version_failed(model_version_id, &err.to_string()).await;
                let _ = self.store.mark_job_failed(job_id, &err.to_string()).await;
                self.progress.publish(ProcessingProgress::failure(job_id, model_version_id, err.to_string())).await;
                Err(err)
            }
        }
    }

    async fn convert(&self, job_id: Uuid, model_version_id: Uuid) -> Result<(), AppError> {
        self.progress.publish(ProcessingProgress::stage(job_id, model_version_id, "Opening", 0, "loading source IFC file")).await;

        let version = self.store.mark_version_processing(model_version_id).await?;
        let model = self.store.get_model(version.model_id).await?;
        let project = self.store.get_project(model.project_id).await?;
        let ifc_file = self.store.get_file(version.ifc_file_id).await?;

        let reader = self
            .uploads
            .content_store()
            .open_read(&ifc_file.storage_key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("source file {} has no bytes", ifc_file.storage_key)))?;
        let ifc_bytes = buffer_via_temp_file(reader).await?;

        self.progress.publish(ProcessingProgress::stage(job_id, model_version_id, "Processing", 20, "parsing IFC entities")).await;
        let elements = self.property_extractor.extract(&ifc_bytes)?;

        self.progress.publish(ProcessingProgress::stage(job_id, model_version_id, "Geometry", 30, "running geometry engine")).await;
        let wexbim_bytes = self.geometry_engine.tessellate(&ifc_bytes).await?;
        let wexbim_size = wexbim_bytes.len() as i64;

        self.progress.publish(ProcessingProgress::stage(job_id, model_version_id, "Tessellation", 70, "writing derived artifacts")).await;
        let wexbim_key = self.uploads.write_artifact(project.workspace_id, project.id, "wexbim", "wexbim", wexbim_bytes).await?;
        let wexbim_file = self
            .store
            .insert_file(NewFile {
                project_id: project.id,
                name: "model.wexbim",
                content_type: Some("application/octet-stream"),
                size_bytes: wexbim_size,
                checksum: None,
                kind: "wexbim",
                category: FileCategory::WexBim,
                storage_provider: "default",
                storage_key: &wexbim_key,
            })
            .await?;
        self.store.insert_file_link(ifc_file.id, wexbim_file.id, FileLinkType::DerivedFrom).await?;

        let properties_json = serde_json::to_vec(&properties_index(&elements)).map_err(|e| AppError::Internal(e.to_string()))?;
        let properties_size = properties_json.len() as i64;
        let properties_key = self
            .uploads
            .write_artifact(project.workspace_id, project.id, "properties", "json", Bytes::from(properties_json))
            .await?;
        let properties_file = self
            .store
            .insert_file(NewFile {
                project_id: project.id,
                name: "model.properties.json",
                content_type: Some("application/json"),
                size_bytes: properties_size,
                checksum: None,
                kind: "properties",
                category: FileCategory::Properties,
                storage_provider: "default",
                storage_key: &properties_key,
            })
            .await?;
        self.store.insert_file_link(ifc_file.id, properties_file.id, FileLinkType::PropertiesOf).await?;

        self.progress.publish(ProcessingProgress::stage(job_id, model_version_id, "Finalizing", 95, "persisting extracted entities")).await;
        self.store.bulk_insert_ifc_elements(model_version_id, elements).await?;

        self.store.mark_version_ready(model_version_id, wexbim_file.id, properties_file.id).await?;
        self.progress.publish(ProcessingProgress::success(job_id, model_version_id)).await;
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobHandler for IfcConversionOrchestrator {
    async fn handle(&self, job: &JobEnvelope) -> Result<(), AppError> {
        let model_version_id = job.model_version_id().ok_or_else(|| AppError::Validation("job payload is missing modelVersionId".into()))?;
        self.run(job.id, model_version_id).await
    }
}

/// Buffers a content-store read through a scoped temp file rather than an
/// unbounded in-memory `Vec`, always cleaned up on drop regardless of
/// success.
async fn buffer_via_temp_file(mut stream: ByteStream) -> Result<Vec<u8>, AppError> {
    use tokio::io::AsyncWriteExt;

    let tmp = tempfile::NamedTempFile::new().map_err(AppError::from)?;
    let mut file = tokio::fs::File::create(tmp.path()).await?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    tokio::fs::read(tmp.path()).await.map_err(AppError::from)
}
