//! Wire DTOs for the HTTP surface. Kept separate from the
//! entity types in `store::model` so storage columns (e.g. `storage_key`,
//! token hashes) never leak onto the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::model::{
    File, FileCategory, IfcElement, Model, ModelVersion, ModelVersionStatus, PersonalAccessToken, Project, UploadMode, UploadSession, UploadStatus,
    Workspace,
};

#[derive(Debug, Serialize)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    #[serde(rename = "totalCount")]
    pub total_count: i64,
}

impl<T> PagedList<T> {
    pub fn new(items: Vec<T>, page: i64, page_size: i64, total_count: i64) -> Self {
        Self { items, page, page_size, total_count }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size", rename = "pageSize")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Workspace> for WorkspaceDto {
    fn from(w: Workspace) -> Self {
        Self { id: w.id, name: w.name, description: w.description, created_at: w.created_at, updated_at: w.updated_at }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkspaceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Project> for ProjectDto {
    fn from(p: Project) -> Self {
        Self { id: p.id, workspace_id: p.workspace_id, name: p.name, description: p.description, created_at: p.created_at, updated_at: p.updated_at }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub checksum: Option<String>,
    pub kind: String,
    pub category: FileCategory,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<File> for FileDto {
    fn from(f: File) -> Self {
        Self {
            id: f.id,
            project_id: f.project_id,
            name: f.name,
            content_type: f.content_type,
            size_bytes: f.size_bytes,
            checksum: f.checksum,
            kind: f.kind,
            category: f.category,
            is_deleted: f.is_deleted,
            created_at: f.created_at,
            deleted_at: f.deleted_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionDto {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub expected_size_bytes: Option<i64>,
    pub status: UploadStatus,
    pub upload_mode: UploadMode,
    pub committed_file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<UploadSession> for UploadSessionDto {
    fn from(s: UploadSession) -> Self {
        Self {
            id: s.id,
            project_id: s.project_id,
            file_name: s.file_name,
            content_type: s.content_type,
            expected_size_bytes: s.expected_size_bytes,
            status: s.status,
            upload_mode: s.upload_mode,
            committed_file_id: s.committed_file_id,
            created_at: s.created_at,
            expires_at: s.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveUploadRequest {
    pub file_name: String,
    pub content_type: Option<String>,
    pub expected_size_bytes: Option<i64>,
    #[serde(default)]
    pub mode: UploadMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveUploadResponse {
    pub session: UploadSessionDto,
    pub upload_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadContentResponse {
    pub session: UploadSessionDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitUploadRequest {
    #[serde(default)]
    pub category: FileCategory,
    pub kind: String,
    pub model_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitUploadResponse {
    pub file: FileDto,
    pub session: UploadSessionDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDto {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
}

impl From<Model> for ModelDto {
    fn from(m: Model) -> Self {
        Self { id: m.id, project_id: m.project_id, name: m.name }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateModelRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelVersionRequest {
    pub ifc_file_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersionDto {
    pub id: Uuid,
    pub model_id: Uuid,
    pub version_number: i64,
    pub ifc_file_id: Uuid,
    pub wex_bim_file_id: Option<Uuid>,
    pub properties_file_id: Option<Uuid>,
    pub status: ModelVersionStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<ModelVersion> for ModelVersionDto {
    fn from(v: ModelVersion) -> Self {
        Self {
            id: v.id,
            model_id: v.model_id,
            version_number: v.version_number,
            ifc_file_id: v.ifc_file_id,
            wex_bim_file_id: v.wex_bim_file_id,
            properties_file_id: v.properties_file_id,
            status: v.status,
            error_message: v.error_message,
            created_at: v.created_at,
            processed_at: v.processed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PropertiesQuery {
    pub label: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size", rename = "pageSize")]
    pub page_size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IfcElementDto {
    pub id: Uuid,
    pub model_version_id: Uuid,
    pub entity_label: i64,
    pub global_id: Option<String>,
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub object_type: Option<String>,
    pub type_object_name: Option<String>,
    pub type_object_type: Option<String>,
}

impl From<IfcElement> for IfcElementDto {
    fn from(e: IfcElement) -> Self {
        Self {
            id: e.id,
            model_version_id: e.model_version_id,
            entity_label: e.entity_label,
            global_id: e.global_id,
            name: e.name,
            type_name: e.type_name,
            description: e.description,
            object_type: e.object_type,
            type_object_name: e.type_object_name,
            type_object_type: e.type_object_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatRequest {
    pub name: String,
    pub description: Option<String>,
    pub scopes: Vec<String>,
    /// Requested TTL in seconds; clamped to the configured maximum.
    pub ttl_secs: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalAccessTokenCreatedDto {
    pub id: Uuid,
    /// The only time the plaintext token is ever returned.
    pub token: String,
    pub token_prefix: String,
    pub name: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl PersonalAccessTokenCreatedDto {
    pub fn new(pat: PersonalAccessToken, token: String) -> Self {
        Self {
            id: pat.id,
            token,
            token_prefix: pat.token_prefix,
            name: pat.name,
            scopes: pat.scopes.split_whitespace().map(str::to_string).collect(),
            expires_at: pat.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequestBody {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequestForm {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}
