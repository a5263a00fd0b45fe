//! Entity types for every relation in the data model.
//!
//! All primary keys are `Uuid`; all timestamps are `DateTime<Utc>`. Enums
//! are stored as `TEXT` via `sqlx::Type(rename_all = "snake_case")`,
//! matching the sqlite-first convention `r2e-data-sqlx` already uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! role_enum {
    ($name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(type_name = "TEXT", rename_all = "snake_case")]
        #[serde(rename_all = "camelCase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn rank(self) -> u8 {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }
    };
}

role_enum!(WorkspaceRole { Guest = 0, Member = 1, Admin = 2, Owner = 3 });
role_enum!(ProjectRole { Viewer = 0, Editor = 1, ProjectAdmin = 2 });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    #[default]
    Other,
    Ifc,
    WexBim,
    Properties,
    Thumbnail,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum FileLinkType {
    DerivedFrom,
    ThumbnailOf,
    PropertiesOf,
    LogOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum UploadStatus {
    Reserved,
    Uploading,
    Committed,
    Failed,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum UploadMode {
    #[default]
    ServerProxy,
    DirectToBlob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum ModelVersionStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum ClientType {
    Public,
    Confidential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum CodeChallengeMethod {
    S256,
    Plain,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WorkspaceMembership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProjectMembership {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub checksum: Option<String>,
    pub kind: String,
    pub category: FileCategory,
    pub storage_provider: String,
    pub storage_key: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLink {
    pub id: Uuid,
    pub source_file_id: Uuid,
    pub target_file_id: Uuid,
    pub link_type: FileLinkType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub expected_size_bytes: Option<i64>,
    pub status: UploadStatus,
    pub upload_mode: UploadMode,
    pub temp_storage_key: Option<String>,
    pub direct_upload_url: Option<String>,
    pub committed_file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
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

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    pub id: Uuid,
    pub model_version_id: Uuid,
    pub job_type: String,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IfcElement {
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

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct IfcPropertySet {
    pub id: Uuid,
    pub element_id: Uuid,
    pub name: String,
    pub global_id: Option<String>,
    pub is_type_property_set: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct IfcProperty {
    pub id: Uuid,
    pub property_set_id: Uuid,
    pub name: String,
    pub value: Option<String>,
    pub value_type: String,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct IfcQuantitySet {
    pub id: Uuid,
    pub element_id: Uuid,
    pub name: String,
    pub global_id: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct IfcQuantity {
    pub id: Uuid,
    pub quantity_set_id: Uuid,
    pub name: String,
    pub value: Option<f64>,
    pub value_type: String,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthApp {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub client_type: ClientType,
    pub client_id: String,
    pub client_secret_hash: Option<String>,
    /// Stored as a JSON array in a single TEXT column (sqlite has no native array type).
    pub redirect_uris: String,
    pub allowed_scopes: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by_user_id: Uuid,
}

impl OAuthApp {
    pub fn redirect_uri_list(&self) -> Vec<String> {
        serde_json::from_str(&self.redirect_uris).unwrap_or_default()
    }

    pub fn allowed_scope_list(&self) -> Vec<String> {
        serde_json::from_str(&self.allowed_scopes).unwrap_or_default()
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AuthorizationCode {
    pub id: Uuid,
    pub code_hash: String,
    pub o_auth_app_id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub scopes: String,
    pub redirect_uri: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<CodeChallengeMethod>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub token_hash: String,
    pub o_auth_app_id: Option<Uuid>,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub scopes: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub parent_token_id: Option<Uuid>,
    pub replaced_by_token_id: Option<Uuid>,
    pub token_family_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalAccessToken {
    pub id: Uuid,
    pub token_hash: String,
    pub token_prefix: String,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub scopes: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_used_ip_address: Option<String>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub created_from_ip_address: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OAuthAppAuditLog {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub event_type: String,
    pub actor_user_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PersonalAccessTokenAuditLog {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub event_type: String,
    pub actor_user_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Closed scope set. Serialized/parsed as space-joined strings
/// on token claims, matching the OAuth `scope` claim convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    WorkspacesRead,
    WorkspacesWrite,
    ProjectsRead,
    ProjectsWrite,
    FilesRead,
    FilesWrite,
    ModelsRead,
    ModelsWrite,
    ProcessingRead,
    ProcessingWrite,
    OAuthAppsRead,
    OAuthAppsWrite,
    OAuthAppsAdmin,
    PatsRead,
    PatsWrite,
    PatsAdmin,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::WorkspacesRead => "workspaces:read",
            Scope::WorkspacesWrite => "workspaces:write",
            Scope::ProjectsRead => "projects:read",
            Scope::ProjectsWrite => "projects:write",
            Scope::FilesRead => "files:read",
            Scope::FilesWrite => "files:write",
            Scope::ModelsRead => "models:read",
            Scope::ModelsWrite => "models:write",
            Scope::ProcessingRead => "processing:read",
            Scope::ProcessingWrite => "processing:write",
            Scope::OAuthAppsRead => "oauth_apps:read",
            Scope::OAuthAppsWrite => "oauth_apps:write",
            Scope::OAuthAppsAdmin => "oauth_apps:admin",
            Scope::PatsRead => "pats:read",
            Scope::PatsWrite => "pats:write",
            Scope::PatsAdmin => "pats:admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "workspaces:read" => Scope::WorkspacesRead,
            "workspaces:write" => Scope::WorkspacesWrite,
            "projects:read" => Scope::ProjectsRead,
            "projects:write" => Scope::ProjectsWrite,
            "files:read" => Scope::FilesRead,
            "files:write" => Scope::FilesWrite,
            "models:read" => Scope::ModelsRead,
            "models:write" => Scope::ModelsWrite,
            "processing:read" => Scope::ProcessingRead,
            "processing:write" => Scope::ProcessingWrite,
            "oauth_apps:read" => Scope::OAuthAppsRead,
            "oauth_apps:write" => Scope::OAuthAppsWrite,
            "oauth_apps:admin" => Scope::OAuthAppsAdmin,
            "pats:read" => Scope::PatsRead,
            "pats:write" => Scope::PatsWrite,
            "pats:admin" => Scope::PatsAdmin,
            _ => return None,
        })
    }
}
