//! Entity Store: transactional persistence over every relation in the
//! data model, realized on `sqlx::SqlitePool`.
//!
//! Single-row reads/writes go through `Store`'s inherent methods directly
//! against the pool; multi-entity operations that must be atomic (upload
//! commit, refresh-token rotation, model-version status transitions) open
//! an `r2e_data_sqlx::Tx` and run every statement against it, matching the
//! teacher's "acquire/release" discipline in `r2e-data-sqlx::tx`.

pub mod files;
pub mod ifc;
pub mod model;
pub mod oauth;
pub mod processing;
pub mod tenancy;
pub mod uploads;

use r2e_data_sqlx::tx::HasPool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Handle to the relational store. Cheaply `Clone`, like every
/// `SqlxRepository` built on `Pool<DB>`.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(16).connect_with(opts).await?;
        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(MIGRATIONS).execute(&self.pool).await?;
        Ok(())
    }
}

impl HasPool<sqlx::Sqlite> for Store {
    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Liveness/readiness check, registered with `r2e_core::health::HealthBuilder`
/// in `main.rs` — mirrors the `DbHealth` example in `r2e_core::health`'s
/// own doc comment.
impl r2e_core::health::HealthIndicator for Store {
    fn name(&self) -> &str {
        "db"
    }

    async fn check(&self) -> r2e_core::health::HealthStatus {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => r2e_core::health::HealthStatus::Up,
            Err(e) => r2e_core::health::HealthStatus::Down(e.to_string()),
        }
    }
}

/// Schema for every relation in the data model. Executed once at startup via
/// `sqlx::raw_sql`, which (unlike the prepared-statement `query!` macros)
/// accepts a batch of semicolon-separated statements in one call.
const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    subject TEXT NOT NULL UNIQUE,
    email TEXT,
    display_name TEXT,
    created_at TEXT NOT NULL,
    last_login_at TEXT
);

CREATE TABLE IF NOT EXISTS workspaces (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_projects_workspace ON projects(workspace_id);

CREATE TABLE IF NOT EXISTS workspace_memberships (
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    PRIMARY KEY (workspace_id, user_id)
);

CREATE TABLE IF NOT EXISTS project_memberships (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    content_type TEXT,
    size_bytes INTEGER NOT NULL,
    checksum TEXT,
    kind TEXT NOT NULL,
    category TEXT NOT NULL,
    storage_provider TEXT NOT NULL,
    storage_key TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_files_project ON files(project_id);

CREATE TABLE IF NOT EXISTS file_links (
    id TEXT PRIMARY KEY,
    source_file_id TEXT NOT NULL REFERENCES files(id),
    target_file_id TEXT NOT NULL REFERENCES files(id),
    link_type TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS upload_sessions (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    content_type TEXT,
    expected_size_bytes INTEGER,
    status TEXT NOT NULL,
    upload_mode TEXT NOT NULL,
    temp_storage_key TEXT,
    direct_upload_url TEXT,
    committed_file_id TEXT,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_uploads_project ON upload_sessions(project_id);

CREATE TABLE IF NOT EXISTS models (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS model_versions (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL REFERENCES models(id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    ifc_file_id TEXT NOT NULL,
    wex_bim_file_id TEXT,
    properties_file_id TEXT,
    status TEXT NOT NULL,
    error_message TEXT,
    created_at TEXT NOT NULL,
    processed_at TEXT,
    UNIQUE(model_id, version_number)
);

CREATE TABLE IF NOT EXISTS processing_jobs (
    id TEXT PRIMARY KEY,
    model_version_id TEXT NOT NULL REFERENCES model_versions(id) ON DELETE CASCADE,
    job_type TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS ifc_elements (
    id TEXT PRIMARY KEY,
    model_version_id TEXT NOT NULL REFERENCES model_versions(id) ON DELETE CASCADE,
    entity_label INTEGER NOT NULL,
    global_id TEXT,
    name TEXT,
    type_name TEXT,
    description TEXT,
    object_type TEXT,
    type_object_name TEXT,
    type_object_type TEXT,
    UNIQUE(model_version_id, entity_label)
);
CREATE INDEX IF NOT EXISTS idx_ifc_elements_version ON ifc_elements(model_version_id);
CREATE INDEX IF NOT EXISTS idx_ifc_elements_global_id ON ifc_elements(global_id);

CREATE TABLE IF NOT EXISTS ifc_property_sets (
    id TEXT PRIMARY KEY,
    element_id TEXT NOT NULL REFERENCES ifc_elements(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    global_id TEXT,
    is_type_property_set INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS ifc_properties (
    id TEXT PRIMARY KEY,
    property_set_id TEXT NOT NULL REFERENCES ifc_property_sets(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    value TEXT,
    value_type TEXT NOT NULL,
    unit TEXT
);

CREATE TABLE IF NOT EXISTS ifc_quantity_sets (
    id TEXT PRIMARY KEY,
    element_id TEXT NOT NULL REFERENCES ifc_elements(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    global_id TEXT
);

CREATE TABLE IF NOT EXISTS ifc_quantities (
    id TEXT PRIMARY KEY,
    quantity_set_id TEXT NOT NULL REFERENCES ifc_quantity_sets(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    value REAL,
    value_type TEXT NOT NULL,
    unit TEXT
);

CREATE TABLE IF NOT EXISTS oauth_apps (
    id TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    client_type TEXT NOT NULL,
    client_id TEXT NOT NULL UNIQUE,
    client_secret_hash TEXT,
    redirect_uris TEXT NOT NULL,
    allowed_scopes TEXT NOT NULL,
    is_enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT,
    created_by_user_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS authorization_codes (
    id TEXT PRIMARY KEY,
    code_hash TEXT NOT NULL UNIQUE,
    o_auth_app_id TEXT NOT NULL REFERENCES oauth_apps(id),
    user_id TEXT NOT NULL,
    workspace_id TEXT NOT NULL,
    scopes TEXT NOT NULL,
    redirect_uri TEXT NOT NULL,
    code_challenge TEXT,
    code_challenge_method TEXT,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    is_used INTEGER NOT NULL DEFAULT 0,
    used_at TEXT
);

CREATE TABLE IF NOT EXISTS refresh_tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL UNIQUE,
    o_auth_app_id TEXT,
    user_id TEXT NOT NULL,
    workspace_id TEXT NOT NULL,
    scopes TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    is_revoked INTEGER NOT NULL DEFAULT 0,
    revoked_at TEXT,
    revoked_reason TEXT,
    parent_token_id TEXT,
    replaced_by_token_id TEXT,
    token_family_id TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT
);
CREATE INDEX IF NOT EXISTS idx_refresh_family ON refresh_tokens(token_family_id);

CREATE TABLE IF NOT EXISTS personal_access_tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL UNIQUE,
    token_prefix TEXT NOT NULL,
    user_id TEXT NOT NULL,
    workspace_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    scopes TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    last_used_at TEXT,
    last_used_ip_address TEXT,
    is_revoked INTEGER NOT NULL DEFAULT 0,
    revoked_at TEXT,
    revoked_reason TEXT,
    created_from_ip_address TEXT
);

CREATE TABLE IF NOT EXISTS oauth_app_audit_log (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor_user_id TEXT,
    timestamp TEXT NOT NULL,
    details TEXT,
    ip_address TEXT,
    user_agent TEXT
);

CREATE TABLE IF NOT EXISTS pat_audit_log (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor_user_id TEXT,
    timestamp TEXT NOT NULL,
    details TEXT,
    ip_address TEXT,
    user_agent TEXT
);
"#;
