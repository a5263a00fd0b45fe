//! Typed application configuration, read once at startup from
//! `r2e_core::config::R2eConfig` (YAML + `.env` + environment overlay).
//!
//! Hand-written `ConfigProperties` impl: the `#[derive(ConfigProperties)]`
//! macro this would normally come from isn't available (see DESIGN.md), so
//! `AppConfig::from_config` reads each key directly with `get_or`.

use r2e_core::config::{ConfigError, ConfigProperties, PropertyMeta, R2eConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. `sqlite://bim.db` or `sqlite::memory:`.
    pub database_url: String,
    /// Content store backend: `"local"` or `"s3"`.
    pub content_store_backend: String,
    /// Base directory for the local content store.
    pub content_store_base_path: String,
    /// Bucket name for the S3 content store.
    pub content_store_bucket: String,
    /// JWT issuer claim (`iss`).
    pub jwt_issuer: String,
    /// JWT audience claim (`aud`).
    pub jwt_audience: String,
    /// Access token TTL, seconds.
    pub access_token_ttl_secs: i64,
    /// Authorization code TTL, seconds.
    pub auth_code_ttl_secs: i64,
    /// Refresh token TTL, seconds.
    pub refresh_token_ttl_secs: i64,
    /// Default PAT TTL, seconds (1 year).
    pub pat_default_ttl_secs: i64,
    /// Maximum PAT TTL a caller may request, seconds (5 year cap).
    pub pat_max_ttl_secs: i64,
    /// Number of conversion worker tasks.
    pub worker_count: i64,
    /// Bound on the in-flight conversion job queue; 0 means unbounded.
    pub queue_capacity: i64,
    /// Upload session expiry, seconds (30 min default).
    pub upload_session_ttl_secs: i64,
    /// Interval between upload-session / orphan-artifact sweeps, seconds.
    pub sweep_interval_secs: i64,
    /// HTTP bind address.
    pub bind_address: String,
}

impl ConfigProperties for AppConfig {
    fn prefix() -> &'static str {
        "app"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        // Hand-enumerated since the derive macro that would generate this
        // from doc comments and `#[config(...)]` attributes isn't available.
        vec![]
    }

    fn from_config(config: &R2eConfig) -> Result<Self, ConfigError> {
        Ok(AppConfig {
            database_url: config.get_or("app.database.url", "sqlite::memory:".to_string()),
            content_store_backend: config.get_or("app.content-store.backend", "local".to_string()),
            content_store_base_path: config
                .get_or("app.content-store.base-path", "./data/blobs".to_string()),
            content_store_bucket: config.get_or("app.content-store.bucket", String::new()),
            jwt_issuer: config.get_or("app.jwt.issuer", "https://bim.local".to_string()),
            jwt_audience: config.get_or("app.jwt.audience", "bim-api".to_string()),
            access_token_ttl_secs: config.get_or("app.jwt.access-token-ttl-secs", 3600),
            auth_code_ttl_secs: config.get_or("app.oauth.code-ttl-secs", 600),
            refresh_token_ttl_secs: config.get_or("app.oauth.refresh-token-ttl-secs", 30 * 24 * 3600),
            pat_default_ttl_secs: config.get_or("app.pat.default-ttl-secs", 365 * 24 * 3600),
            pat_max_ttl_secs: config.get_or("app.pat.max-ttl-secs", 5 * 365 * 24 * 3600),
            worker_count: config.get_or("app.queue.worker-count", 1),
            queue_capacity: config.get_or("app.queue.capacity", 256),
            upload_session_ttl_secs: config.get_or("app.uploads.session-ttl-secs", 30 * 60),
            sweep_interval_secs: config.get_or("app.uploads.sweep-interval-secs", 60),
            bind_address: config.get_or("app.http.bind-address", "0.0.0.0:3000".to_string()),
        })
    }
}
