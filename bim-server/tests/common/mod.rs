//! Shared harness for the integration suite: an in-memory `Store`, a
//! tempdir-backed `LocalContentStore`, and the full Axum router, built the
//! same way `main.rs` builds it minus the network listener. Mirrors
//! `r2e_oidc`'s `tests/integration.rs` in spirit (`oneshot` + `body_json`),
//! adapted to this crate's hand-assembled `AppState`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use bim_server::auth::TokenService;
use bim_server::config::AppConfig;
use bim_server::content_store::local::LocalContentStore;
use bim_server::content_store::DynContentStore;
use bim_server::http::{build_router, AppState};
use bim_server::queue;
use bim_server::store::model::Scope;
use bim_server::store::Store;
use bim_server::uploads::UploadCoordinator;
use r2e_observability::middleware::OtelTraceLayer;
use tempfile::TempDir;
use uuid::Uuid;

/// Everything a test needs alive for the duration of one test function.
/// `_blob_dir` must stay bound for the filesystem backing to survive.
pub struct TestApp {
    pub state: AppState,
    pub router: axum::Router,
    _blob_dir: TempDir,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        content_store_backend: "local".to_string(),
        content_store_base_path: String::new(),
        content_store_bucket: String::new(),
        jwt_issuer: "https://bim.test".to_string(),
        jwt_audience: "bim-api".to_string(),
        access_token_ttl_secs: 3600,
        auth_code_ttl_secs: 600,
        refresh_token_ttl_secs: 30 * 24 * 3600,
        pat_default_ttl_secs: 365 * 24 * 3600,
        pat_max_ttl_secs: 5 * 365 * 24 * 3600,
        worker_count: 1,
        queue_capacity: 64,
        upload_session_ttl_secs: 1800,
        sweep_interval_secs: 60,
        bind_address: "127.0.0.1:0".to_string(),
    }
}

pub async fn build_test_app() -> TestApp {
    let blob_dir = TempDir::new().expect("tempdir");
    let mut config = test_config();
    config.content_store_base_path = blob_dir.path().to_string_lossy().into_owned();
    let config = Arc::new(config);

    let store = Store::connect(&config.database_url).await.expect("connect sqlite::memory:");
    let tokens = TokenService::new(&config);
    let content_store: DynContentStore = Arc::new(LocalContentStore::new(config.content_store_base_path.clone()));
    let (queue_handle, _receiver) = queue::channel(config.queue_capacity as usize);
    let uploads = UploadCoordinator::new(store.clone(), content_store, queue_handle.clone(), chrono::Duration::seconds(config.upload_session_ttl_secs));

    let state = AppState { store, tokens, uploads, queue: queue_handle, config: config.clone() };
    let router = build_router(state.clone(), OtelTraceLayer::new(Vec::new()));

    TestApp { state, router, _blob_dir: blob_dir }
}

/// Mints a bearer access token the way `auth::oauth`/`auth::tokens` would
/// for a resource owner, without going through the full OAuth dance —
/// equivalent to a first-party client issuing itself a session.
pub fn bearer_for(tokens: &TokenService, user_id: Uuid, workspace_id: Option<Uuid>, scopes: &[Scope]) -> String {
    let scopes: Vec<String> = scopes.iter().map(|s| s.as_str().to_string()).collect();
    tokens.issue_access_token(user_id, workspace_id, None, &scopes).expect("issue access token")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn status_of(resp: &Response<Body>) -> StatusCode {
    resp.status()
}
