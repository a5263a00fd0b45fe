//! HTTP Surface + Correlation: the Axum router that fronts every
//! other component. Assembled by hand rather than through a controller
//! macro DSL, following `r2e_oidc`'s `OidcServer::into_mount` shape —
//! build an `Arc`-free `AppState`, wire `FromRef` for the extractors that
//! need a slice of it, and merge per-resource routers.

pub mod correlation;
pub mod dto;
pub mod files;
pub mod models;
pub mod oauth;
pub mod pats;
pub mod projects;
pub mod uploads;
pub mod workspaces;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::Router;
use r2e_observability::middleware::OtelTraceLayer;
use tower_http::trace::TraceLayer;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::queue::JobQueueHandle;
use crate::store::Store;
use crate::uploads::UploadCoordinator;

/// Everything a handler might need, cheaply `Clone` (every field is
/// either already `Clone` or `Arc`-wrapped).
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenService,
    pub uploads: UploadCoordinator,
    pub queue: JobQueueHandle,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for Store {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Builds the full router: correlation-id middleware wraps every route,
/// `TraceLayer` logs each request/response pair, and `otel_layer` (from
/// `r2e_observability::Observability::init`) attaches the OTel span each
/// of those log lines is nested under.
pub fn build_router(state: AppState, otel_layer: OtelTraceLayer) -> Router {
    Router::new()
        .merge(workspaces::router())
        .merge(projects::router())
        .merge(uploads::router())
        .merge(files::router())
        .merge(models::router())
        .merge(oauth::router())
        .merge(pats::router())
        .with_state(state)
        .layer(axum::middleware::from_fn(correlation::correlation_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(otel_layer)
}
