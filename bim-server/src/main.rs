//! Binary entry point: wires every component into a running server.
//! Kept deliberately free of business logic — everything here is
//! construction and lifecycle, collapsed into one function since this
//! crate has no hot-reload story to separate around.

use std::sync::Arc;
use std::time::Duration;

use r2e_core::config::R2eConfig;
use r2e_core::health::HealthBuilder;
use r2e_observability::{Observability, ObservabilityConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use r2e_core::config::ConfigProperties;

use bim_server::auth::TokenService;
use bim_server::config::AppConfig;
use bim_server::content_store::cloud::CloudContentStore;
use bim_server::content_store::local::LocalContentStore;
use bim_server::content_store::DynContentStore;
use bim_server::conversion::progress::ProgressNotifier;
use bim_server::conversion::IfcConversionOrchestrator;
use bim_server::http::{build_router, AppState};
use bim_server::queue;
use bim_server::queue::idempotency::IdempotencyTracker;
use bim_server::queue::worker::{run_worker, HandlerRegistry};
use bim_server::store::Store;
use bim_server::uploads::UploadCoordinator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let r2e_config = R2eConfig::load("dev").unwrap_or_else(|_| R2eConfig::empty());
    let config = Arc::new(AppConfig::from_config(&r2e_config)?);

    let observability = Observability::new(
        ObservabilityConfig::new("bim-server")
            .with_service_version(env!("CARGO_PKG_VERSION"))
            .capture_header("x-correlation-id"),
    );
    let (_otel_guard, _trace_layer_unused, otel_layer) = observability.init();

    let store = Store::connect(&config.database_url).await?;
    let tokens = TokenService::new(&config);

    let content_store: DynContentStore = match config.content_store_backend.as_str() {
        "s3" => Arc::new(CloudContentStore::new(config.content_store_bucket.clone()).await),
        _ => Arc::new(LocalContentStore::new(config.content_store_base_path.clone())),
    };

    let (queue_handle, queue_receiver) = queue::channel(config.queue_capacity as usize);
    let uploads = UploadCoordinator::new(store.clone(), content_store.clone(), queue_handle.clone(), chrono::Duration::seconds(config.upload_session_ttl_secs));

    let mut registry = HandlerRegistry::new();
    let orchestrator = IfcConversionOrchestrator::new(store.clone(), uploads.clone(), ProgressNotifier::new());
    registry.register("IfcToWexBim", Arc::new(orchestrator));
    let registry = Arc::new(registry);

    let shutdown = CancellationToken::new();
    let idempotency = IdempotencyTracker::new();
    let worker_handle = tokio::spawn(run_worker(queue_receiver, registry, idempotency, config.worker_count.max(1) as usize, shutdown.clone()));

    let sweep_uploads = uploads.clone();
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs.max(1) as u64);
    let sweep_shutdown = shutdown.clone();
    let sweep_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = sweep_uploads.sweep_expired_sessions().await {
                        tracing::warn!(error = %err, "upload session sweep failed");
                    }
                }
                _ = sweep_shutdown.cancelled() => break,
            }
        }
    });

    let health_router = HealthBuilder::new().check(store.clone()).cache_ttl(Duration::from_secs(5)).build();

    let state = AppState { store, tokens, uploads, queue: queue_handle, config: config.clone() };
    let app = build_router(state, otel_layer).merge(health_router);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!(bind_address = %config.bind_address, "bim-server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown.clone())).await?;

    shutdown.cancel();
    let _ = worker_handle.await;
    let _ = sweep_handle.await;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining in-flight work");
    shutdown.cancel();
}
