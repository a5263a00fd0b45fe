//! OpenTelemetry observability for R2E services.
//!
//! Provides distributed tracing via OpenTelemetry, context propagation,
//! and a Tower middleware layer for automatic span creation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use r2e_observability::{Observability, ObservabilityConfig};
//!
//! let observability = Observability::new(
//!     ObservabilityConfig::new("my-service")
//!         .with_service_version("1.0.0")
//!         .with_endpoint("http://otel-collector:4317")
//!         .capture_header("x-tenant-id"),
//! );
//! let (_guard, trace_layer, otel_layer) = observability.init();
//! let app = Router::new().layer(trace_layer).layer(otel_layer);
//! ```

pub mod config;
pub mod middleware;
pub mod propagation;
pub mod tracing_setup;

pub use config::{LogFormat, ObservabilityConfig, OtlpProtocol, PropagationFormat};
pub use tracing_setup::OtelGuard;

use tower_http::trace::TraceLayer;

/// Full-stack observability setup — OpenTelemetry tracing, context
/// propagation, and HTTP request logging.
///
/// # What it does
///
/// 1. Initialises a `tracing-subscriber` stack (fmt layer + OTel layer).
/// 2. Installs a W3C `traceparent` propagator for cross-service context.
/// 3. Builds a tower-http `TraceLayer` plus an `OtelTraceLayer` that creates
///    OTel spans for each HTTP request.
/// 4. Returns an `OtelGuard` that must be held for the app's lifetime and
///    dropped on shutdown to flush pending traces.
///
/// # Example
///
/// ```rust,ignore
/// use r2e_observability::{Observability, ObservabilityConfig};
///
/// let observability = Observability::new(
///     ObservabilityConfig::new("my-service")
///         .with_service_version("1.0.0")
///         .with_endpoint("http://otel-collector:4317"),
/// );
/// let (guard, layer, otel_layer) = observability.init();
/// let app = Router::new().layer(layer).layer(otel_layer);
/// ```
pub struct Observability {
    config: ObservabilityConfig,
}

impl Observability {
    /// Create a new observability setup with the given configuration.
    pub fn new(config: ObservabilityConfig) -> Self {
        Self { config }
    }

    /// Create from R2eConfig (reads `observability.*` keys).
    pub fn from_config(r2e_config: &r2e_core::R2eConfig, service_name: &str) -> Self {
        Self {
            config: ObservabilityConfig::from_r2e_config(r2e_config, service_name),
        }
    }

    /// Install the global propagator, initialise tracing/OTel, and build the
    /// tower layers this application should attach to its router.
    ///
    /// Returns `None` for the guard when `tracing_enabled` is false — keep
    /// the guard alive for the app's lifetime; dropping it flushes traces.
    pub fn init(&self) -> (Option<OtelGuard>, TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>, middleware::OtelTraceLayer) {
        propagation::install_propagator(&self.config);

        let guard = if self.config.tracing_enabled {
            Some(tracing_setup::init_tracing(&self.config))
        } else {
            None
        };

        let trace_layer = TraceLayer::new_for_http();
        let otel_layer = middleware::OtelTraceLayer::new(self.config.capture_headers.clone());

        (guard, trace_layer, otel_layer)
    }
}
