//! Correlation-id middleware: every response carries
//! `X-Correlation-ID` and `X-Request-ID`. Grounded on
//! `r2e_observability::middleware::OtelTraceLayer`'s header-extraction
//! shape, but expressed as a plain `axum::middleware::from_fn` rather than
//! a hand-rolled `tower::Layer` — this concern only needs to run once per
//! request and doesn't need `Layer`'s service-wrapping machinery. The
//! OTel trace id itself (when tracing is enabled) still ends up attached
//! to the request's span via `r2e_observability::middleware::OtelTraceLayer`,
//! layered separately in `http::build_router`.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info_span;
use tracing::Instrument;
use uuid::Uuid;

static CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");
static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Picks an id for this request: an incoming `X-Correlation-ID`, falling
/// back to `X-Request-ID`, falling back to a fresh UUID.
fn resolve_correlation_id(req: &Request) -> String {
    if let Some(v) = req.headers().get(&CORRELATION_HEADER).and_then(|v| v.to_str().ok()) {
        return v.to_string();
    }
    if let Some(v) = req.headers().get(&REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        return v.to_string();
    }
    Uuid::new_v4().to_string()
}

pub async fn correlation_middleware(req: Request, next: Next) -> Response {
    let correlation_id = resolve_correlation_id(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        correlation_id = %correlation_id,
        request_id = %correlation_id,
        request_method = %method,
        request_path = %path,
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER.clone(), value.clone());
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}
