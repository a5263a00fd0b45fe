//! Middleware re-exports from Axum/Tower.

pub use axum::middleware::{from_fn, from_fn_with_state, Next};
pub use tower_http::catch_panic::CatchPanicLayer;
pub use tower_http::cors::CorsLayer;
pub use tower_http::set_header::SetResponseHeaderLayer;
pub use tower_http::trace::TraceLayer;
