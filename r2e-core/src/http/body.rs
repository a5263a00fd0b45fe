//! Body type re-exports from Axum.

pub use axum::body::{to_bytes, Body, Bytes};
