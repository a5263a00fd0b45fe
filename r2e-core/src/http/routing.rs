//! Routing re-exports from Axum.

pub use axum::routing::{any, delete, get, patch, post, put, MethodRouter};
pub use axum::Router;
