//! Extractor re-exports from Axum.
//!
//! Centralized here so the rest of the workspace never depends on `axum`
//! directly — `r2e-core` is the sole owner of the Axum version in use.

pub use axum::extract::rejection::{
    FormRejection, JsonRejection, PathRejection, QueryRejection,
};
pub use axum::extract::{
    ConnectInfo, DefaultBodyLimit, Form, FromRef, FromRequest, FromRequestParts, MatchedPath,
    OptionalFromRequestParts, OriginalUri, Path, Query, RawPathParams, Request, State,
};
