//! The service-wide error type and its wire representation.
//!
//! Every component surfaces failures through [`AppError`]; only the HTTP
//! surface (`http`) converts it to a response body. OAuth endpoints use
//! [`OAuthError`] instead, which follows RFC 6749's error shape rather than
//! [`ErrorResponse`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Component-local error kinds, mapped 1:1 onto HTTP status codes at the
/// surface.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Conflict(String),
    AlreadyExists(String),
    Validation(String),
    Unauthenticated(String),
    Forbidden(String),
    CrossWorkspace,
    NotSupported(String),
    Transient(String),
    Internal(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Validation(_) => "validation",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::CrossWorkspace => "cross_workspace",
            AppError::NotSupported(_) => "not_supported",
            AppError::Transient(_) => "transient",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::CrossWorkspace => StatusCode::FORBIDDEN,
            AppError::NotSupported(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::NotFound(m)
            | AppError::Conflict(m)
            | AppError::AlreadyExists(m)
            | AppError::Validation(m)
            | AppError::Unauthenticated(m)
            | AppError::Forbidden(m)
            | AppError::NotSupported(m)
            | AppError::Transient(m)
            | AppError::Internal(m) => m.clone(),
            AppError::CrossWorkspace => "the requested resource is not in your workspace".into(),
        }
    }
}

/// Wire shape for every non-OAuth error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "traceId")]
    pub trace_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            code: self.code(),
            message: self.message(),
            errors: None,
            trace_id: None,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::AlreadyExists(db_err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<r2e_data::DataError> for AppError {
    fn from(err: r2e_data::DataError) -> Self {
        match err {
            r2e_data::DataError::NotFound(msg) => AppError::NotFound(msg),
            r2e_data::DataError::Database(e) => AppError::Internal(e.to_string()),
            r2e_data::DataError::Other(msg) => AppError::Internal(msg),
        }
    }
}

impl From<crate::content_store::StoreError> for AppError {
    fn from(err: crate::content_store::StoreError) -> Self {
        use crate::content_store::StoreError;
        match err {
            StoreError::AlreadyExists(m) => AppError::AlreadyExists(m),
            StoreError::InvalidKey(m) => AppError::Validation(m),
            StoreError::Transient(m) => AppError::Transient(m),
            StoreError::Backend(m) => AppError::Internal(m),
        }
    }
}

impl From<r2e_core::managed::ManagedError> for AppError {
    fn from(err: r2e_core::managed::ManagedError) -> Self {
        match err.0 {
            r2e_core::HttpError::NotFound(m) => AppError::NotFound(m),
            r2e_core::HttpError::Unauthorized(m) => AppError::Unauthenticated(m),
            r2e_core::HttpError::Forbidden(m) => AppError::Forbidden(m),
            r2e_core::HttpError::BadRequest(m) => AppError::Validation(m),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Generate `From<E> for AppError` implementations mapping a source error
/// type to a single `AppError` variant, mirroring `r2e_core::map_error!`.
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::error::AppError {
                fn from(err: $err_ty) -> Self {
                    $crate::error::AppError::$variant(err.to_string())
                }
            }
        )*
    };
}

/// RFC 6749 error shape used by `/oauth/authorize` and `/oauth/token`.
#[derive(Debug, Serialize)]
pub struct OAuthErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

/// OAuth-flow-local error type; grounded on `r2e_oidc::error::OidcError`'s
/// status/body mapping, extended with the grant-specific failure causes
/// this flow needs.
#[derive(Debug)]
pub enum OAuthError {
    InvalidRequest(String),
    InvalidClient(String),
    InvalidGrant(String),
    InvalidScope(String),
    UnauthorizedClient(String),
    UnsupportedGrantType(String),
    UnsupportedResponseType(String),
    ServerError(String),
}

impl OAuthError {
    fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::UnauthorizedClient(_) => "unauthorized_client",
            OAuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OAuthError::UnsupportedResponseType(_) => "unsupported_response_type",
            OAuthError::ServerError(_) => "server_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            OAuthError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn description(&self) -> &str {
        match self {
            OAuthError::InvalidRequest(s)
            | OAuthError::InvalidClient(s)
            | OAuthError::InvalidGrant(s)
            | OAuthError::InvalidScope(s)
            | OAuthError::UnauthorizedClient(s)
            | OAuthError::UnsupportedGrantType(s)
            | OAuthError::UnsupportedResponseType(s)
            | OAuthError::ServerError(s) => s,
        }
    }

    /// Encode as the `error=...&state=...` redirect-query form used for
    /// failures past the redirect-URI validation step.
    pub fn as_query_pairs(&self, state: Option<&str>) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("error", self.code().to_string())];
        pairs.push(("error_description", self.description().to_string()));
        if let Some(state) = state {
            pairs.push(("state", state.to_string()));
        }
        pairs
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let body = OAuthErrorBody {
            error: self.code(),
            error_description: Some(self.description().to_string()),
            error_uri: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl std::fmt::Display for OAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

impl std::error::Error for OAuthError {}
