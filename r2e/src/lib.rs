//! R2E — a Quarkus-like ergonomic layer over Axum.
//!
//! This facade crate re-exports all R2E sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use r2e::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature       | Default | Crate                     |
//! |---------------|---------|---------------------------|
//! | `security`    | **yes** | `r2e-security`            |
//! | `events`      | **yes** | `r2e-events`              |
//! | `utils`       | **yes** | `r2e-utils`               |
//! | `data`        | no      | `r2e-data` (abstractions) |
//! | `data-sqlx`   | no      | `r2e-data-sqlx`           |
//! | `sqlite`      | no      | `r2e-data-sqlx/sqlite`    |
//! | `postgres`    | no      | `r2e-data-sqlx/postgres`  |
//! | `mysql`       | no      | `r2e-data-sqlx/mysql`     |
//! | `cache`       | no      | `r2e-cache`               |
//! | `rate-limit`  | no      | `r2e-rate-limit`          |
//! | `oidc`        | no      | `r2e-oidc`                |
//! | `observability` | no   | `r2e-observability`       |
//! | `validation`  | no      | `r2e-core/validation`     |
//! | `full`        | no      | All of the above          |

// Re-export sub-crates as public modules so they're accessible as
// `r2e::r2e_core`, `r2e::r2e_events`, etc.
pub extern crate r2e_core;

#[cfg(feature = "rate-limit")]
pub extern crate r2e_rate_limit;

// Re-export everything from r2e-core at the top level for convenience.
pub use r2e_core::*;

#[cfg(feature = "security")]
pub use r2e_security;

#[cfg(feature = "events")]
pub use r2e_events;

#[cfg(feature = "utils")]
pub use r2e_utils;

#[cfg(feature = "data")]
pub use r2e_data;

#[cfg(feature = "data-sqlx")]
pub use r2e_data_sqlx;

#[cfg(feature = "cache")]
pub use r2e_cache;

#[cfg(feature = "oidc")]
pub use r2e_oidc;

#[cfg(feature = "observability")]
pub use r2e_observability;

/// Convenience type aliases that depend on types from optional sub-crates.
pub mod types {
    pub use r2e_core::types::*;

    /// Paginated JSON result — `Result<Json<Page<T>>, AppError>`.
    ///
    /// Available when the `data` feature is enabled.
    ///
    /// ```ignore
    /// #[get("/users")]
    /// async fn list(&self, pageable: Pageable) -> PagedResult<User> {
    ///     Ok(Json(self.service.list(pageable).await?))
    /// }
    /// ```
    #[cfg(feature = "data")]
    pub type PagedResult<T> =
        Result<r2e_core::http::Json<r2e_data::Page<T>>, r2e_core::AppError>;
}

/// Unified prelude — import everything with `use r2e::prelude::*`.
///
/// Includes the core prelude plus types from all enabled feature crates.
pub mod prelude {
    pub use r2e_core::prelude::*;
    pub use crate::types::*;

    #[cfg(feature = "security")]
    pub use r2e_security::prelude::*;

    #[cfg(feature = "data")]
    pub use r2e_data::prelude::*;

    #[cfg(feature = "data-sqlx")]
    pub use r2e_data_sqlx::prelude::*;

    #[cfg(feature = "events")]
    pub use r2e_events::prelude::*;

    #[cfg(feature = "utils")]
    pub use r2e_utils::prelude::*;
}
