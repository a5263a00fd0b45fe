//! Embedded OIDC server for R2E.
//!
//! Provides JWT token issuance without an external identity provider.
//! `into_mount()` hands back the OAuth router and the `JwtClaimsValidator`
//! used to authenticate bearer tokens it issues.
//!
//! # Example
//!
//! ```ignore
//! use r2e_oidc::{OidcServer, InMemoryUserStore, OidcUser};
//!
//! let users = InMemoryUserStore::new()
//!     .add_user("alice", "password123", OidcUser {
//!         sub: "user-1".into(),
//!         email: Some("alice@example.com".into()),
//!         roles: vec!["admin".into()],
//!         ..Default::default()
//!     });
//!
//! let mount = OidcServer::new().with_user_store(users).into_mount();
//! let app = Router::new().merge(mount.router);
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod store;
pub mod token;

mod handlers;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use r2e_security::{JwtClaimsValidator, SecurityConfig};

pub use client::ClientRegistry;
pub use config::OidcServerConfig;
pub use store::{InMemoryUserStore, OidcUser, UserStore};

/// Embedded OIDC server plugin.
///
/// Generates RSA keys, provides `Arc<JwtClaimsValidator>` to the bean graph,
/// and exposes OAuth 2.0 / OIDC endpoints.
pub struct OidcServer {
    config: OidcServerConfig,
    user_store: Option<Box<dyn store::UserStoreErased>>,
    client_registry: ClientRegistry,
}

impl OidcServer {
    /// Create a new OIDC server with default configuration.
    ///
    /// Defaults: issuer = `http://localhost:3000`, audience = `r2e-app`, TTL = 3600s.
    pub fn new() -> Self {
        Self {
            config: OidcServerConfig::default(),
            user_store: None,
            client_registry: ClientRegistry::new(),
        }
    }

    /// Set the JWT issuer claim.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.issuer = issuer.into();
        self
    }

    /// Set the JWT audience claim.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.config.audience = audience.into();
        self
    }

    /// Set the token time-to-live in seconds.
    pub fn token_ttl(mut self, secs: u64) -> Self {
        self.config.token_ttl_secs = secs;
        self
    }

    /// Set the base path for OIDC endpoints.
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.config.base_path = path.into();
        self
    }

    /// Set the user store (required).
    pub fn with_user_store(mut self, store: impl UserStore) -> Self {
        self.user_store = Some(Box::new(store));
        self
    }

    /// Set the client registry for `client_credentials` grant support.
    pub fn with_client_registry(mut self, registry: ClientRegistry) -> Self {
        self.client_registry = registry;
        self
    }
}

impl Default for OidcServer {
    fn default() -> Self {
        Self::new()
    }
}

/// What installing an [`OidcServer`] yields: the router exposing its OAuth
/// endpoints, plus the validator other services use to authenticate
/// bearer tokens issued by it.
pub struct OidcMount {
    pub router: Router,
    pub claims_validator: Arc<JwtClaimsValidator>,
}

impl OidcServer {
    /// Generate keys, assemble the internal OIDC state and build the router.
    ///
    /// Mount the returned router directly on the application's own, since
    /// this crate no longer goes through the generic plugin-builder chain.
    pub fn into_mount(self) -> OidcMount {
        let key_pair = Arc::new(keys::OidcKeyPair::generate(&self.config.kid));

        let security_config = SecurityConfig::new(
            "local", // No remote JWKS URL needed.
            &self.config.issuer,
            &self.config.audience,
        );
        let decoding_key = key_pair.decoding_key();
        let claims_validator = Arc::new(JwtClaimsValidator::new_with_static_key(
            decoding_key,
            security_config,
        ));

        let oidc_state = Arc::new(state::OidcState {
            key_pair: key_pair.clone(),
            token_service: token::TokenService::new(key_pair, self.config.clone()),
            user_store: self
                .user_store
                .expect("OidcServer: user store is required — call .with_user_store()"),
            client_registry: self.client_registry,
            config: self.config.clone(),
            claims_validator: claims_validator.clone(),
        });

        let router = oidc_routes(oidc_state, &self.config.base_path);
        OidcMount {
            router,
            claims_validator,
        }
    }
}

/// Build the OIDC Axum router.
fn oidc_routes(state: Arc<state::OidcState>, base_path: &str) -> Router {
    let router = Router::new()
        .route("/oauth/token", post(handlers::token_handler))
        .route(
            "/.well-known/openid-configuration",
            get(handlers::discovery_handler),
        )
        .route("/.well-known/jwks.json", get(handlers::jwks_handler))
        .route("/userinfo", get(handlers::userinfo_handler))
        .with_state(state);

    if base_path.is_empty() {
        router
    } else {
        Router::new().nest(base_path, router)
    }
}

pub mod prelude {
    //! Re-exports of the most commonly used OIDC types.
    pub use crate::{InMemoryUserStore, OidcServer, OidcUser, UserStore};
}
