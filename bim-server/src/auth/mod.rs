//! Tenancy, identity, and authorization. Grounded on
//! `r2e-oidc`'s RS256 signing (`keys.rs`/`token.rs`) and hash-before-store
//! discipline (`store.rs`'s argon2 password hashing), reimplemented here
//! for this service's own claim set, token materials, and rotation rules.

pub mod authz;
pub mod claims;
pub mod identity;
pub mod keys;
pub mod oauth;
pub mod tokens;

pub use claims::AccessTokenClaims;
pub use identity::AuthenticatedIdentity;
pub use tokens::TokenService;
