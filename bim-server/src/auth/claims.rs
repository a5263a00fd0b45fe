//! Access-token claim set: `{sub, aud, iss, iat, exp, scope, tid, cid?,
//! jti}`. A first-class struct rather than `r2e_oidc`'s generic
//! `extra_claims` bag, since every claim here has fixed meaning.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: Uuid,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Space-joined scope strings.
    pub scope: String,
    /// Bound workspace UID. Present on every OAuth/PAT-issued token; a
    /// missing `tid` is only tolerated when dev-mode auth is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<Uuid>,
    /// OAuth client id, present only on OAuth-issued tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    pub jti: Uuid,
}

impl AccessTokenClaims {
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }

    pub fn has_scope(&self, scope: crate::store::model::Scope) -> bool {
        self.scopes().contains(&scope.as_str())
    }
}
