//! The identity an Axum handler actually works with, derived from a
//! verified access token. Grounded on `r2e_security`'s `ClaimsIdentity`
//! extractor shape, minus its generic role bag.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use super::claims::AccessTokenClaims;
use super::tokens::{hash_token, looks_like_pat, TokenService};
use crate::error::AppError;
use crate::store::model::Scope;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub user_id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub client_id: Option<String>,
    pub token_id: Uuid,
    scopes: Vec<Scope>,
}

impl AuthenticatedIdentity {
    pub fn from_claims(claims: AccessTokenClaims) -> Self {
        let scopes = claims.scopes().into_iter().filter_map(Scope::parse).collect();
        Self {
            user_id: claims.sub,
            workspace_id: claims.tid,
            client_id: claims.cid,
            token_id: claims.jti,
            scopes,
        }
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.iter().any(|s| *s == scope)
    }

    pub fn has_any_scope(&self, scopes: &[Scope]) -> bool {
        scopes.iter().any(|s| self.has_scope(*s))
    }

    pub fn has_all_scopes(&self, scopes: &[Scope]) -> bool {
        scopes.iter().all(|s| self.has_scope(*s))
    }

    /// Workspace bound to this identity's token. Dev-mode-issued tokens
    /// without a `tid` never satisfy workspace-scoped checks.
    pub fn require_workspace(&self) -> Result<Uuid, AppError> {
        self.workspace_id.ok_or_else(|| AppError::Forbidden("this token is not bound to a workspace".into()))
    }

    /// Resolves a `bim_pat_`-prefixed bearer token against the PAT table —
    /// unlike a JWT access token, a PAT can be revoked, so every request
    /// checks the store rather than trusting a signature alone.
    async fn from_pat(store: &Store, token: &str) -> Result<Self, AppError> {
        let pat = store
            .find_pat_by_hash(&hash_token(token))
            .await?
            .ok_or_else(|| AppError::Unauthenticated("invalid personal access token".into()))?;
        if pat.is_revoked {
            return Err(AppError::Unauthenticated("personal access token has been revoked".into()));
        }
        if pat.expires_at < chrono::Utc::now() {
            return Err(AppError::Unauthenticated("personal access token has expired".into()));
        }
        let _ = store.touch_pat_usage(pat.id, None).await;
        let scopes = pat.scopes.split_whitespace().filter_map(Scope::parse).collect();
        Ok(Self {
            user_id: pat.user_id,
            workspace_id: Some(pat.workspace_id),
            client_id: None,
            token_id: pat.id,
            scopes,
        })
    }
}

/// Pulls the bearer token out of `Authorization: Bearer <token>`.
fn extract_bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header_value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("missing Authorization header".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Authorization header is not valid UTF-8".into()))?;

    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthenticated("malformed Authorization header".into()))?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AppError::Unauthenticated("unsupported authorization scheme".into()));
    }
    Ok(token)
}

impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    TokenService: FromRef<S>,
    Store: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        if looks_like_pat(token) {
            let store = Store::from_ref(state);
            return AuthenticatedIdentity::from_pat(&store, token).await;
        }
        let tokens = TokenService::from_ref(state);
        let claims = tokens.verify_access_token(token)?;
        Ok(AuthenticatedIdentity::from_claims(claims))
    }
}
