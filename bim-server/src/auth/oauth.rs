//! Authorization-code + PKCE flow. The authorization step is split from
//! the HTTP handler so the validation order is testable on its own:
//! resolve client, then validate the redirect URI, then everything else —
//! an error discovered after the redirect URI is trusted comes back as a
//! redirect with `error=...`, never a bare 400, so a forged redirect_uri
//! can't be used to phish error pages.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::tokens::{constant_time_eq, hash_token, issue_refresh_token, TokenService};
use crate::error::{AppError, OAuthError};
use crate::store::model::{ClientType, CodeChallengeMethod, OAuthApp};
use crate::store::Store;

pub struct AuthorizeRequest<'a> {
    pub response_type: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub scope: &'a str,
    pub code_challenge: Option<&'a str>,
    pub code_challenge_method: Option<&'a str>,
}

/// An authorize request whose `redirect_uri` has been confirmed to match
/// the registered app exactly. Only after this point may an error be
/// reported via redirect instead of a bare error page.
pub struct RedirectTrusted {
    pub app: OAuthApp,
    pub redirect_uri: String,
}

/// First validation phase: resolve the client and confirm the redirect
/// URI. Failure here must not redirect — the URI itself is unverified.
pub async fn resolve_and_check_redirect(store: &Store, req: &AuthorizeRequest<'_>) -> Result<RedirectTrusted, AppError> {
    let app = store
        .find_oauth_app_by_client_id(req.client_id)
        .await?
        .ok_or_else(|| AppError::Validation("unknown client_id".into()))?;
    if !app.is_enabled {
        return Err(AppError::Validation("client is disabled".into()));
    }
    let registered = app.redirect_uri_list();
    if !registered.iter().any(|u| u == req.redirect_uri) {
        return Err(AppError::Validation("redirect_uri does not match any registered URI".into()));
    }
    Ok(RedirectTrusted { app, redirect_uri: req.redirect_uri.to_string() })
}

/// Second validation phase, once the redirect URI is trusted. Any error
/// here is reported via `OAuthError::as_query_pairs` appended to the
/// caller's redirect URI.
pub fn validate_authorize_params(trusted: &RedirectTrusted, req: &AuthorizeRequest<'_>) -> Result<(Vec<String>, Option<CodeChallengeMethod>), OAuthError> {
    if req.response_type != "code" {
        return Err(OAuthError::UnsupportedResponseType(format!("response_type '{}' is not supported", req.response_type)));
    }

    let requested: Vec<String> = req.scope.split_whitespace().map(str::to_string).collect();
    let allowed = trusted.app.allowed_scope_list();
    if let Some(bad) = requested.iter().find(|s| !allowed.contains(s)) {
        return Err(OAuthError::InvalidScope(format!("scope '{bad}' is not allowed for this client")));
    }

    let method = match req.code_challenge_method {
        Some("S256") => Some(CodeChallengeMethod::S256),
        Some("plain") => Some(CodeChallengeMethod::Plain),
        Some(other) => return Err(OAuthError::InvalidRequest(format!("unsupported code_challenge_method '{other}'"))),
        None => None,
    };

    if trusted.app.client_type == ClientType::Public && req.code_challenge.is_none() {
        return Err(OAuthError::InvalidRequest("PKCE code_challenge is required for public clients".into()));
    }

    Ok((requested, method))
}

#[allow(clippy::too_many_arguments)]
pub async fn issue_authorization_code(
    store: &Store,
    app_id: Uuid,
    user_id: Uuid,
    workspace_id: Uuid,
    scopes: &[String],
    redirect_uri: &str,
    code_challenge: Option<&str>,
    code_challenge_method: Option<CodeChallengeMethod>,
    ttl_secs: i64,
) -> Result<String, AppError> {
    let code = issue_refresh_token();
    store
        .insert_authorization_code(
            &hash_token(&code),
            app_id,
            user_id,
            workspace_id,
            scopes,
            redirect_uri,
            code_challenge,
            code_challenge_method,
            Duration::seconds(ttl_secs),
        )
        .await?;
    Ok(code)
}

pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub scope: String,
}

fn verify_pkce(code_challenge: &str, method: CodeChallengeMethod, verifier: &str) -> bool {
    match method {
        CodeChallengeMethod::Plain => verifier == code_challenge,
        CodeChallengeMethod::S256 => {
            let mut hasher = Sha256::new();
            hasher.update(verifier.as_bytes());
            let computed = URL_SAFE_NO_PAD.encode(hasher.finalize());
            computed == code_challenge
        }
    }
}

/// Confidential clients must present the secret registered at creation;
/// public clients carry none and rely on PKCE instead.
fn verify_client_secret(app: &OAuthApp, presented: Option<&str>) -> Result<(), OAuthError> {
    match (app.client_type, &app.client_secret_hash) {
        (ClientType::Confidential, Some(expected_hash)) => {
            let presented = presented.ok_or_else(|| OAuthError::InvalidClient("client_secret is required for this client".into()))?;
            if !constant_time_eq(&hash_token(presented), expected_hash) {
                return Err(OAuthError::InvalidClient("client_secret is invalid".into()));
            }
            Ok(())
        }
        (ClientType::Confidential, None) => Err(OAuthError::ServerError("confidential client has no client_secret_hash on record".into())),
        (ClientType::Public, _) => Ok(()),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn exchange_authorization_code(
    store: &Store,
    tokens: &TokenService,
    client_id: &str,
    client_secret: Option<&str>,
    code: &str,
    redirect_uri: &str,
    code_verifier: Option<&str>,
    refresh_token_ttl_secs: i64,
) -> Result<TokenGrant, OAuthError> {
    let app = store
        .find_oauth_app_by_client_id(client_id)
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?
        .ok_or_else(|| OAuthError::InvalidClient("unknown client_id".into()))?;

    verify_client_secret(&app, client_secret)?;

    let record = store
        .find_authorization_code_by_hash(&hash_token(code))
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?
        .ok_or_else(|| OAuthError::InvalidGrant("authorization code is invalid".into()))?;

    if record.is_used || record.expires_at < chrono::Utc::now() {
        return Err(OAuthError::InvalidGrant("authorization code is expired or already used".into()));
    }
    if record.o_auth_app_id != app.id {
        return Err(OAuthError::InvalidGrant("authorization code was not issued to this client".into()));
    }
    if record.redirect_uri != redirect_uri {
        return Err(OAuthError::InvalidGrant("redirect_uri does not match the one used at authorization time".into()));
    }

    if let Some(challenge) = &record.code_challenge {
        let verifier = code_verifier.ok_or_else(|| OAuthError::InvalidGrant("code_verifier is required".into()))?;
        let method = record.code_challenge_method.unwrap_or(CodeChallengeMethod::Plain);
        if !verify_pkce(challenge, method, verifier) {
            return Err(OAuthError::InvalidGrant("code_verifier does not match code_challenge".into()));
        }
    }

    store
        .mark_authorization_code_used(record.id)
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?;

    let scopes: Vec<String> = record.scopes.split_whitespace().map(str::to_string).collect();
    let access_token = tokens
        .issue_access_token(record.user_id, Some(record.workspace_id), Some(client_id), &scopes)
        .map_err(|e| OAuthError::ServerError(e.to_string()))?;

    let refresh_token = issue_refresh_token();
    store
        .insert_refresh_token(
            &hash_token(&refresh_token),
            Some(app.id),
            record.user_id,
            record.workspace_id,
            &scopes,
            Duration::seconds(refresh_token_ttl_secs),
            Uuid::new_v4(),
            None,
            None,
            None,
        )
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?;

    Ok(TokenGrant {
        access_token,
        refresh_token,
        expires_in: refresh_token_ttl_secs,
        scope: scopes.join(" "),
    })
}

/// Rotates a refresh token. A presented token that is already revoked
/// means either the legitimate client raced itself or the token leaked —
/// either way the whole chain is no longer trustworthy, so the entire
/// family is revoked rather than just rejecting this one request.
pub async fn refresh_access_token(store: &Store, tokens: &TokenService, presented: &str, refresh_token_ttl_secs: i64) -> Result<TokenGrant, OAuthError> {
    let record = store
        .find_refresh_token_by_hash(&hash_token(presented))
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?
        .ok_or_else(|| OAuthError::InvalidGrant("refresh token is invalid".into()))?;

    if record.is_revoked {
        store
            .revoke_token_family(record.token_family_id, "token_reuse_detected")
            .await
            .map_err(|e| OAuthError::ServerError(e.to_string()))?;
        if let Some(app_id) = record.o_auth_app_id {
            store
                .audit_oauth_app(app_id, "token_reuse_detected", Some(record.user_id), Some(&format!("token_family_id={}", record.token_family_id)))
                .await
                .map_err(|e| OAuthError::ServerError(e.to_string()))?;
        }
        return Err(OAuthError::InvalidGrant("refresh token has already been used".into()));
    }
    if record.expires_at < chrono::Utc::now() {
        return Err(OAuthError::InvalidGrant("refresh token is expired".into()));
    }

    let new_token = issue_refresh_token();
    let rotated = store
        .rotate_refresh_token(&record, &hash_token(&new_token), Duration::seconds(refresh_token_ttl_secs), None, None)
        .await
        .map_err(|e| OAuthError::ServerError(e.to_string()))?;

    let client_id = match rotated.o_auth_app_id {
        Some(app_id) => Some(store.get_oauth_app(app_id).await.map_err(OAuthError::from)?.client_id),
        None => None,
    };
    let scopes: Vec<String> = rotated.scopes.split_whitespace().map(str::to_string).collect();
    let access_token = tokens
        .issue_access_token(rotated.user_id, Some(rotated.workspace_id), client_id.as_deref(), &scopes)
        .map_err(|e| OAuthError::ServerError(e.to_string()))?;

    Ok(TokenGrant {
        access_token,
        refresh_token: new_token,
        expires_in: refresh_token_ttl_secs,
        scope: scopes.join(" "),
    })
}

/// Resolution for `AppError`: convert to an `OAuthError::ServerError`.
impl From<AppError> for OAuthError {
    fn from(err: AppError) -> Self {
        OAuthError::ServerError(err.to_string())
    }
}
