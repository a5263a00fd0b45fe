//! `POST /oauth/authorize` and `POST /oauth/token`.
//!
//! `/oauth/authorize` here takes an already-authenticated resource-owner
//! session (the `AuthenticatedIdentity` extractor) and a JSON body rather
//! than a browser redirect — this server has no login UI of its own, so
//! the authorization decision is the caller's, made before it calls this
//! endpoint with its own bearer token standing in for "user consented".

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use super::dto::{AuthorizeRequestBody, AuthorizeResponse, TokenRequestForm, TokenResponse};
use super::AppState;
use crate::auth::identity::AuthenticatedIdentity;
use crate::auth::oauth::{self, AuthorizeRequest};
use crate::error::{AppError, OAuthError};

pub fn router() -> Router<AppState> {
    Router::new().route("/oauth/authorize", post(authorize)).route("/oauth/token", post(token))
}

async fn authorize(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Json(body): Json<AuthorizeRequestBody>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    let workspace_id = identity.require_workspace()?;
    let req = AuthorizeRequest {
        response_type: &body.response_type,
        client_id: &body.client_id,
        redirect_uri: &body.redirect_uri,
        scope: &body.scope,
        code_challenge: body.code_challenge.as_deref(),
        code_challenge_method: body.code_challenge_method.as_deref(),
    };

    let trusted = oauth::resolve_and_check_redirect(&state.store, &req).await?;
    let (scopes, method) = oauth::validate_authorize_params(&trusted, &req).map_err(oauth_error_for_redirect)?;

    let code = oauth::issue_authorization_code(
        &state.store,
        trusted.app.id,
        identity.user_id,
        workspace_id,
        &scopes,
        &trusted.redirect_uri,
        body.code_challenge.as_deref(),
        method,
        state.config.auth_code_ttl_secs,
    )
    .await?;

    let mut redirect = url::Url::parse(&trusted.redirect_uri).map_err(|e| AppError::Validation(e.to_string()))?;
    redirect.query_pairs_mut().append_pair("code", &code);
    if let Some(state_param) = &body.state {
        redirect.query_pairs_mut().append_pair("state", state_param);
    }
    Ok(Json(AuthorizeResponse { redirect_uri: redirect.to_string() }))
}

/// At this point validation has already confirmed the redirect URI, so an
/// `OAuthError` could be reported as a redirect-with-query-params instead
/// — this endpoint returns it as a JSON body directly since it has no
/// browser to redirect.
fn oauth_error_for_redirect(err: OAuthError) -> AppError {
    AppError::Validation(err.to_string())
}

async fn token(State(state): State<AppState>, Json(form): Json<TokenRequestForm>) -> Result<Json<TokenResponse>, OAuthError> {
    let grant = match form.grant_type.as_str() {
        "authorization_code" => {
            let client_id = form.client_id.as_deref().ok_or_else(|| OAuthError::InvalidRequest("client_id is required".into()))?;
            let code = form.code.as_deref().ok_or_else(|| OAuthError::InvalidRequest("code is required".into()))?;
            let redirect_uri = form.redirect_uri.as_deref().ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".into()))?;
            oauth::exchange_authorization_code(
                &state.store,
                &state.tokens,
                client_id,
                form.client_secret.as_deref(),
                code,
                redirect_uri,
                form.code_verifier.as_deref(),
                state.config.refresh_token_ttl_secs,
            )
            .await?
        }
        "refresh_token" => {
            let refresh_token = form.refresh_token.as_deref().ok_or_else(|| OAuthError::InvalidRequest("refresh_token is required".into()))?;
            oauth::refresh_access_token(&state.store, &state.tokens, refresh_token, state.config.refresh_token_ttl_secs).await?
        }
        other => return Err(OAuthError::UnsupportedGrantType(format!("grant_type '{other}' is not supported"))),
    };

    Ok(Json(TokenResponse {
        access_token: grant.access_token,
        token_type: "Bearer",
        expires_in: grant.expires_in,
        refresh_token: grant.refresh_token,
        scope: grant.scope,
    }))
}
