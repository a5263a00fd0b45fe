//! `POST /workspaces/{wsId}/pats` and `DELETE /pats/{id}`.
//! Revoking another user's token requires `pats:admin`; revoking your
//! own only requires `pats:write`.

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::Duration;
use uuid::Uuid;

use super::dto::{CreatePatRequest, PersonalAccessTokenCreatedDto};
use super::AppState;
use crate::auth::authz;
use crate::auth::identity::AuthenticatedIdentity;
use crate::auth::tokens::issue_personal_access_token;
use crate::error::AppError;
use crate::store::model::{Scope, WorkspaceRole};

pub fn router() -> Router<AppState> {
    Router::new().route("/workspaces/{wsId}/pats", post(create_pat)).route("/pats/{id}", delete(revoke_pat))
}

async fn create_pat(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(workspace_id): Path<Uuid>,
    Json(body): Json<CreatePatRequest>,
) -> Result<Json<PersonalAccessTokenCreatedDto>, AppError> {
    authz::require_scope(&identity, Scope::PatsWrite)?;
    authz::require_workspace_role(&state.store, &identity, workspace_id, WorkspaceRole::Guest).await?;

    for raw in &body.scopes {
        crate::store::model::Scope::parse(raw).ok_or_else(|| AppError::Validation(format!("unknown scope '{raw}'")))?;
    }

    let requested_ttl = body.ttl_secs.unwrap_or(state.config.pat_default_ttl_secs);
    let ttl_secs = requested_ttl.clamp(1, state.config.pat_max_ttl_secs);

    let (token, token_prefix) = issue_personal_access_token();
    let pat = state
        .store
        .insert_pat(
            &crate::auth::tokens::hash_token(&token),
            &token_prefix,
            identity.user_id,
            workspace_id,
            &body.name,
            body.description.as_deref(),
            &body.scopes,
            Duration::seconds(ttl_secs),
            None,
        )
        .await?;
    state.store.audit_pat(pat.id, "pat_created", Some(identity.user_id), None).await?;

    Ok(Json(PersonalAccessTokenCreatedDto::new(pat, token)))
}

async fn revoke_pat(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Json<()>, AppError> {
    authz::require_scope(&identity, Scope::PatsWrite)?;
    let pat = state.store.get_pat(id).await?;

    if pat.user_id != identity.user_id {
        authz::require_scope(&identity, Scope::PatsAdmin)?;
    }
    authz::require_same_workspace(&identity, pat.workspace_id)?;

    state.store.revoke_pat(id, "revoked_by_owner").await?;
    state.store.audit_pat(id, "pat_revoked", Some(identity.user_id), None).await?;
    Ok(Json(()))
}
