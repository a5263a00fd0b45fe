//! `POST/GET/PATCH /workspaces`. Workspace creation has no
//! scope prerequisite beyond authentication — any authenticated user may
//! create a workspace, becoming its `Owner`.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use super::dto::{CreateWorkspaceRequest, PageQuery, PagedList, UpdateWorkspaceRequest, WorkspaceDto};
use super::AppState;
use crate::auth::authz;
use crate::auth::identity::AuthenticatedIdentity;
use crate::error::AppError;
use crate::store::model::WorkspaceRole;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workspaces", post(create_workspace).get(list_workspaces))
        .route("/workspaces/{id}", get(get_workspace).patch(update_workspace))
}

async fn create_workspace(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Json(body): Json<CreateWorkspaceRequest>,
) -> Result<Json<WorkspaceDto>, AppError> {
    authz::require_scope(&identity, crate::store::model::Scope::WorkspacesWrite)?;
    let ws = state.store.create_workspace(identity.user_id, &body.name, body.description.as_deref()).await?;
    Ok(Json(ws.into()))
}

async fn get_workspace(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Json<WorkspaceDto>, AppError> {
    authz::require_scope(&identity, crate::store::model::Scope::WorkspacesRead)?;
    authz::require_workspace_role(&state.store, &identity, id, WorkspaceRole::Guest).await?;
    let ws = state.store.get_workspace(id).await?;
    Ok(Json(ws.into()))
}

async fn list_workspaces(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Query(page): Query<PageQuery>,
) -> Result<Json<PagedList<WorkspaceDto>>, AppError> {
    authz::require_scope(&identity, crate::store::model::Scope::WorkspacesRead)?;
    let (rows, total) = state.store.list_workspaces_for_user(identity.user_id, page.page, page.page_size).await?;
    let items = rows.into_iter().map(WorkspaceDto::from).collect();
    Ok(Json(PagedList::new(items, page.page, page.page_size, total)))
}

async fn update_workspace(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspaceDto>, AppError> {
    authz::require_scope(&identity, crate::store::model::Scope::WorkspacesWrite)?;
    authz::require_workspace_role(&state.store, &identity, id, WorkspaceRole::Admin).await?;
    let ws = state.store.update_workspace(id, body.name.as_deref(), body.description.as_deref()).await?;
    Ok(Json(ws.into()))
}
