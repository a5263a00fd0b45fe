//! `POST/GET/PATCH /projects`. Every handler enforces
//! workspace membership before touching a project row, so a token bound
//! to the wrong workspace gets `cross_workspace` rather than a 404 or a
//! 200 with someone else's data.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use super::dto::{CreateProjectRequest, PageQuery, PagedList, ProjectDto, UpdateProjectRequest};
use super::AppState;
use crate::auth::authz;
use crate::auth::identity::AuthenticatedIdentity;
use crate::error::AppError;
use crate::store::model::{ProjectRole, Scope, WorkspaceRole};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workspaces/{wsId}/projects", post(create_project).get(list_projects))
        .route("/projects/{id}", get(get_project).patch(update_project))
}

async fn create_project(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(ws_id): Path<Uuid>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<ProjectDto>, AppError> {
    authz::require_scope(&identity, Scope::ProjectsWrite)?;
    authz::require_workspace_role(&state.store, &identity, ws_id, WorkspaceRole::Member).await?;
    let project = state.store.create_project(ws_id, identity.user_id, &body.name, body.description.as_deref()).await?;
    Ok(Json(project.into()))
}

async fn list_projects(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(ws_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<PagedList<ProjectDto>>, AppError> {
    authz::require_scope(&identity, Scope::ProjectsRead)?;
    authz::require_workspace_role(&state.store, &identity, ws_id, WorkspaceRole::Guest).await?;
    let (rows, total) = state.store.list_projects(ws_id, page.page, page.page_size).await?;
    let items = rows.into_iter().map(ProjectDto::from).collect();
    Ok(Json(PagedList::new(items, page.page, page.page_size, total)))
}

/// A project in another workspace than the caller's token must look
/// identical to a nonexistent one: resolve the project first only far
/// enough to learn its workspace, then let the role check reject it.
async fn get_project(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Json<ProjectDto>, AppError> {
    authz::require_scope(&identity, Scope::ProjectsRead)?;
    let project = state.store.get_project(id).await?;
    authz::require_project_role(&state.store, &identity, project.workspace_id, project.id, ProjectRole::Viewer).await?;
    Ok(Json(project.into()))
}

async fn update_project(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectDto>, AppError> {
    authz::require_scope(&identity, Scope::ProjectsWrite)?;
    let project = state.store.get_project(id).await?;
    authz::require_project_role(&state.store, &identity, project.workspace_id, project.id, ProjectRole::Editor).await?;
    let updated = state.store.update_project(id, body.name.as_deref(), body.description.as_deref()).await?;
    Ok(Json(updated.into()))
}
