//! `GET/DELETE /files/...` and `GET /projects/{prjId}/files`.
//! Content streaming reads straight from the content store; a missing
//! key at that layer surfaces as 404 rather than a mid-stream error.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use super::dto::{FileDto, PageQuery, PagedList};
use super::AppState;
use crate::auth::authz;
use crate::auth::identity::AuthenticatedIdentity;
use crate::error::AppError;
use crate::store::model::{ProjectRole, Scope};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files/{id}", get(get_file).delete(delete_file))
        .route("/files/{id}/content", get(get_file_content))
        .route("/projects/{prjId}/files", get(list_files))
}

async fn authorize_file_viewer(state: &AppState, identity: &AuthenticatedIdentity, file_id: Uuid) -> Result<crate::store::model::File, AppError> {
    let file = state.store.get_file(file_id).await?;
    let project = state.store.get_project(file.project_id).await?;
    authz::require_project_role(&state.store, identity, project.workspace_id, project.id, ProjectRole::Viewer).await?;
    Ok(file)
}

async fn get_file(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Json<FileDto>, AppError> {
    authz::require_scope(&identity, Scope::FilesRead)?;
    let file = authorize_file_viewer(&state, &identity, id).await?;
    Ok(Json(file.into()))
}

async fn get_file_content(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Response, AppError> {
    authz::require_scope(&identity, Scope::FilesRead)?;
    let file = authorize_file_viewer(&state, &identity, id).await?;

    let stream = state
        .uploads
        .content_store()
        .open_read(&file.storage_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("file {id} has no bytes")))?;

    let body = Body::from_stream(stream);
    let content_type = file.content_type.clone().unwrap_or_else(|| "application/octet-stream".to_string());
    Ok((
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file.name))],
        body,
    )
        .into_response())
}

async fn list_files(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(project_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<PagedList<FileDto>>, AppError> {
    authz::require_scope(&identity, Scope::FilesRead)?;
    let project = state.store.get_project(project_id).await?;
    authz::require_project_role(&state.store, &identity, project.workspace_id, project.id, ProjectRole::Viewer).await?;
    let (rows, total) = state.store.list_files(project_id, page.page, page.page_size).await?;
    let items = rows.into_iter().map(FileDto::from).collect();
    Ok(Json(PagedList::new(items, page.page, page.page_size, total)))
}

async fn delete_file(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Json<FileDto>, AppError> {
    authz::require_scope(&identity, Scope::FilesWrite)?;
    let file = state.store.get_file(id).await?;
    let project = state.store.get_project(file.project_id).await?;
    authz::require_project_role(&state.store, &identity, project.workspace_id, project.id, ProjectRole::Editor).await?;
    let deleted = state.store.soft_delete_file(id).await?;
    Ok(Json(deleted.into()))
}
