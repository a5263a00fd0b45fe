//! `POST /projects/{prjId}/models`, the version endpoints, and
//! `GET /versions/{id}/properties`.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{
    CreateModelRequest, CreateModelVersionRequest, IfcElementDto, ModelDto, ModelVersionDto, PagedList, PropertiesQuery,
};
use super::AppState;
use crate::auth::authz;
use crate::auth::identity::AuthenticatedIdentity;
use crate::error::AppError;
use crate::store::model::{FileCategory, ProjectRole, Scope};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{prjId}/models", post(create_model))
        .route("/models/{id}/versions", post(create_version))
        .route("/versions/{id}", get(get_version))
        .route("/versions/{id}/wexbim", get(get_wexbim))
        .route("/versions/{id}/properties", get(get_properties))
}

async fn create_model(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateModelRequest>,
) -> Result<Json<ModelDto>, AppError> {
    authz::require_scope(&identity, Scope::ModelsWrite)?;
    let project = state.store.get_project(project_id).await?;
    authz::require_project_role(&state.store, &identity, project.workspace_id, project.id, ProjectRole::Editor).await?;
    let model = state.store.create_model(project_id, &body.name).await?;
    Ok(Json(model.into()))
}

async fn authorize_model_editor(state: &AppState, identity: &AuthenticatedIdentity, model_id: Uuid) -> Result<crate::store::model::Model, AppError> {
    let model = state.store.get_model(model_id).await?;
    let project = state.store.get_project(model.project_id).await?;
    authz::require_project_role(&state.store, identity, project.workspace_id, project.id, ProjectRole::Editor).await?;
    Ok(model)
}

/// Only ever returns 201: a version's id is assigned at creation and the
/// conversion job is enqueued immediately, so there is no "already
/// exists, return 200" case the way `commit_upload` has for files.
async fn create_version(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(model_id): Path<Uuid>,
    Json(body): Json<CreateModelVersionRequest>,
) -> Result<Response, AppError> {
    authz::require_scope(&identity, Scope::ModelsWrite)?;
    authorize_model_editor(&state, &identity, model_id).await?;

    let ifc_file = state.store.get_file(body.ifc_file_id).await?;
    if ifc_file.category != FileCategory::Ifc {
        return Err(AppError::Validation("ifcFileId must reference a committed file of category 'ifc'".into()));
    }

    let version = state.uploads.create_version_and_enqueue(model_id, body.ifc_file_id).await?;
    let dto: ModelVersionDto = version.into();
    Ok((StatusCode::CREATED, Json(dto)).into_response())
}

async fn authorize_version_viewer(state: &AppState, identity: &AuthenticatedIdentity, version_id: Uuid) -> Result<crate::store::model::ModelVersion, AppError> {
    let version = state.store.get_model_version(version_id).await?;
    let model = state.store.get_model(version.model_id).await?;
    let project = state.store.get_project(model.project_id).await?;
    authz::require_project_role(&state.store, identity, project.workspace_id, project.id, ProjectRole::Viewer).await?;
    Ok(version)
}

async fn get_version(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Json<ModelVersionDto>, AppError> {
    authz::require_scope(&identity, Scope::ModelsRead)?;
    let version = authorize_version_viewer(&state, &identity, id).await?;
    Ok(Json(version.into()))
}

/// 302 to a presigned URL when the backend can produce one, 200 with the
/// raw bytes otherwise.
async fn get_wexbim(State(state): State<AppState>, identity: AuthenticatedIdentity, Path(id): Path<Uuid>) -> Result<Response, AppError> {
    authz::require_scope(&identity, Scope::ModelsRead)?;
    let version = authorize_version_viewer(&state, &identity, id).await?;
    let file_id = version.wex_bim_file_id.ok_or_else(|| AppError::Conflict("this model version has no wexbim artifact yet".into()))?;
    let file = state.store.get_file(file_id).await?;

    if let Some(url) = state.uploads.content_store().generate_download_url(&file.storage_key, Utc::now() + chrono::Duration::minutes(15)).await? {
        return Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response());
    }

    let stream = state
        .uploads
        .content_store()
        .open_read(&file.storage_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("wexbim artifact {file_id} has no bytes")))?;
    let body = axum::body::Body::from_stream(stream);
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response())
}

async fn get_properties(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
    Query(query): Query<PropertiesQuery>,
) -> Result<Json<PagedList<IfcElementDto>>, AppError> {
    authz::require_scope(&identity, Scope::ModelsRead)?;
    authorize_version_viewer(&state, &identity, id).await?;
    let (rows, total) = state.store.query_elements(id, query.label.as_deref(), query.page, query.page_size).await?;
    let items = rows.into_iter().map(IfcElementDto::from).collect();
    Ok(Json(PagedList::new(items, query.page, query.page_size, total)))
}
