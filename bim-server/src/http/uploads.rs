//! `POST/GET /projects/{prjId}/uploads...`. Thin glue
//! over `UploadCoordinator`; authorization and the reserve/upload/commit
//! state machine itself live there.

use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::TryStreamExt;
use uuid::Uuid;

use super::dto::{CommitUploadRequest, CommitUploadResponse, ReserveUploadRequest, ReserveUploadResponse, UploadContentResponse};
use super::AppState;
use crate::auth::authz;
use crate::auth::identity::AuthenticatedIdentity;
use crate::error::AppError;
use crate::store::model::{ProjectRole, Scope};
use crate::uploads::{CommitOptions, ReserveOptions};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{prjId}/uploads", post(reserve_upload))
        .route("/projects/{prjId}/uploads/{sid}", get(get_upload_session))
        .route("/projects/{prjId}/uploads/{sid}/content", post(upload_content))
        .route("/projects/{prjId}/uploads/{sid}/commit", post(commit_upload))
}

async fn authorize_project_editor(state: &AppState, identity: &AuthenticatedIdentity, project_id: Uuid) -> Result<Uuid, AppError> {
    let project = state.store.get_project(project_id).await?;
    authz::require_project_role(&state.store, identity, project.workspace_id, project.id, ProjectRole::Editor).await?;
    Ok(project.workspace_id)
}

async fn reserve_upload(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(project_id): Path<Uuid>,
    Json(body): Json<ReserveUploadRequest>,
) -> Result<Json<ReserveUploadResponse>, AppError> {
    authz::require_scope(&identity, Scope::FilesWrite)?;
    let workspace_id = authorize_project_editor(&state, &identity, project_id).await?;
    let result = state
        .uploads
        .reserve_upload(
            workspace_id,
            project_id,
            ReserveOptions {
                file_name: &body.file_name,
                content_type: body.content_type.as_deref(),
                expected_size_bytes: body.expected_size_bytes,
                mode: body.mode,
            },
        )
        .await?;
    Ok(Json(ReserveUploadResponse { session: result.session.into(), upload_url: result.upload_url }))
}

async fn get_upload_session(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path((project_id, session_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<super::dto::UploadSessionDto>, AppError> {
    authz::require_scope(&identity, Scope::FilesRead)?;
    authorize_project_editor(&state, &identity, project_id).await?;
    let session = state.uploads.get_upload_session(project_id, session_id).await?;
    Ok(Json(session.into()))
}

async fn upload_content(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path((project_id, session_id)): Path<(Uuid, Uuid)>,
    mut multipart: Multipart,
) -> Result<Json<UploadContentResponse>, AppError> {
    authz::require_scope(&identity, Scope::FilesWrite)?;
    authorize_project_editor(&state, &identity, project_id).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
        .ok_or_else(|| AppError::Validation("multipart body has no fields".into()))?;
    let content_type = field.content_type().map(str::to_string);
    let stream = field.map_err(|e| std::io::Error::other(e.to_string()));

    let session = state.uploads.upload_content(project_id, session_id, content_type.as_deref(), stream).await?;
    Ok(Json(UploadContentResponse { session: session.into() }))
}

async fn commit_upload(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path((project_id, session_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CommitUploadRequest>,
) -> Result<Json<CommitUploadResponse>, AppError> {
    authz::require_scope(&identity, Scope::FilesWrite)?;
    authorize_project_editor(&state, &identity, project_id).await?;

    let file = state
        .uploads
        .commit_upload(project_id, session_id, CommitOptions { category: body.category, kind: body.kind, model_id: body.model_id })
        .await?;
    let session = state.uploads.get_upload_session(project_id, session_id).await?;
    Ok(Json(CommitUploadResponse { file: file.into(), session: session.into() }))
}
