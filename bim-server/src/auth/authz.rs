//! Scope and role checks. Role ordering is purely numeric (`rank()` on
//! `WorkspaceRole`/`ProjectRole`): a higher rank satisfies any requirement
//! a lower rank would. Workspace `Owner` additionally satisfies every
//! project-level requirement inside that workspace, even without an
//! explicit `ProjectMembership` row.

use uuid::Uuid;

use super::identity::AuthenticatedIdentity;
use crate::error::AppError;
use crate::store::model::{ProjectRole, Scope, WorkspaceRole};
use crate::store::Store;

pub fn require_scope(identity: &AuthenticatedIdentity, scope: Scope) -> Result<(), AppError> {
    if identity.has_scope(scope) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("missing required scope: {}", scope.as_str())))
    }
}

pub fn require_any_scope(identity: &AuthenticatedIdentity, scopes: &[Scope]) -> Result<(), AppError> {
    if identity.has_any_scope(scopes) {
        Ok(())
    } else {
        Err(AppError::Forbidden("missing required scope".into()))
    }
}

/// A request's workspace must match the token's bound workspace. If the
/// token carries no `tid` at all (dev-mode auth), isolation is not
/// enforced and the check passes regardless of `workspace_id`.
pub fn require_same_workspace(identity: &AuthenticatedIdentity, workspace_id: Uuid) -> Result<(), AppError> {
    match identity.workspace_id {
        None => Ok(()),
        Some(tid) if tid == workspace_id => Ok(()),
        Some(_) => Err(AppError::CrossWorkspace),
    }
}

pub async fn require_workspace_role(store: &Store, identity: &AuthenticatedIdentity, workspace_id: Uuid, minimum: WorkspaceRole) -> Result<WorkspaceRole, AppError> {
    require_same_workspace(identity, workspace_id)?;
    let role = store
        .workspace_role(workspace_id, identity.user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("not a member of this workspace".into()))?;
    if role.rank() >= minimum.rank() {
        Ok(role)
    } else {
        Err(AppError::Forbidden(format!("requires workspace role {minimum:?} or higher")))
    }
}

/// A workspace `Owner` satisfies any project role check within that
/// workspace without needing a separate project membership row.
pub async fn require_project_role(store: &Store, identity: &AuthenticatedIdentity, workspace_id: Uuid, project_id: Uuid, minimum: ProjectRole) -> Result<ProjectRole, AppError> {
    require_same_workspace(identity, workspace_id)?;

    if let Some(ws_role) = store.workspace_role(workspace_id, identity.user_id).await? {
        if ws_role == WorkspaceRole::Owner {
            return Ok(ProjectRole::ProjectAdmin);
        }
    }

    let role = store
        .project_role(project_id, identity.user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("not a member of this project".into()))?;
    if role.rank() >= minimum.rank() {
        Ok(role)
    } else {
        Err(AppError::Forbidden(format!("requires project role {minimum:?} or higher")))
    }
}
