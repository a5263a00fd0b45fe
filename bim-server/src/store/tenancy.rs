//! Users, workspaces, projects, and their memberships (ownership rule:
//! workspace exclusively owns projects/memberships; project owns files,
//! upload sessions, models).

use chrono::Utc;
use uuid::Uuid;

use super::model::{Project, ProjectMembership, ProjectRole, User, Workspace, WorkspaceMembership, WorkspaceRole};
use super::Store;
use crate::error::AppError;

impl Store {
    pub async fn upsert_user_by_subject(&self, subject: &str, email: Option<&str>, display_name: Option<&str>) -> Result<User, AppError> {
        if let Some(existing) = sqlx::query_as::<_, User>("SELECT * FROM users WHERE subject = ?")
            .bind(subject)
            .fetch_optional(self.pool())
            .await?
        {
            sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(existing.id)
                .execute(self.pool())
                .await?;
            return Ok(existing);
        }
        let user = User {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            email: email.map(str::to_string),
            display_name: display_name.map(str::to_string),
            created_at: Utc::now(),
            last_login_at: Some(Utc::now()),
        };
        sqlx::query(
            "INSERT INTO users (id, subject, email, display_name, created_at, last_login_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.subject)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.created_at)
        .bind(user.last_login_at)
        .execute(self.pool())
        .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
    }

    pub async fn create_workspace(&self, owner_id: Uuid, name: &str, description: Option<&str>) -> Result<Workspace, AppError> {
        let mut tx = self.pool().begin().await?;
        let ws = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
            updated_at: None,
        };
        sqlx::query("INSERT INTO workspaces (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)")
            .bind(ws.id)
            .bind(&ws.name)
            .bind(&ws.description)
            .bind(ws.created_at)
            .bind(ws.updated_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO workspace_memberships (workspace_id, user_id, role) VALUES (?, ?, ?)")
            .bind(ws.id)
            .bind(owner_id)
            .bind(WorkspaceRole::Owner)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(ws)
    }

    pub async fn get_workspace(&self, id: Uuid) -> Result<Workspace, AppError> {
        sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workspace {id} not found")))
    }

    pub async fn list_workspaces_for_user(&self, user_id: Uuid, page: i64, page_size: i64) -> Result<(Vec<Workspace>, i64), AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workspaces w JOIN workspace_memberships m ON m.workspace_id = w.id WHERE m.user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        let rows = sqlx::query_as::<_, Workspace>(
            "SELECT w.* FROM workspaces w JOIN workspace_memberships m ON m.workspace_id = w.id \
             WHERE m.user_id = ? ORDER BY w.created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(self.pool())
        .await?;
        Ok((rows, total))
    }

    pub async fn update_workspace(&self, id: Uuid, name: Option<&str>, description: Option<&str>) -> Result<Workspace, AppError> {
        let ws = self.get_workspace(id).await?;
        let name = name.unwrap_or(&ws.name);
        sqlx::query("UPDATE workspaces SET name = ?, description = COALESCE(?, description), updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_workspace(id).await
    }

    pub async fn workspace_role(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<WorkspaceRole>, AppError> {
        let row = sqlx::query_as::<_, WorkspaceMembership>(
            "SELECT * FROM workspace_memberships WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|m| m.role))
    }

    pub async fn create_project(&self, workspace_id: Uuid, creator_id: Uuid, name: &str, description: Option<&str>) -> Result<Project, AppError> {
        let mut tx = self.pool().begin().await?;
        let project = Project {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
            updated_at: None,
        };
        sqlx::query("INSERT INTO projects (id, workspace_id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(project.id)
            .bind(project.workspace_id)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.created_at)
            .bind(project.updated_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO project_memberships (project_id, user_id, role) VALUES (?, ?, ?)")
            .bind(project.id)
            .bind(creator_id)
            .bind(ProjectRole::ProjectAdmin)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(project)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project, AppError> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project {id} not found")))
    }

    pub async fn list_projects(&self, workspace_id: Uuid, page: i64, page_size: i64) -> Result<(Vec<Project>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE workspace_id = ?")
            .bind(workspace_id)
            .fetch_one(self.pool())
            .await?;
        let rows = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE workspace_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(workspace_id)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(self.pool())
        .await?;
        Ok((rows, total))
    }

    pub async fn update_project(&self, id: Uuid, name: Option<&str>, description: Option<&str>) -> Result<Project, AppError> {
        let project = self.get_project(id).await?;
        let name = name.unwrap_or(&project.name);
        sqlx::query("UPDATE projects SET name = ?, description = COALESCE(?, description), updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_project(id).await
    }

    pub async fn project_role(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectRole>, AppError> {
        let row = sqlx::query_as::<_, ProjectMembership>(
            "SELECT * FROM project_memberships WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|m| m.role))
    }
}
