//! OAuth client registry, authorization codes, refresh-token chains, PATs,
//! and their audit logs.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::model::{
    AuthorizationCode, ClientType, CodeChallengeMethod, OAuthApp, OAuthAppAuditLog,
    PersonalAccessToken, PersonalAccessTokenAuditLog, RefreshToken,
};
use super::Store;
use crate::error::AppError;

impl Store {
    #[allow(clippy::too_many_arguments)]
    pub async fn create_oauth_app(
        &self,
        workspace_id: Uuid,
        name: &str,
        description: Option<&str>,
        client_type: ClientType,
        client_id: &str,
        client_secret_hash: Option<&str>,
        redirect_uris: &[String],
        allowed_scopes: &[String],
        created_by_user_id: Uuid,
    ) -> Result<OAuthApp, AppError> {
        let app = OAuthApp {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            client_type,
            client_id: client_id.to_string(),
            client_secret_hash: client_secret_hash.map(str::to_string),
            redirect_uris: serde_json::to_string(redirect_uris).unwrap_or_default(),
            allowed_scopes: serde_json::to_string(allowed_scopes).unwrap_or_default(),
            is_enabled: true,
            created_at: Utc::now(),
            updated_at: None,
            created_by_user_id,
        };
        sqlx::query(
            "INSERT INTO oauth_apps (id, workspace_id, name, description, client_type, client_id, \
             client_secret_hash, redirect_uris, allowed_scopes, is_enabled, created_at, updated_at, created_by_user_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(app.id)
        .bind(app.workspace_id)
        .bind(&app.name)
        .bind(&app.description)
        .bind(app.client_type)
        .bind(&app.client_id)
        .bind(&app.client_secret_hash)
        .bind(&app.redirect_uris)
        .bind(&app.allowed_scopes)
        .bind(app.is_enabled)
        .bind(app.created_at)
        .bind(app.updated_at)
        .bind(app.created_by_user_id)
        .execute(self.pool())
        .await?;
        Ok(app)
    }

    pub async fn find_oauth_app_by_client_id(&self, client_id: &str) -> Result<Option<OAuthApp>, AppError> {
        Ok(sqlx::query_as::<_, OAuthApp>("SELECT * FROM oauth_apps WHERE client_id = ?")
            .bind(client_id)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn get_oauth_app(&self, id: Uuid) -> Result<OAuthApp, AppError> {
        sqlx::query_as::<_, OAuthApp>("SELECT * FROM oauth_apps WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("oauth app {id} not found")))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_authorization_code(
        &self,
        code_hash: &str,
        o_auth_app_id: Uuid,
        user_id: Uuid,
        workspace_id: Uuid,
        scopes: &[String],
        redirect_uri: &str,
        code_challenge: Option<&str>,
        code_challenge_method: Option<CodeChallengeMethod>,
        ttl: Duration,
    ) -> Result<AuthorizationCode, AppError> {
        let now = Utc::now();
        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            code_hash: code_hash.to_string(),
            o_auth_app_id,
            user_id,
            workspace_id,
            scopes: scopes.join(" "),
            redirect_uri: redirect_uri.to_string(),
            code_challenge: code_challenge.map(str::to_string),
            code_challenge_method,
            created_at: now,
            expires_at: now + ttl,
            is_used: false,
            used_at: None,
        };
        sqlx::query(
            "INSERT INTO authorization_codes (id, code_hash, o_auth_app_id, user_id, workspace_id, scopes, \
             redirect_uri, code_challenge, code_challenge_method, created_at, expires_at, is_used, used_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(code.id)
        .bind(&code.code_hash)
        .bind(code.o_auth_app_id)
        .bind(code.user_id)
        .bind(code.workspace_id)
        .bind(&code.scopes)
        .bind(&code.redirect_uri)
        .bind(&code.code_challenge)
        .bind(code.code_challenge_method)
        .bind(code.created_at)
        .bind(code.expires_at)
        .bind(code.is_used)
        .bind(code.used_at)
        .execute(self.pool())
        .await?;
        Ok(code)
    }

    pub async fn find_authorization_code_by_hash(&self, code_hash: &str) -> Result<Option<AuthorizationCode>, AppError> {
        Ok(sqlx::query_as::<_, AuthorizationCode>("SELECT * FROM authorization_codes WHERE code_hash = ?")
            .bind(code_hash)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn mark_authorization_code_used(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE authorization_codes SET is_used = 1, used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_refresh_token(
        &self,
        token_hash: &str,
        o_auth_app_id: Option<Uuid>,
        user_id: Uuid,
        workspace_id: Uuid,
        scopes: &[String],
        ttl: Duration,
        token_family_id: Uuid,
        parent_token_id: Option<Uuid>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<RefreshToken, AppError> {
        let now = Utc::now();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: token_hash.to_string(),
            o_auth_app_id,
            user_id,
            workspace_id,
            scopes: scopes.join(" "),
            created_at: now,
            expires_at: now + ttl,
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            parent_token_id,
            replaced_by_token_id: None,
            token_family_id,
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        };
        sqlx::query(
            "INSERT INTO refresh_tokens (id, token_hash, o_auth_app_id, user_id, workspace_id, scopes, \
             created_at, expires_at, is_revoked, revoked_at, revoked_reason, parent_token_id, \
             replaced_by_token_id, token_family_id, ip_address, user_agent) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(token.o_auth_app_id)
        .bind(token.user_id)
        .bind(token.workspace_id)
        .bind(&token.scopes)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.is_revoked)
        .bind(token.revoked_at)
        .bind(&token.revoked_reason)
        .bind(token.parent_token_id)
        .bind(token.replaced_by_token_id)
        .bind(token.token_family_id)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .execute(self.pool())
        .await?;
        Ok(token)
    }

    pub async fn find_refresh_token_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, AppError> {
        Ok(sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(self.pool())
            .await?)
    }

    /// Atomically: revoke `old_id` (reason `token_rotation`), link
    /// `replaced_by_token_id`, insert the fresh token in the same family.
    #[allow(clippy::too_many_arguments)]
    pub async fn rotate_refresh_token(
        &self,
        old: &RefreshToken,
        new_token_hash: &str,
        ttl: Duration,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<RefreshToken, AppError> {
        let mut tx = self.pool().begin().await?;
        let new_id = Uuid::new_v4();
        sqlx::query("UPDATE refresh_tokens SET is_revoked = 1, revoked_at = ?, revoked_reason = ?, replaced_by_token_id = ? WHERE id = ?")
            .bind(Utc::now())
            .bind("token_rotation")
            .bind(new_id)
            .bind(old.id)
            .execute(&mut *tx)
            .await?;
        let now = Utc::now();
        let scopes: Vec<String> = old.scopes.split_whitespace().map(str::to_string).collect();
        let new_token = RefreshToken {
            id: new_id,
            token_hash: new_token_hash.to_string(),
            o_auth_app_id: old.o_auth_app_id,
            user_id: old.user_id,
            workspace_id: old.workspace_id,
            scopes: scopes.join(" "),
            created_at: now,
            expires_at: now + ttl,
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            parent_token_id: Some(old.id),
            replaced_by_token_id: None,
            token_family_id: old.token_family_id,
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        };
        sqlx::query(
            "INSERT INTO refresh_tokens (id, token_hash, o_auth_app_id, user_id, workspace_id, scopes, \
             created_at, expires_at, is_revoked, revoked_at, revoked_reason, parent_token_id, \
             replaced_by_token_id, token_family_id, ip_address, user_agent) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_token.id)
        .bind(&new_token.token_hash)
        .bind(new_token.o_auth_app_id)
        .bind(new_token.user_id)
        .bind(new_token.workspace_id)
        .bind(&new_token.scopes)
        .bind(new_token.created_at)
        .bind(new_token.expires_at)
        .bind(new_token.is_revoked)
        .bind(new_token.revoked_at)
        .bind(&new_token.revoked_reason)
        .bind(new_token.parent_token_id)
        .bind(new_token.replaced_by_token_id)
        .bind(new_token.token_family_id)
        .bind(&new_token.ip_address)
        .bind(&new_token.user_agent)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(new_token)
    }

    /// Reuse detection: revokes every token sharing `token_family_id`.
    pub async fn revoke_token_family(&self, token_family_id: Uuid, reason: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE refresh_tokens SET is_revoked = 1, revoked_at = ?, revoked_reason = ? WHERE token_family_id = ? AND is_revoked = 0")
            .bind(Utc::now())
            .bind(reason)
            .bind(token_family_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_pat(
        &self,
        token_hash: &str,
        token_prefix: &str,
        user_id: Uuid,
        workspace_id: Uuid,
        name: &str,
        description: Option<&str>,
        scopes: &[String],
        ttl: Duration,
        created_from_ip_address: Option<&str>,
    ) -> Result<PersonalAccessToken, AppError> {
        let now = Utc::now();
        let pat = PersonalAccessToken {
            id: Uuid::new_v4(),
            token_hash: token_hash.to_string(),
            token_prefix: token_prefix.to_string(),
            user_id,
            workspace_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            scopes: scopes.join(" "),
            created_at: now,
            expires_at: now + ttl,
            last_used_at: None,
            last_used_ip_address: None,
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            created_from_ip_address: created_from_ip_address.map(str::to_string),
        };
        sqlx::query(
            "INSERT INTO personal_access_tokens (id, token_hash, token_prefix, user_id, workspace_id, name, \
             description, scopes, created_at, expires_at, last_used_at, last_used_ip_address, is_revoked, \
             revoked_at, revoked_reason, created_from_ip_address) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pat.id)
        .bind(&pat.token_hash)
        .bind(&pat.token_prefix)
        .bind(pat.user_id)
        .bind(pat.workspace_id)
        .bind(&pat.name)
        .bind(&pat.description)
        .bind(&pat.scopes)
        .bind(pat.created_at)
        .bind(pat.expires_at)
        .bind(pat.last_used_at)
        .bind(&pat.last_used_ip_address)
        .bind(pat.is_revoked)
        .bind(pat.revoked_at)
        .bind(&pat.revoked_reason)
        .bind(&pat.created_from_ip_address)
        .execute(self.pool())
        .await?;
        Ok(pat)
    }

    pub async fn find_pat_by_hash(&self, token_hash: &str) -> Result<Option<PersonalAccessToken>, AppError> {
        Ok(sqlx::query_as::<_, PersonalAccessToken>("SELECT * FROM personal_access_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn get_pat(&self, id: Uuid) -> Result<PersonalAccessToken, AppError> {
        sqlx::query_as::<_, PersonalAccessToken>("SELECT * FROM personal_access_tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("personal access token {id} not found")))
    }

    pub async fn touch_pat_usage(&self, id: Uuid, ip_address: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE personal_access_tokens SET last_used_at = ?, last_used_ip_address = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(ip_address)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn revoke_pat(&self, id: Uuid, reason: &str) -> Result<PersonalAccessToken, AppError> {
        sqlx::query("UPDATE personal_access_tokens SET is_revoked = 1, revoked_at = ?, revoked_reason = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(reason)
            .bind(id)
            .execute(self.pool())
            .await?;
        self.get_pat(id).await
    }

    pub async fn audit_oauth_app(&self, subject_id: Uuid, event_type: &str, actor_user_id: Option<Uuid>, details: Option<&str>) -> Result<OAuthAppAuditLog, AppError> {
        let entry = OAuthAppAuditLog {
            id: Uuid::new_v4(),
            subject_id,
            event_type: event_type.to_string(),
            actor_user_id,
            timestamp: Utc::now(),
            details: details.map(str::to_string),
            ip_address: None,
            user_agent: None,
        };
        sqlx::query("INSERT INTO oauth_app_audit_log (id, subject_id, event_type, actor_user_id, timestamp, details, ip_address, user_agent) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(entry.id)
            .bind(entry.subject_id)
            .bind(&entry.event_type)
            .bind(entry.actor_user_id)
            .bind(entry.timestamp)
            .bind(&entry.details)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .execute(self.pool())
            .await?;
        Ok(entry)
    }

    pub async fn audit_pat(&self, subject_id: Uuid, event_type: &str, actor_user_id: Option<Uuid>, details: Option<&str>) -> Result<PersonalAccessTokenAuditLog, AppError> {
        let entry = PersonalAccessTokenAuditLog {
            id: Uuid::new_v4(),
            subject_id,
            event_type: event_type.to_string(),
            actor_user_id,
            timestamp: Utc::now(),
            details: details.map(str::to_string),
            ip_address: None,
            user_agent: None,
        };
        sqlx::query("INSERT INTO pat_audit_log (id, subject_id, event_type, actor_user_id, timestamp, details, ip_address, user_agent) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(entry.id)
            .bind(entry.subject_id)
            .bind(&entry.event_type)
            .bind(entry.actor_user_id)
            .bind(entry.timestamp)
            .bind(&entry.details)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .execute(self.pool())
            .await?;
        Ok(entry)
    }
}

/// Convenience for grouping a fresh authorization expiry.
pub fn expires_in(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs)
}
