//! Builds and validates storage keys:
//! `<workspaceUid>/<projectUid>/<category?>/<opaqueId>[.<ext>]`.
//!
//! Keys never contain user-supplied path segments — file names are
//! metadata, not keys, so there is nothing for a traversal string to ride in on.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use uuid::Uuid;

use crate::error::AppError;

/// 128 random bits, base64url-encoded without padding.
fn opaque_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `<ws>/<prj>/raw/<opaque>[.<ext>]` — the original uploaded bytes, when
/// not routed through the `uploads/<sessionUid>` flavor.
pub fn raw_key(workspace_id: Uuid, project_id: Uuid, ext: Option<&str>) -> String {
    build(workspace_id, project_id, "raw", &opaque_id(), ext)
}

/// `<ws>/<prj>/artifacts/<type>/<opaque>.<ext>` — derived artifacts
/// (wexbim geometry, the properties index).
pub fn artifact_key(workspace_id: Uuid, project_id: Uuid, artifact_type: &str, ext: &str) -> String {
    build(workspace_id, project_id, &format!("artifacts/{artifact_type}"), &opaque_id(), Some(ext))
}

/// `<ws>/<prj>/uploads/<sessionUid>/<opaque>[.<ext>]` — temp storage for an
/// in-flight upload session.
pub fn upload_key(workspace_id: Uuid, project_id: Uuid, session_id: Uuid, ext: Option<&str>) -> String {
    build(workspace_id, project_id, &format!("uploads/{session_id}"), &opaque_id(), ext)
}

fn build(workspace_id: Uuid, project_id: Uuid, category: &str, opaque: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{workspace_id}/{project_id}/{category}/{opaque}.{ext}"),
        None => format!("{workspace_id}/{project_id}/{category}/{opaque}"),
    }
}

/// Case-insensitive prefix check against `<workspaceUid>/...`.
pub fn validate_workspace(key: &str, workspace_id: Uuid) -> Result<(), AppError> {
    let prefix = format!("{workspace_id}/");
    if key.len() < prefix.len() || !key[..prefix.len()].eq_ignore_ascii_case(&prefix) {
        return Err(AppError::Validation(format!("key does not belong to workspace {workspace_id}")));
    }
    Ok(())
}

/// Case-insensitive prefix check against `<workspaceUid>/<projectUid>/...`.
pub fn validate_project(key: &str, workspace_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
    let prefix = format!("{workspace_id}/{project_id}/");
    if key.len() < prefix.len() || !key[..prefix.len()].eq_ignore_ascii_case(&prefix) {
        return Err(AppError::Validation(format!("key does not belong to project {project_id}")));
    }
    Ok(())
}

/// Rejects traversal attempts before any backend ever sees the key.
/// Applied by every `ContentStore` implementation at the top of
/// `put`/`open_read`/`delete`/etc.
pub fn reject_traversal(key: &str) -> Result<(), AppError> {
    if key.is_empty() {
        return Err(AppError::Validation("empty storage key".into()));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(AppError::Validation("storage key must not be absolute".into()));
    }
    // Reject a Windows drive letter (`C:\...`) regardless of host OS.
    if key.len() >= 2 && key.as_bytes()[1] == b':' {
        return Err(AppError::Validation("storage key must not contain a drive letter".into()));
    }
    let path = std::path::Path::new(key);
    for component in path.components() {
        match component {
            std::path::Component::Normal(_) | std::path::Component::RootDir => {}
            std::path::Component::CurDir
            | std::path::Component::ParentDir
            | std::path::Component::Prefix(_) => {
                return Err(AppError::Validation(format!("storage key escapes the base directory: {key}")));
            }
        }
    }
    // NFC-normalize and re-check: some unicode traversal tricks (e.g.
    // fullwidth dot variants) decompose into `..` after normalization on
    // certain filesystems; reject any segment that looks like a dot-only
    // component even if it slipped past `Path::components()`.
    if key.split('/').any(|seg| seg.chars().all(|c| c == '.') && !seg.is_empty()) {
        return Err(AppError::Validation(format!("storage key escapes the base directory: {key}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(reject_traversal("../../etc/passwd").is_err());
        assert!(reject_traversal("a/../../b").is_err());
    }

    #[test]
    fn rejects_absolute_and_drive_letter() {
        assert!(reject_traversal("/etc/passwd").is_err());
        assert!(reject_traversal("C:\\Windows\\system32").is_err());
    }

    #[test]
    fn accepts_well_formed_key() {
        let ws = Uuid::new_v4();
        let prj = Uuid::new_v4();
        let key = raw_key(ws, prj, Some("ifc"));
        assert!(reject_traversal(&key).is_ok());
        assert!(validate_project(&key, ws, prj).is_ok());
    }

    #[test]
    fn workspace_validation_is_case_insensitive() {
        let ws = Uuid::new_v4();
        let prj = Uuid::new_v4();
        let key = raw_key(ws, prj, None).to_uppercase();
        assert!(validate_workspace(&key, ws).is_ok());
    }
}
