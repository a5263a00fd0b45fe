//! The happy-path ingest flow and idempotent commit, exercised
//! against `UploadCoordinator` and `IfcConversionOrchestrator` directly —
//! the state machine and conversion pipeline, one level below the HTTP
//! surface that just thinly wraps them.

mod common;

use bim_server::conversion::progress::ProgressNotifier;
use bim_server::conversion::IfcConversionOrchestrator;
use bim_server::store::model::{FileCategory, ModelVersionStatus, UploadMode};
use bim_server::uploads::{CommitOptions, ReserveOptions};
use bytes::Bytes;
use futures_util::stream;

const SAMPLE_IFC: &str = "#1=IFCPROJECT('2O2Fr$t4X7Zf8NOew3FLOH',$,'Test Project',$,$,$,$,(#2),#3);\n\
#2=IFCWALL('1BvM2$gHX1FOqmiUhKXcnS',$,'Wall-01',$,$,#10,#11,$,$);\n";

async fn setup_project(app: &common::TestApp) -> (uuid::Uuid, uuid::Uuid, uuid::Uuid) {
    let user = app.state.store.upsert_user_by_subject("ingest-user", None, None).await.unwrap();
    let ws = app.state.store.create_workspace(user.id, "Ingest Co", None).await.unwrap();
    let project = app.state.store.create_project(ws.id, user.id, "Tower", None).await.unwrap();
    (user.id, ws.id, project.id)
}

#[tokio::test]
async fn happy_ingest_runs_end_to_end() {
    let app = common::build_test_app().await;
    let (_user_id, ws_id, project_id) = setup_project(&app).await;

    let model = app.state.store.create_model(project_id, "Main Model").await.unwrap();

    let reserved = app
        .state
        .uploads
        .reserve_upload(
            ws_id,
            project_id,
            ReserveOptions { file_name: "model.ifc", content_type: Some("application/x-step"), expected_size_bytes: None, mode: UploadMode::ServerProxy },
        )
        .await
        .unwrap();
    let session_id = reserved.session.id;
    assert!(reserved.upload_url.is_none(), "server-proxy mode never hands back a direct-upload URL");

    let chunk: std::io::Result<Bytes> = Ok(Bytes::from(SAMPLE_IFC));
    let body = stream::iter(vec![chunk]);
    app.state.uploads.upload_content(project_id, session_id, Some("application/x-step"), body).await.unwrap();

    let file = app
        .state
        .uploads
        .commit_upload(project_id, session_id, CommitOptions { category: FileCategory::Ifc, kind: "source".into(), model_id: Some(model.id) })
        .await
        .unwrap();
    assert_eq!(file.category, FileCategory::Ifc);
    assert!(file.size_bytes > 0);

    // Committing the same session again returns the same file,
    // without creating a second ModelVersion.
    let file_again = app
        .state
        .uploads
        .commit_upload(project_id, session_id, CommitOptions { category: FileCategory::Ifc, kind: "source".into(), model_id: Some(model.id) })
        .await
        .unwrap();
    assert_eq!(file_again.id, file.id);

    let (versions_page_1, total) = app.state.store.list_files(project_id, 1, 20).await.unwrap();
    let ifc_files = versions_page_1.iter().filter(|f| f.category == FileCategory::Ifc).count();
    assert_eq!(ifc_files, 1);
    assert!(total >= 1);

    // Drive the conversion pipeline the worker would otherwise run.
    let versions = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM model_versions WHERE model_id = ?")
        .bind(model.id)
        .fetch_all(app.state.store.pool())
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
    let version_id = versions[0];

    let job_id = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM processing_jobs WHERE model_version_id = ?")
        .bind(version_id)
        .fetch_one(app.state.store.pool())
        .await
        .unwrap();

    let orchestrator = IfcConversionOrchestrator::new(app.state.store.clone(), app.state.uploads.clone(), ProgressNotifier::new());
    orchestrator.run(job_id, version_id).await.unwrap();

    let version = app.state.store.get_model_version(version_id).await.unwrap();
    assert_eq!(version.status, ModelVersionStatus::Ready);
    assert!(version.wex_bim_file_id.is_some());
    assert!(version.properties_file_id.is_some());

    let (elements, element_count) = app.state.store.query_elements(version_id, None, 1, 20).await.unwrap();
    assert_eq!(element_count, 2);
    assert!(elements.iter().any(|e| e.global_id.as_deref() == Some("1BvM2$gHX1FOqmiUhKXcnS")));
}

#[tokio::test]
async fn commit_fails_when_no_bytes_were_ever_uploaded() {
    let app = common::build_test_app().await;
    let (_user_id, ws_id, project_id) = setup_project(&app).await;

    let reserved = app
        .state
        .uploads
        .reserve_upload(
            ws_id,
            project_id,
            ReserveOptions { file_name: "empty.ifc", content_type: None, expected_size_bytes: None, mode: UploadMode::ServerProxy },
        )
        .await
        .unwrap();

    let result = app
        .state
        .uploads
        .commit_upload(reserved.session.project_id, reserved.session.id, CommitOptions { category: FileCategory::Ifc, kind: "source".into(), model_id: None })
        .await;
    assert!(result.is_err());
}
