//! A token bound to workspace A must never see a
//! project that lives in workspace B, and the failure must look like
//! `cross_workspace`/`forbidden`, not a leaked 404 that would confirm the
//! resource exists.

mod common;

use axum::http::StatusCode;
use bim_server::store::model::Scope;
use tower::ServiceExt;

use common::{bearer_for, body_json, empty_request, json_request};

#[tokio::test]
async fn project_in_other_workspace_is_unreachable() {
    let app = common::build_test_app().await;
    let alice = uuid::Uuid::new_v4();
    let bob = uuid::Uuid::new_v4();

    let alice_create = bearer_for(&app.state.tokens, alice, None, &[Scope::WorkspacesWrite]);
    let ws_a = body_json(
        app.router
            .clone()
            .oneshot(json_request("POST", "/workspaces", Some(&alice_create), serde_json::json!({ "name": "Workspace A", "description": null })))
            .await
            .unwrap(),
    )
    .await;
    let ws_a_id: uuid::Uuid = ws_a["id"].as_str().unwrap().parse().unwrap();

    let bob_create = bearer_for(&app.state.tokens, bob, None, &[Scope::WorkspacesWrite]);
    let ws_b = body_json(
        app.router
            .clone()
            .oneshot(json_request("POST", "/workspaces", Some(&bob_create), serde_json::json!({ "name": "Workspace B", "description": null })))
            .await
            .unwrap(),
    )
    .await;
    let ws_b_id: uuid::Uuid = ws_b["id"].as_str().unwrap().parse().unwrap();

    let alice_proj_token = bearer_for(&app.state.tokens, alice, Some(ws_a_id), &[Scope::ProjectsWrite, Scope::ProjectsRead]);
    let project = body_json(
        app.router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/workspaces/{ws_a_id}/projects"),
                Some(&alice_proj_token),
                serde_json::json!({ "name": "Tower Core", "description": null }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let project_id = project["id"].as_str().unwrap();

    // Bob's token is bound to workspace B and holds the read scope, but
    // has no membership anywhere near project_id.
    let bob_read_token = bearer_for(&app.state.tokens, bob, Some(ws_b_id), &[Scope::ProjectsRead]);
    let req = empty_request("GET", &format!("/projects/{project_id}"), Some(&bob_read_token));
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let err = body_json(resp).await;
    assert_eq!(err["code"], "forbidden");

    // Alice herself, holding a token bound to the wrong workspace (B
    // instead of A), is rejected the same way — the project's own owner
    // doesn't get a pass just because the ID is correct.
    let alice_wrong_ws_token = bearer_for(&app.state.tokens, alice, Some(ws_b_id), &[Scope::ProjectsRead]);
    let req = empty_request("GET", &format!("/projects/{project_id}"), Some(&alice_wrong_ws_token));
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_projects_is_scoped_to_the_tokens_workspace() {
    let app = common::build_test_app().await;
    let alice = uuid::Uuid::new_v4();
    let bob = uuid::Uuid::new_v4();

    let alice_create = bearer_for(&app.state.tokens, alice, None, &[Scope::WorkspacesWrite]);
    let ws_a = body_json(
        app.router
            .clone()
            .oneshot(json_request("POST", "/workspaces", Some(&alice_create), serde_json::json!({ "name": "A", "description": null })))
            .await
            .unwrap(),
    )
    .await;
    let ws_a_id: uuid::Uuid = ws_a["id"].as_str().unwrap().parse().unwrap();

    let bob_create = bearer_for(&app.state.tokens, bob, None, &[Scope::WorkspacesWrite]);
    let ws_b = body_json(
        app.router
            .clone()
            .oneshot(json_request("POST", "/workspaces", Some(&bob_create), serde_json::json!({ "name": "B", "description": null })))
            .await
            .unwrap(),
    )
    .await;
    let ws_b_id: uuid::Uuid = ws_b["id"].as_str().unwrap().parse().unwrap();

    // Bob tries to list projects in Alice's workspace using a token bound to his own.
    let bob_token = bearer_for(&app.state.tokens, bob, Some(ws_b_id), &[Scope::ProjectsRead]);
    let req = empty_request("GET", &format!("/workspaces/{ws_a_id}/projects"), Some(&bob_token));
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
