//! Authorization-code + PKCE exchange, confidential-client secret check
//! (the fix this flow was missing before), and refresh-token rotation
//! with reuse detection on replay.

mod common;

use axum::http::StatusCode;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bim_server::store::model::ClientType;
use sha2::{Digest, Sha256};
use tower::ServiceExt;
use uuid::Uuid;

use common::{bearer_for, body_json, json_request};

const REDIRECT_URI: &str = "https://client.example/cb";

fn pkce_pair() -> (String, String) {
    let verifier = "a-sufficiently-long-random-verifier-string-1234567890";
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());
    (verifier.to_string(), challenge)
}

async fn setup_workspace(app: &common::TestApp) -> (Uuid, Uuid) {
    let user = app.state.store.upsert_user_by_subject("resource-owner", None, None).await.unwrap();
    let ws = app.state.store.create_workspace(user.id, "Acme", None).await.unwrap();
    (user.id, ws.id)
}

#[tokio::test]
async fn public_client_pkce_round_trip_and_refresh_rotation() {
    let app = common::build_test_app().await;
    let (user_id, ws_id) = setup_workspace(&app).await;

    let oauth_app = app
        .state
        .store
        .create_oauth_app(
            ws_id,
            "Site Viewer",
            None,
            ClientType::Public,
            "public-client-1",
            None,
            &[REDIRECT_URI.to_string()],
            &["workspaces:read".to_string(), "projects:read".to_string()],
            user_id,
        )
        .await
        .unwrap();

    let (verifier, challenge) = pkce_pair();
    let owner_token = bearer_for(&app.state.tokens, user_id, Some(ws_id), &[]);
    let authorize_body = serde_json::json!({
        "response_type": "code",
        "client_id": oauth_app.client_id,
        "redirect_uri": REDIRECT_URI,
        "scope": "workspaces:read",
        "code_challenge": challenge,
        "code_challenge_method": "S256",
    });
    let resp = app
        .router
        .clone()
        .oneshot(json_request("POST", "/oauth/authorize", Some(&owner_token), authorize_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let authorize_json = body_json(resp).await;
    let redirect = url::Url::parse(authorize_json["redirectUri"].as_str().unwrap()).unwrap();
    let code = redirect.query_pairs().find(|(k, _)| k == "code").unwrap().1.to_string();

    let token_resp = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/oauth/token",
            None,
            serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT_URI,
                "client_id": oauth_app.client_id,
                "code_verifier": verifier,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(token_resp.status(), StatusCode::OK);
    let grant = body_json(token_resp).await;
    let access_token = grant["access_token"].as_str().unwrap().to_string();
    let refresh_token = grant["refresh_token"].as_str().unwrap().to_string();
    assert!(!access_token.is_empty());

    // The same authorization code cannot be redeemed twice.
    let replay = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/oauth/token",
            None,
            serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT_URI,
                "client_id": oauth_app.client_id,
                "code_verifier": verifier,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    let replay_err = body_json(replay).await;
    assert_eq!(replay_err["error"], "invalid_grant");

    // Rotate the refresh token once: the new one works, the old one is burned.
    let rotate_resp = app
        .router
        .clone()
        .oneshot(json_request("POST", "/oauth/token", None, serde_json::json!({ "grant_type": "refresh_token", "refresh_token": refresh_token })))
        .await
        .unwrap();
    assert_eq!(rotate_resp.status(), StatusCode::OK);
    let rotated = body_json(rotate_resp).await;
    let second_refresh_token = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(second_refresh_token, refresh_token);

    // Reuse-detection: presenting the already-rotated (now revoked) token
    // again must fail, and must also burn the rest of the family, so the
    // legitimately-rotated second token stops working too.
    let reuse_resp = app
        .router
        .clone()
        .oneshot(json_request("POST", "/oauth/token", None, serde_json::json!({ "grant_type": "refresh_token", "refresh_token": refresh_token })))
        .await
        .unwrap();
    assert_eq!(reuse_resp.status(), StatusCode::BAD_REQUEST);
    let reuse_err = body_json(reuse_resp).await;
    assert_eq!(reuse_err["error"], "invalid_grant");

    let after_reuse = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/oauth/token",
            None,
            serde_json::json!({ "grant_type": "refresh_token", "refresh_token": second_refresh_token }),
        ))
        .await
        .unwrap();
    assert_eq!(after_reuse.status(), StatusCode::BAD_REQUEST);

    // The reuse is audited against the OAuth app, not just silently revoked.
    let audited: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM oauth_app_audit_log WHERE event_type = 'token_reuse_detected'")
        .fetch_one(app.state.store.pool())
        .await
        .unwrap();
    assert_eq!(audited, 1);
}

#[tokio::test]
async fn confidential_client_requires_its_secret() {
    let app = common::build_test_app().await;
    let (user_id, ws_id) = setup_workspace(&app).await;

    let secret_hash = bim_server::auth::tokens::hash_token("correct-horse-battery-staple");
    let oauth_app = app
        .state
        .store
        .create_oauth_app(
            ws_id,
            "Server Integration",
            None,
            ClientType::Confidential,
            "confidential-client-1",
            Some(&secret_hash),
            &[REDIRECT_URI.to_string()],
            &["workspaces:read".to_string()],
            user_id,
        )
        .await
        .unwrap();

    let owner_token = bearer_for(&app.state.tokens, user_id, Some(ws_id), &[]);
    let authorize_body = serde_json::json!({
        "response_type": "code",
        "client_id": oauth_app.client_id,
        "redirect_uri": REDIRECT_URI,
        "scope": "workspaces:read",
    });
    let authorize_json = body_json(
        app.router
            .clone()
            .oneshot(json_request("POST", "/oauth/authorize", Some(&owner_token), authorize_body.clone()))
            .await
            .unwrap(),
    )
    .await;
    let redirect = url::Url::parse(authorize_json["redirectUri"].as_str().unwrap()).unwrap();
    let code = redirect.query_pairs().find(|(k, _)| k == "code").unwrap().1.to_string();

    // Wrong secret: rejected before the code is even consulted.
    let wrong_secret = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/oauth/token",
            None,
            serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT_URI,
                "client_id": oauth_app.client_id,
                "client_secret": "not-the-secret",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_secret.status(), StatusCode::UNAUTHORIZED);
    let err = body_json(wrong_secret).await;
    assert_eq!(err["error"], "invalid_client");

    // Correct secret: succeeds and the code is now spent.
    let ok = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/oauth/token",
            None,
            serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT_URI,
                "client_id": oauth_app.client_id,
                "client_secret": "correct-horse-battery-staple",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
}
