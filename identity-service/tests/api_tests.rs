mod common;

use chrono::Duration;
use common::session_from;
use common::TestApp;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/healthz")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_register_success() {
    let app = TestApp::spawn().await;

    let response = app.register("alice", "correct horse").await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status_code"], 201);
    let user_id = body["data"]["user_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(user_id).is_ok());
}

#[tokio::test]
async fn test_register_then_login_yields_registered_subject() {
    let app = TestApp::spawn().await;

    let user_id = app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    assert_eq!(session.user_id.as_deref(), Some(user_id.as_str()));

    // Subject proven by the access token alone
    let subject = app
        .authenticator
        .verify_access_token(&session.token)
        .expect("Access token should verify");
    assert_eq!(subject, user_id);

    let response = app
        .get_authenticated("/api/auth/profile", &session.token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user_id"], user_id.as_str());
}

#[tokio::test]
async fn test_register_duplicate_login() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "first password").await;
    let response = app.register("alice", "second password").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Original credentials still work, the rejected ones do not
    assert_eq!(app.login("alice", "first password").await.status(), StatusCode::OK);
    assert_eq!(app.login("alice", "second password").await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_leaves_no_profile() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "first password").await;
    app.register("alice", "second password").await;

    let session = app.login_user("alice", "first password").await;
    let response = app
        .get_authenticated("/api/auth/profile", &session.token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["email"].is_null());
}

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    let app = TestApp::spawn().await;

    let statuses = concurrent_posts(
        &app,
        "/api/auth/register",
        json!({ "login": "race", "password": "pw123" }),
        8,
    )
    .await;

    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 7);
}

#[tokio::test]
async fn test_register_invalid_input() {
    let app = TestApp::spawn().await;

    let empty_login = app.register("", "pw123").await;
    assert_eq!(empty_login.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let padded_login = app.register(" alice ", "pw123").await;
    assert_eq!(padded_login.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let empty_password = app.register("alice", "").await;
    assert_eq!(empty_password.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "correct horse").await;

    let wrong_password = app.login("alice", "battery staple").await;
    let unknown_login = app.login("mallory", "correct horse").await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_login.status(), StatusCode::UNAUTHORIZED);

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_login: Value = unknown_login.json().await.unwrap();
    assert_eq!(wrong_password, unknown_login);
}

#[tokio::test]
async fn test_profile_rejects_tampered_token() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    // Flip the first character of the signature segment
    let signature_start = session.token.rfind('.').unwrap() + 1;
    let mut tampered = session.token.clone();
    let original = &session.token[signature_start..signature_start + 1];
    tampered.replace_range(
        signature_start..signature_start + 1,
        if original == "A" { "B" } else { "A" },
    );

    let response = app
        .get_authenticated("/api/auth/profile", &tampered)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let foreign = auth::Authenticator::new(
        b"another-secret-key-for-jwt-signing-at-least-32-bytes",
        Duration::hours(1),
    )
    .issue_access_token(session.user_id.as_deref().unwrap())
    .unwrap();

    let response = app
        .get_authenticated("/api/auth/profile", &foreign.token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_requires_authorization() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/api/auth/profile")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_token_expires() {
    let app = TestApp::spawn_with_ttls(Duration::seconds(1), Duration::hours(24)).await;

    app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    let response = app
        .get_authenticated("/api/auth/profile", &session.token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The refresh token still opens a new session
    let response = app.refresh(&session.refresh_token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rotation_invalidates_reuse() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    let first = app.refresh(&session.refresh_token).await;
    assert_eq!(first.status(), StatusCode::OK);
    let rotated = session_from(first).await;
    assert_ne!(rotated.refresh_token, session.refresh_token);

    let reuse = app.refresh(&session.refresh_token).await;
    assert_eq!(reuse.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_concurrent_refresh_single_winner() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    let statuses = concurrent_posts(
        &app,
        "/api/auth/token/refresh",
        json!({ "refresh_token": session.refresh_token }),
        8,
    )
    .await;

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 401).count(), 7);
}

#[tokio::test]
async fn test_refresh_token_expires() {
    let app = TestApp::spawn_with_ttls(Duration::hours(1), Duration::seconds(1)).await;

    app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let response = app.refresh(&session.refresh_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_unknown_token() {
    let app = TestApp::spawn().await;

    let response = app.refresh("never-issued").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.refresh("").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    let response = app.logout(&session.refresh_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.refresh(&session.refresh_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logging out twice is still a success
    let response = app.logout(&session.refresh_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_logout_unknown_token_succeeds() {
    let app = TestApp::spawn().await;

    let response = app.logout("never-issued").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_logout_blank_token_rejected() {
    let app = TestApp::spawn().await;

    let response = app.logout("   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_round_trip_and_overwrite() {
    let app = TestApp::spawn().await;

    let user_id = app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    for email in ["alice@example.com", "alice@example.org"] {
        let response = app
            .put_authenticated("/api/auth/profile", &session.token)
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .get_authenticated("/api/auth/profile", &session.token)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["data"]["user_id"], user_id.as_str());
        assert_eq!(body["data"]["email"], email);
    }
}

#[tokio::test]
async fn test_profile_invalid_email() {
    let app = TestApp::spawn().await;

    app.register_user("alice", "correct horse").await;
    let session = app.login_user("alice", "correct horse").await;

    let response = app
        .put_authenticated("/api/auth/profile", &session.token)
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_session_lifecycle_scenario() {
    let app = TestApp::spawn().await;

    let subject = app.register_user("u1", "pw123").await;

    let first = app.login_user("u1", "pw123").await;
    let verified = app
        .authenticator
        .verify_access_token(&first.token)
        .expect("A1 should verify");
    assert_eq!(verified, subject);

    let response = app.refresh(&first.refresh_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = session_from(response).await;
    assert_ne!(second.refresh_token, first.refresh_token);
    assert_eq!(
        app.authenticator.verify_access_token(&second.token).unwrap(),
        subject
    );

    let response = app.refresh(&first.refresh_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.refresh(&second.refresh_token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Send the same POST `count` times concurrently and collect the status codes
async fn concurrent_posts(app: &TestApp, path: &str, body: Value, count: usize) -> Vec<u16> {
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..count {
        let request = app.post(path).json(&body);
        tasks.spawn(async move {
            request
                .send()
                .await
                .expect("Failed to execute request")
                .status()
                .as_u16()
        });
    }

    let mut statuses = Vec::new();
    while let Some(status) = tasks.join_next().await {
        statuses.push(status.expect("Request task panicked"));
    }
    statuses
}
