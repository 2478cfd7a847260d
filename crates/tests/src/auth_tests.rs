use invitely_services::store::StatsStore;
use serde_json::Value;

use crate::fixtures::{seed::PASSWORD, test_app::TestApp};

#[tokio::test]
async fn register_creates_user_and_returns_token() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "alice@test.com",
            "username": "alice",
            "display_name": "Alice",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);

    let json: Value = resp.json().await.unwrap();
    assert!(json["access_token"].is_string());
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["user"]["email"], "alice@test.com");
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["user"]["display_name"], "Alice");
    assert_eq!(json["user"]["is_staff"], false);
}

#[tokio::test]
async fn register_opens_ledger_with_initial_quota() {
    let app = TestApp::spawn().await;
    let user = app.register_user("ledger@test.com", "ledger").await;

    let stats = app.store.find_by_user(user.object_id()).await.unwrap();
    assert_eq!(
        (stats.available, stats.sent, stats.accepted),
        (app.settings.invitation.initial_invitations, 0, 0)
    );
}

#[tokio::test]
async fn register_is_closed_in_invite_only_mode() {
    let app = TestApp::spawn_invite_only().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "closed@test.com",
            "username": "closed",
            "display_name": "Closed",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "not-an-email",
            "username": "bad",
            "display_name": "Bad",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn register_duplicate_email_fails() {
    let app = TestApp::spawn().await;
    app.register_user("dup@test.com", "user1").await;

    // Try same email, different username
    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "dup@test.com",
            "username": "user2",
            "display_name": "User 2",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409); // Conflict
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::spawn().await;
    app.register_user("wrongpw@test.com", "wrongpw").await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({
            "email": "wrongpw@test.com",
            "password": "WrongPassword!",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn login_by_username_succeeds() {
    let app = TestApp::spawn().await;
    app.register_user("byname@test.com", "byname").await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({
            "username": "byname",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["user"]["email"], "byname@test.com");
}

#[tokio::test]
async fn me_endpoint_returns_current_user() {
    let app = TestApp::spawn().await;
    let user = app.register_user("me@test.com", "meuser").await;

    let resp = app
        .auth_get("/api/auth/me", &user.access_token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["email"], "me@test.com");
    assert_eq!(json["username"], "meuser");
}

#[tokio::test]
async fn me_endpoint_rejects_invalid_token() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/auth/me"))
        .header("Authorization", "Bearer invalid-token-here")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);

    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
}
