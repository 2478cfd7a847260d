use std::sync::Arc;

use invitely_services::{
    InvitationEvent, PerformanceCalculator, StatsSnapshot, performance::PerformanceFn,
};
use serde_json::Value;

use crate::fixtures::{
    seed::{PASSWORD, SeededUser},
    test_app::TestApp,
};

/// Has `sender` invite `count` addresses and registers each invitee.
async fn convert(app: &TestApp, sender: &SeededUser, count: usize) {
    for i in 0..count {
        let email = format!("{}_friend{i}@test.com", sender.username);
        let invitation = app.invite(sender, &email).await;
        let resp = app
            .client
            .post(app.url(&format!(
                "/api/invitation/key/{}/register",
                invitation["key"].as_str().unwrap()
            )))
            .json(&serde_json::json!({
                "username": format!("{}_friend{i}", sender.username),
                "display_name": "Friend",
                "password": PASSWORD,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
    }
}

#[tokio::test]
async fn reward_requires_staff() {
    let app = TestApp::spawn().await;
    let user = app.register_user("user@test.com", "user").await;

    let resp = app
        .auth_post("/api/invitation/reward", &user.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn reward_credits_only_performers() {
    let app = TestApp::spawn_invite_only().await;
    let staff = app.seed_user("staff@test.com", "staff", true).await;
    let good = app.seed_user("good@test.com", "good", false).await;
    let idle = app.seed_user("idle@test.com", "idle", false).await;
    // 10 sent, 10 accepted, nothing left: score 1.0
    convert(&app, &good, 10).await;

    let resp = app
        .auth_post("/api/invitation/reward", &staff.access_token)
        .json(&serde_json::json!({ "bonus": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["rewarded_users"], 1);
    assert_eq!(json["invitations_given"], 10);
    assert_eq!(json["message"], "1 users are given a total of 10 invitations.");

    assert_eq!(app.stats(&good).await["available"], 10);
    assert_eq!(app.stats(&idle).await["available"], 10);
}

#[tokio::test]
async fn reward_without_performers_gives_nothing() {
    let app = TestApp::spawn().await;
    let staff = app.seed_user("staff@test.com", "staff", true).await;
    let user = app.register_user("user@test.com", "user").await;
    app.invite(&user, "never@test.com").await;

    let resp = app
        .auth_post("/api/invitation/reward", &staff.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["rewarded_users"], 0);
    assert_eq!(
        json["message"],
        "No user has performance above threshold, no invitations awarded."
    );
    assert_eq!(app.stats(&user).await["available"], 10);
}

#[tokio::test]
async fn reward_single_user_uses_default_bonus() {
    let app = TestApp::spawn().await;
    let staff = app.seed_user("staff@test.com", "staff", true).await;
    let first = app.register_user("first@test.com", "first").await;
    let second = app.register_user("second@test.com", "second").await;
    convert(&app, &first, 1).await;
    convert(&app, &second, 1).await;

    let resp = app
        .auth_post("/api/invitation/reward", &staff.access_token)
        .json(&serde_json::json!({ "user_id": first.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let initial = app.settings.invitation.initial_invitations;
    assert_eq!(app.stats(&first).await["available"], initial * 2);
    assert_eq!(app.stats(&second).await["available"], initial);
}

#[tokio::test]
async fn give_adds_fixed_amount() {
    let app = TestApp::spawn().await;
    let staff = app.seed_user("staff@test.com", "staff", true).await;
    let user = app.register_user("user@test.com", "user").await;

    let resp = app
        .auth_post("/api/invitation/give", &staff.access_token)
        .json(&serde_json::json!({ "user_id": user.id, "count": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["rewarded_users"], 1);
    assert_eq!(json["invitations_given"], 3);
    assert_eq!(app.stats(&user).await["available"], 13);
}

#[tokio::test]
async fn give_rejects_bad_input() {
    let app = TestApp::spawn().await;
    let staff = app.seed_user("staff@test.com", "staff", true).await;

    let resp = app
        .auth_post("/api/invitation/give", &staff.access_token)
        .json(&serde_json::json!({ "count": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post("/api/invitation/give", &staff.access_token)
        .json(&serde_json::json!({ "user_id": "not-an-id", "count": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn reward_uses_custom_score_and_publishes_credit() {
    let busy: PerformanceFn =
        Arc::new(|stats: &StatsSnapshot| if stats.sent >= 2 { 1.0 } else { 0.0 });
    let performance = PerformanceCalculator::new(false).with_override(busy);
    let app = TestApp::spawn_with_performance(performance).await;
    let staff = app.seed_user("staff@test.com", "staff", true).await;
    let busy_user = app.register_user("busy@test.com", "busy").await;
    let idle = app.register_user("idle@test.com", "idle").await;
    app.invite(&busy_user, "a@test.com").await;
    app.invite(&busy_user, "b@test.com").await;
    app.invite(&idle, "c@test.com").await;

    let mut events = app.state.events.subscribe();
    let resp = app
        .auth_post("/api/invitation/reward", &staff.access_token)
        .json(&serde_json::json!({ "bonus": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["rewarded_users"], 1);

    assert_eq!(app.stats(&busy_user).await["available"], 15);
    assert_eq!(app.stats(&idle).await["available"], 10);
    assert_eq!(
        events.try_recv().unwrap(),
        InvitationEvent::InvitationAdded {
            user_id: busy_user.object_id(),
            count: 5,
        }
    );
    assert!(events.try_recv().is_err());
}
