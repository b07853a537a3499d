use serde_json::Value;

use crate::fixtures::test_app::TestApp;

async fn send_room_message(app: &TestApp, token: &str, room_id: &str, content: &str) -> Value {
    let resp = app
        .auth_post(&format!("/api/room-chats/{}/messages", room_id), token)
        .json(&serde_json::json!({ "content": content }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.status().as_u16(),
        201,
        "send room message failed: {}",
        resp.text().await.unwrap_or_default()
    );
    resp.json().await.unwrap()
}

async fn unread(app: &TestApp, token: &str, room_id: &str) -> u64 {
    let resp = app
        .auth_get(&format!("/api/room-chats/{}/unread", room_id), token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    json["unread"].as_u64().unwrap()
}

#[tokio::test]
async fn accepting_a_request_bootstraps_the_room_chat() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("bootstrap").await;

    let resp = app
        .auth_get(
            &format!("/api/room-chats/{}", seeded.room_id),
            &seeded.tenant.access_token,
        )
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let json: Value = resp.json().await.unwrap();
    let participants = json["data"]["participants"].as_array().unwrap();
    assert!(
        participants
            .iter()
            .any(|p| p.as_str() == Some(seeded.owner.id.as_str()))
    );
    assert!(
        participants
            .iter()
            .any(|p| p.as_str() == Some(seeded.tenant.id.as_str()))
    );
}

#[tokio::test]
async fn cursor_unread_counts_and_mark_read() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("cursor").await;

    send_room_message(&app, &seeded.owner.access_token, &seeded.room_id, "one").await;
    send_room_message(&app, &seeded.owner.access_token, &seeded.room_id, "two").await;
    send_room_message(&app, &seeded.owner.access_token, &seeded.room_id, "three").await;

    // Own messages never count.
    assert_eq!(unread(&app, &seeded.owner.access_token, &seeded.room_id).await, 0);
    assert_eq!(unread(&app, &seeded.tenant.access_token, &seeded.room_id).await, 3);

    let resp = app
        .auth_put(
            &format!("/api/room-chats/{}/read", seeded.room_id),
            &seeded.tenant.access_token,
        )
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    assert_eq!(unread(&app, &seeded.tenant.access_token, &seeded.room_id).await, 0);

    // New traffic moves past the cursor again.
    send_room_message(&app, &seeded.owner.access_token, &seeded.room_id, "four").await;
    assert_eq!(unread(&app, &seeded.tenant.access_token, &seeded.room_id).await, 1);
}

#[tokio::test]
async fn late_tenant_reads_full_history_via_live_membership() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("late").await;

    send_room_message(&app, &seeded.owner.access_token, &seeded.room_id, "early days").await;

    // A tenant accepted after the chat existed is absent from the stored
    // participant snapshot but still has full access.
    let late = app
        .register_user("late@late.test", "late_tenant", "Late Tenant", "Late123!")
        .await;
    app.accept_into_room(&seeded.room_id, &seeded.owner, &late)
        .await;

    let resp = app
        .auth_get(
            &format!("/api/room-chats/{}/messages", seeded.room_id),
            &late.access_token,
        )
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"].as_u64(), Some(1));
    assert_eq!(unread(&app, &late.access_token, &seeded.room_id).await, 1);
}

#[tokio::test]
async fn non_members_are_rejected() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("members").await;
    let stranger = app
        .register_user("mallory@members.test", "members_mallory", "Mallory", "Nope123!")
        .await;

    let resp = app
        .auth_get(
            &format!("/api/room-chats/{}", seeded.room_id),
            &stranger.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post(
            &format!("/api/room-chats/{}/messages", seeded.room_id),
            &stranger.access_token,
        )
        .json(&serde_json::json!({ "content": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn messages_of_an_unwritten_room_chat_are_an_empty_page() {
    let app = TestApp::spawn().await;
    let owner = app
        .register_user("solo@empty.test", "empty_solo", "Solo", "Solo123!")
        .await;
    let room_id = app.create_room(&owner, "quiet room").await;

    let resp = app
        .auth_get(
            &format!("/api/room-chats/{}/messages", room_id),
            &owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"].as_u64(), Some(0));
    assert_eq!(json["count"].as_u64(), Some(0));
}

#[tokio::test]
async fn room_messages_have_no_per_message_read_flag() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("noflag").await;

    send_room_message(&app, &seeded.owner.access_token, &seeded.room_id, "hi all").await;

    let resp = app
        .auth_get(
            &format!("/api/room-chats/{}/messages", seeded.room_id),
            &seeded.tenant.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let message = &json["data"][0];
    assert!(message.get("is_read").is_none());
    assert_eq!(message["content"].as_str(), Some("hi all"));
}
