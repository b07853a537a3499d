use serde_json::Value;

use crate::fixtures::test_app::TestApp;

async fn create_chat(app: &TestApp, token: &str, room_id: &str, participant_id: &str) -> Value {
    let resp = app
        .auth_post("/api/chats", token)
        .json(&serde_json::json!({
            "room_id": room_id,
            "participant_id": participant_id,
        }))
        .send()
        .await
        .unwrap();
    assert!(
        resp.status().is_success(),
        "create chat failed: {}",
        resp.text().await.unwrap_or_default()
    );
    resp.json().await.unwrap()
}

async fn send_message(app: &TestApp, token: &str, chat_id: &str, content: &str) -> Value {
    let resp = app
        .auth_post(&format!("/api/chats/{}/messages", chat_id), token)
        .json(&serde_json::json!({ "content": content }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.status().as_u16(),
        201,
        "send message failed: {}",
        resp.text().await.unwrap_or_default()
    );
    resp.json().await.unwrap()
}

#[tokio::test]
async fn same_pair_and_room_resolve_to_one_chat() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("dedupe").await;

    let first = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    // Reversed initiator and counterpart must land on the same document.
    let second = create_chat(
        &app,
        &seeded.tenant.access_token,
        &seeded.room_id,
        &seeded.owner.id,
    )
    .await;

    assert_eq!(first["data"]["id"], second["data"]["id"]);
}

#[tokio::test]
async fn same_pair_gets_a_separate_chat_per_room() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("perroom").await;
    let other_room = app.create_room(&seeded.owner, "second room").await;

    let first = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    let second = create_chat(
        &app,
        &seeded.owner.access_token,
        &other_room,
        &seeded.tenant.id,
    )
    .await;

    assert_ne!(first["data"]["id"], second["data"]["id"]);
}

#[tokio::test]
async fn concurrent_creates_converge_on_one_chat() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("race").await;

    let a = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    );
    let b = create_chat(
        &app,
        &seeded.tenant.access_token,
        &seeded.room_id,
        &seeded.owner.id,
    );
    let (first, second) = tokio::join!(a, b);

    assert_eq!(first["data"]["id"], second["data"]["id"]);
}

#[tokio::test]
async fn chat_with_yourself_is_rejected() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("selfchat").await;

    let resp = app
        .auth_post("/api/chats", &seeded.owner.access_token)
        .json(&serde_json::json!({
            "room_id": seeded.room_id,
            "participant_id": seeded.owner.id,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn create_chat_requires_both_ids() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("missing").await;

    let resp = app
        .auth_post("/api/chats", &seeded.owner.access_token)
        .json(&serde_json::json!({ "room_id": seeded.room_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn create_chat_with_unknown_room_is_404() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("noroom").await;

    let resp = app
        .auth_post("/api/chats", &seeded.owner.access_token)
        .json(&serde_json::json!({
            "room_id": bson::oid::ObjectId::new().to_hex(),
            "participant_id": seeded.tenant.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn unread_counts_and_implicit_read_on_fetch() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("unread").await;

    let chat = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    send_message(&app, &seeded.owner.access_token, &chat_id, "hello").await;
    send_message(&app, &seeded.owner.access_token, &chat_id, "are you there?").await;

    // Recipient sees two unread; the sender sees none.
    let resp = app
        .auth_get("/api/chats", &seeded.tenant.access_token)
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["data"][0]["unread_count"].as_u64(), Some(2));

    let resp = app
        .auth_get("/api/chats", &seeded.owner.access_token)
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["data"][0]["unread_count"].as_u64(), Some(0));

    // Fetching the chat marks it read for the fetcher.
    let resp = app
        .auth_get(&format!("/api/chats/{}", chat_id), &seeded.tenant.access_token)
        .send()
        .await
        .unwrap();
    let fetched: Value = resp.json().await.unwrap();
    for message in fetched["data"]["messages"].as_array().unwrap() {
        assert_eq!(message["is_read"].as_bool(), Some(true));
    }

    let resp = app
        .auth_get("/api/chats", &seeded.tenant.access_token)
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["data"][0]["unread_count"].as_u64(), Some(0));
}

#[tokio::test]
async fn sending_resets_read_receipts_to_the_sender() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("receipts").await;

    let chat = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    send_message(&app, &seeded.owner.access_token, &chat_id, "ping").await;

    let resp = app
        .auth_get(&format!("/api/chats/{}", chat_id), &seeded.owner.access_token)
        .send()
        .await
        .unwrap();
    let fetched: Value = resp.json().await.unwrap();
    let read_by = fetched["data"]["read_by"].as_array().unwrap();
    // Only the sender's receipt survives a send.
    assert!(
        read_by
            .iter()
            .any(|r| r["user_id"].as_str() == Some(seeded.owner.id.as_str()))
    );
    assert!(
        !read_by
            .iter()
            .any(|r| r["user_id"].as_str() == Some(seeded.tenant.id.as_str()))
    );
}

#[tokio::test]
async fn pagination_walks_from_newest_to_oldest() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("pages").await;

    let chat = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    for i in 1..=12 {
        send_message(&app, &seeded.owner.access_token, &chat_id, &format!("msg {i}")).await;
    }

    // Page 1: the newest five, oldest-first within the page.
    let resp = app
        .auth_get(
            &format!("/api/chats/{}/messages?page=1&limit=5", chat_id),
            &seeded.tenant.access_token,
        )
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"].as_u64(), Some(12));
    assert_eq!(page["count"].as_u64(), Some(5));
    let contents: Vec<&str> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["msg 8", "msg 9", "msg 10", "msg 11", "msg 12"]);
    assert!(page["pagination"]["next"].is_object());
    assert!(page["pagination"]["prev"].is_null());

    // Page 3: the oldest two remain.
    let resp = app
        .auth_get(
            &format!("/api/chats/{}/messages?page=3&limit=5", chat_id),
            &seeded.tenant.access_token,
        )
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["count"].as_u64(), Some(2));
    let contents: Vec<&str> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["msg 1", "msg 2"]);
    assert!(page["pagination"]["next"].is_null());
    assert!(page["pagination"]["prev"].is_object());
}

#[tokio::test]
async fn message_validation_rejects_empty_and_oversized() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("validate").await;

    let chat = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .auth_post(&format!("/api/chats/{}/messages", chat_id), &seeded.owner.access_token)
        .json(&serde_json::json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post(&format!("/api/chats/{}/messages", chat_id), &seeded.owner.access_token)
        .json(&serde_json::json!({ "content": "x".repeat(1001) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // A file-only message is fine.
    let resp = app
        .auth_post(&format!("/api/chats/{}/messages", chat_id), &seeded.owner.access_token)
        .json(&serde_json::json!({
            "content": "",
            "message_type": "image",
            "file_url": "https://cdn.example.test/pic.png",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn outsiders_cannot_touch_a_chat() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("outsider").await;
    let stranger = app
        .register_user("eve@outsider.test", "outsider_eve", "Eve", "Sneaky123!")
        .await;

    let chat = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .auth_get(&format!("/api/chats/{}", chat_id), &stranger.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post(&format!("/api/chats/{}/messages", chat_id), &stranger.access_token)
        .json(&serde_json::json!({ "content": "let me in" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn unknown_and_malformed_chat_ids() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("badid").await;

    let resp = app
        .auth_get(
            &format!("/api/chats/{}", bson::oid::ObjectId::new().to_hex()),
            &seeded.owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_get("/api/chats/not-an-id", &seeded.owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn deleted_chat_disappears_and_a_fresh_one_replaces_it() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("softdelete").await;

    let chat = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .auth_delete(&format!("/api/chats/{}", chat_id), &seeded.owner.access_token)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = app
        .auth_get("/api/chats", &seeded.owner.access_token)
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["count"].as_u64(), Some(0));

    // Re-opening the pair creates a new document, not the dead one.
    let replacement = create_chat(
        &app,
        &seeded.owner.access_token,
        &seeded.room_id,
        &seeded.tenant.id,
    )
    .await;
    assert_ne!(replacement["data"]["id"].as_str(), Some(chat_id.as_str()));
}
