use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

use crate::fixtures::{seed::SeededUser, test_app::TestApp};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(app: &TestApp, user: &SeededUser) -> Socket {
    let (mut ws, _) = tokio_tungstenite::connect_async(app.ws_url(&user.access_token))
        .await
        .expect("WS connect failed");
    let hello = next_event(&mut ws, "connected").await;
    assert_eq!(hello["user_id"], user.id.as_str());
    ws
}

async fn send(ws: &mut Socket, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Reads until an event of type `kind` arrives, skipping anything else.
async fn next_event(ws: &mut Socket, kind: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = ws.next().await.expect("socket closed").unwrap();
            if !msg.is_text() {
                continue;
            }
            let parsed: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
            if parsed["type"] == kind {
                return parsed;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Timeout waiting for {kind}"))
}

/// Collects every event that arrives within `window`.
async fn drain(ws: &mut Socket, window: Duration) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(Some(Ok(msg))) = tokio::time::timeout(window, ws.next()).await {
        if let Ok(text) = msg.to_text() {
            if let Ok(parsed) = serde_json::from_str(text) {
                events.push(parsed);
            }
        }
    }
    events
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let app = TestApp::spawn().await;
    let result = tokio_tungstenite::connect_async(app.ws_url("not-a-token")).await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(resp)) => {
            assert_eq!(resp.status().as_u16(), 401);
        }
        Err(e) => panic!("expected HTTP rejection, got {e}"),
        Ok(_) => panic!("connection with an invalid token was accepted"),
    }
}

#[tokio::test]
async fn ping_gets_pong() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let mut ws = connect(&app, &alice).await;

    send(&mut ws, serde_json::json!({ "type": "ping" })).await;
    next_event(&mut ws, "pong").await;
}

#[tokio::test]
async fn subscribing_to_a_missing_room_reports_an_error() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let mut ws = connect(&app, &alice).await;

    send(
        &mut ws,
        serde_json::json!({
            "type": "room:subscribe",
            "room_id": bson::oid::ObjectId::new().to_hex(),
        }),
    )
    .await;
    let err = next_event(&mut ws, "error").await;
    assert!(err["message"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn room_subscribers_see_seat_changes_and_chat() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Live").await;

    let mut ws = connect(&app, &alice).await;
    send(
        &mut ws,
        serde_json::json!({ "type": "room:subscribe", "room_id": room_id }),
    )
    .await;
    let ack = next_event(&mut ws, "room:subscribed").await;
    assert_eq!(ack["room_id"], room_id.as_str());

    assert_eq!(app.take_seat(&bob, &room_id, 2).await.status().as_u16(), 200);

    let update = next_event(&mut ws, "room:update").await;
    assert_eq!(update["data"]["id"], room_id.as_str());
    assert_eq!(update["data"]["seats"][2], bob.id.as_str());

    let chat = next_event(&mut ws, "chat:message").await;
    assert_eq!(chat["data"]["text"], "Bob has taken a seat.");

    send(
        &mut ws,
        serde_json::json!({ "type": "room:unsubscribe", "room_id": room_id }),
    )
    .await;
    // Give the unsubscribe a moment to land before the next mutation
    send(&mut ws, serde_json::json!({ "type": "ping" })).await;
    next_event(&mut ws, "pong").await;

    app.auth_post(&format!("/api/room/{room_id}/seat/leave"), &bob.access_token)
        .send()
        .await
        .unwrap();
    let events = drain(&mut ws, Duration::from_millis(500)).await;
    assert!(events.iter().all(|e| e["type"] != "room:update"));
}

#[tokio::test]
async fn private_messages_reach_both_participants() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let carol = app.seed_user("Carol").await;

    let mut ws_bob = connect(&app, &bob).await;
    let mut ws_carol = connect(&app, &carol).await;

    let conversation: Value = app
        .auth_post("/api/conversation", &alice.access_token)
        .json(&serde_json::json!({ "participant_id": bob.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let conversation_id = conversation["id"].as_str().unwrap();

    let resp = app
        .auth_post(
            &format!("/api/conversation/{conversation_id}/message"),
            &alice.access_token,
        )
        .json(&serde_json::json!({ "text": "hey Bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let event = next_event(&mut ws_bob, "message:create").await;
    assert_eq!(event["data"]["text"], "hey Bob");
    assert_eq!(event["data"]["conversation_id"], conversation_id);

    let events = drain(&mut ws_carol, Duration::from_millis(500)).await;
    assert!(events.iter().all(|e| e["type"] != "message:create"));
}

#[tokio::test]
async fn gift_announcements_reach_every_connection() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Party").await;

    let mut ws_bob = connect(&app, &bob).await;

    let gifts: Vec<Value> = app
        .client
        .get(app.url("/api/gift"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let cheapest = &gifts[0];

    let resp = app
        .auth_post(&format!("/api/room/{room_id}/chat/gift"), &alice.access_token)
        .json(&serde_json::json!({
            "gift_id": cheapest["id"],
            "recipient_id": bob.id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let event = next_event(&mut ws_bob, "announcement:create").await;
    assert_eq!(event["data"]["sender_name"], "Alice");
    assert_eq!(event["data"]["recipient_name"], "Bob");
}
