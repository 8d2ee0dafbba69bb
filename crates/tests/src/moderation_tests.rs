use bson::{DateTime, doc, oid::ObjectId};
use serde_json::Value;

use crate::fixtures::{seed::SeededUser, test_app::TestApp};

async fn moderate(
    app: &TestApp,
    actor: &SeededUser,
    room_id: &str,
    action: &str,
    body: Value,
) -> reqwest::Response {
    app.auth_post(&format!("/api/room/{room_id}/{action}"), &actor.access_token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn ban_frees_seat_blocks_until_expiry_then_allows_seating() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Lounge").await;

    assert_eq!(app.take_seat(&bob, &room_id, 3).await.status().as_u16(), 200);

    let resp = moderate(
        &app,
        &alice,
        &room_id,
        "ban",
        serde_json::json!({ "user_id": bob.id, "duration_minutes": 10 }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    let room = app.get_room(&room_id).await;
    assert!(room["seats"][3].is_null());
    assert_eq!(room["banned_users"][0]["user_id"], bob.id.as_str());

    let texts = app.chat_texts(&room_id).await;
    assert_eq!(
        texts,
        vec!["Bob has taken a seat.", "Bob has been banned for 10 minutes."]
    );

    let resp = app.take_seat(&bob, &room_id, 0).await;
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "banned");

    // Let the ban lapse
    app.db
        .collection::<bson::Document>("rooms")
        .update_one(
            doc! { "_id": ObjectId::parse_str(&room_id).unwrap() },
            doc! { "$set": { "banned_users.0.banned_until": DateTime::from_millis(DateTime::now().timestamp_millis() - 1000) } },
        )
        .await
        .unwrap();

    let resp = app.take_seat(&bob, &room_id, 0).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(app.get_room(&room_id).await["seats"][0], bob.id.as_str());
}

#[tokio::test]
async fn rebanning_replaces_the_existing_record() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Lounge").await;

    for minutes in [10, 60] {
        moderate(
            &app,
            &alice,
            &room_id,
            "ban",
            serde_json::json!({ "user_id": bob.id, "duration_minutes": minutes }),
        )
        .await;
    }

    let room = app.get_room(&room_id).await;
    assert_eq!(room["banned_users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn ban_rejects_zero_duration() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Lounge").await;

    let resp = moderate(
        &app,
        &alice,
        &room_id,
        "ban",
        serde_json::json!({ "user_id": bob.id, "duration_minutes": 0 }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn unban_lifts_the_ban() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Lounge").await;

    moderate(
        &app,
        &alice,
        &room_id,
        "ban",
        serde_json::json!({ "user_id": bob.id, "duration_minutes": 30 }),
    )
    .await;
    let resp = moderate(
        &app,
        &alice,
        &room_id,
        "unban",
        serde_json::json!({ "user_id": bob.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    assert_eq!(app.take_seat(&bob, &room_id, 1).await.status().as_u16(), 200);

    // Unbanning someone who is not banned is a no-op
    let resp = moderate(
        &app,
        &alice,
        &room_id,
        "unban",
        serde_json::json!({ "user_id": bob.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn only_the_owner_manages_admins() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let carol = app.seed_user("Carol").await;
    let room_id = app.create_room(&alice, "Lounge").await;

    let resp = moderate(
        &app,
        &bob,
        &room_id,
        "admin/appoint",
        serde_json::json!({ "user_id": carol.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    for _ in 0..2 {
        let resp = moderate(
            &app,
            &alice,
            &room_id,
            "admin/appoint",
            serde_json::json!({ "user_id": bob.id }),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 200);
    }
    let room = app.get_room(&room_id).await;
    assert_eq!(room["admins"], serde_json::json!([bob.id]));

    // Admins still cannot appoint admins
    let resp = moderate(
        &app,
        &bob,
        &room_id,
        "admin/appoint",
        serde_json::json!({ "user_id": carol.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = moderate(
        &app,
        &alice,
        &room_id,
        "admin/remove",
        serde_json::json!({ "user_id": bob.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(app.get_room(&room_id).await["admins"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn admins_can_kick_but_members_cannot() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let carol = app.seed_user("Carol").await;
    let room_id = app.create_room(&alice, "Lounge").await;
    app.take_seat(&carol, &room_id, 6).await;

    let resp = moderate(
        &app,
        &bob,
        &room_id,
        "kick",
        serde_json::json!({ "user_id": carol.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    moderate(
        &app,
        &alice,
        &room_id,
        "admin/appoint",
        serde_json::json!({ "user_id": bob.id }),
    )
    .await;
    let resp = moderate(
        &app,
        &bob,
        &room_id,
        "kick",
        serde_json::json!({ "user_id": carol.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    let room = app.get_room(&room_id).await;
    assert!(room["seats"][6].is_null());
    let texts = app.chat_texts(&room_id).await;
    assert_eq!(texts.last().unwrap(), "Carol has been kicked.");
}

#[tokio::test]
async fn kicking_an_unseated_user_posts_nothing() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Lounge").await;

    let resp = moderate(
        &app,
        &alice,
        &room_id,
        "kick",
        serde_json::json!({ "user_id": bob.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(app.chat_texts(&room_id).await.is_empty());
}

#[tokio::test]
async fn the_owner_cannot_be_kicked_or_banned() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let room_id = app.create_room(&alice, "Lounge").await;
    moderate(
        &app,
        &alice,
        &room_id,
        "admin/appoint",
        serde_json::json!({ "user_id": bob.id }),
    )
    .await;
    app.take_seat(&alice, &room_id, 0).await;

    let resp = moderate(
        &app,
        &bob,
        &room_id,
        "kick",
        serde_json::json!({ "user_id": alice.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = moderate(
        &app,
        &bob,
        &room_id,
        "ban",
        serde_json::json!({ "user_id": alice.id, "duration_minutes": 5 }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    let room = app.get_room(&room_id).await;
    assert_eq!(room["seats"][0], alice.id.as_str());
    assert!(room["banned_users"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn moderation_on_a_missing_room_is_not_found() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let resp = moderate(
        &app,
        &alice,
        &ObjectId::new().to_hex(),
        "kick",
        serde_json::json!({ "user_id": bob.id }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);
}
