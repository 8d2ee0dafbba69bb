use serde_json::Value;

use crate::fixtures::{seed::SeededUser, test_app::TestApp};

async fn create_post(app: &TestApp, author: &SeededUser, text: &str) -> Value {
    let resp = app
        .auth_post("/api/post", &author.access_token)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    resp.json().await.unwrap()
}

async fn react(app: &TestApp, user: &SeededUser, post_id: &str, kind: &str) -> Value {
    let resp = app
        .auth_post(&format!("/api/post/{post_id}/react"), &user.access_token)
        .json(&serde_json::json!({ "type": kind }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn feed_is_newest_first_with_authors_and_comments() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let first = create_post(&app, &alice, "first post").await;
    let second = create_post(&app, &bob, "second post").await;
    let first_id = first["id"].as_str().unwrap();

    for text in ["nice", "agreed"] {
        let resp = app
            .auth_post(&format!("/api/post/{first_id}/comment"), &bob.access_token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let comment: Value = resp.json().await.unwrap();
        assert_eq!(comment["author"]["name"], "Bob");
    }

    let feed: Vec<Value> = app
        .client
        .get(app.url("/api/post"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0]["id"], second["id"]);
    assert_eq!(feed[0]["author"]["name"], "Bob");
    assert_eq!(feed[1]["comment_count"], 2);
    assert_eq!(feed[1]["comments"][0]["text"], "agreed");
    assert_eq!(feed[1]["comments"][1]["text"], "nice");

    let comments: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/post/{first_id}/comment")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["text"], "agreed");
}

#[tokio::test]
async fn reactions_toggle_replace_and_stay_unique_per_user() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let post = create_post(&app, &alice, "react to me").await;
    let post_id = post["id"].as_str().unwrap();

    let json = react(&app, &bob, post_id, "like").await;
    assert_eq!(json["change"], "added");
    assert_eq!(json["post"]["reactions"].as_array().unwrap().len(), 1);

    let json = react(&app, &bob, post_id, "love").await;
    assert_eq!(json["change"], "replaced");
    let reactions = json["post"]["reactions"].as_array().unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0]["type"], "love");

    let json = react(&app, &alice, post_id, "laugh").await;
    assert_eq!(json["post"]["reactions"].as_array().unwrap().len(), 2);

    let json = react(&app, &bob, post_id, "love").await;
    assert_eq!(json["change"], "removed");
    let reactions = json["post"]["reactions"].as_array().unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0]["user_id"], alice.id.as_str());
}

#[tokio::test]
async fn concurrent_reactions_from_different_users_are_all_kept() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;
    let carol = app.seed_user("Carol").await;
    let post = create_post(&app, &alice, "popular").await;
    let post_id = post["id"].as_str().unwrap();

    tokio::join!(
        react(&app, &alice, post_id, "like"),
        react(&app, &bob, post_id, "sad"),
        react(&app, &carol, post_id, "love"),
    );

    let feed: Vec<Value> = app
        .client
        .get(app.url("/api/post"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed[0]["reactions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn reacting_without_retry_budget_still_writes_once() {
    let app = TestApp::spawn_with_settings(|s| s.room.max_cas_retries = 0).await;
    let alice = app.seed_user("Alice").await;
    let post = create_post(&app, &alice, "no retries").await;
    let post_id = post["id"].as_str().unwrap();

    let json = react(&app, &alice, post_id, "like").await;
    assert_eq!(json["change"], "added");
    assert_eq!(json["post"]["reactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_reaction_type_is_rejected() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let post = create_post(&app, &alice, "hello").await;

    let resp = app
        .auth_post(
            &format!("/api/post/{}/react", post["id"].as_str().unwrap()),
            &alice.access_token,
        )
        .json(&serde_json::json!({ "type": "angry" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_not_found() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;

    let resp = app
        .auth_post(
            &format!("/api/post/{}/comment", bson::oid::ObjectId::new().to_hex()),
            &alice.access_token,
        )
        .json(&serde_json::json!({ "text": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn post_text_is_validated() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;

    let resp = app
        .auth_post("/api/post", &alice.access_token)
        .json(&serde_json::json!({ "text": "x".repeat(2001) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}
