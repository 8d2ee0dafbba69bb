use bson::oid::ObjectId;
use serde_json::Value;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn own_profile_is_null_until_completed() {
    let app = TestApp::spawn().await;
    let user = app
        .register_user("dora@voxroom.test", "dora", "Dora", "Password123!")
        .await;

    let resp = app
        .auth_get("/api/user/me/profile", &user.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json.is_null());

    let profile = app.complete_profile(&user, "Dora").await;
    assert_eq!(profile["name"], "Dora");
    assert_eq!(profile["coins"], 1000);
    assert_eq!(profile["level"], 1);
    assert_eq!(profile["is_vip"], false);
    assert_eq!(profile["email"], "dora@voxroom.test");

    let display_id = profile["display_id"].as_str().unwrap();
    assert_eq!(display_id.len(), 6);
    assert!(
        display_id
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    );
}

#[tokio::test]
async fn completing_twice_is_a_conflict() {
    let app = TestApp::spawn().await;
    let user = app.seed_user("Alice").await;

    let resp = app
        .auth_post("/api/user/profile", &user.access_token)
        .json(&serde_json::json!({
            "name": "Alice Again",
            "gender": "female",
            "birth_date": "1995-04-12",
            "country": "AT",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn renaming_the_profile_renames_the_account() {
    let app = TestApp::spawn().await;
    let user = app.seed_user("Alice").await;

    let resp = app
        .auth_put("/api/user/profile", &user.access_token)
        .json(&serde_json::json!({ "name": "  Alicia ", "country": "DE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let profile: Value = resp.json().await.unwrap();
    assert_eq!(profile["name"], "Alicia");
    assert_eq!(profile["country"], "DE");
    assert_eq!(profile["gender"], "female");

    let me: Value = app
        .auth_get("/api/auth/me", &user.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["display_name"], "Alicia");
}

#[tokio::test]
async fn update_rejects_a_malformed_frame_url() {
    let app = TestApp::spawn().await;
    let user = app.seed_user("Alice").await;

    let resp = app
        .auth_put("/api/user/profile", &user.access_token)
        .json(&serde_json::json!({ "frame_url": "not a url" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn updating_before_completion_is_not_found() {
    let app = TestApp::spawn().await;
    let user = app
        .register_user("eve@voxroom.test", "eve", "Eve", "Password123!")
        .await;

    let resp = app
        .auth_put("/api/user/profile", &user.access_token)
        .json(&serde_json::json!({ "country": "FR" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn follow_is_idempotent_and_reflected_on_page_and_popup() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let bob = app.seed_user("Bob").await;

    let path = format!("/api/user/{}/follow", bob.id);
    let first: Value = app
        .auth_post(&path, &alice.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["following"], true);
    assert_eq!(first["changed"], true);

    let second: Value = app
        .auth_post(&path, &alice.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["changed"], false);

    let page: Value = app
        .auth_get(&format!("/api/user/{}/page", bob.id), &alice.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["followers"], 1);
    assert_eq!(page["following"], 0);
    assert_eq!(page["is_following"], true);
    assert_eq!(page["profile"]["name"], "Bob");

    let popup: Value = app
        .auth_get(&format!("/api/user/{}/popup", bob.id), &alice.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(popup["is_following"], true);
    assert_eq!(popup["name"], "Bob");

    let anonymous: Value = reqwest::Client::new()
        .get(app.url(&format!("/api/user/{}/popup", bob.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(anonymous["is_following"], false);

    let unfollow: Value = app
        .auth_post(&format!("/api/user/{}/unfollow", bob.id), &alice.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unfollow["following"], false);
    assert_eq!(unfollow["changed"], true);

    let page: Value = app
        .auth_get(&format!("/api/user/{}/page", bob.id), &alice.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["followers"], 0);
    assert_eq!(page["is_following"], false);
}

#[tokio::test]
async fn page_lists_the_users_posts() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;

    for text in ["one", "two"] {
        app.auth_post("/api/post", &alice.access_token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .unwrap();
    }

    let page: Value = reqwest::Client::new()
        .get(app.url(&format!("/api/user/{}/page", alice.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let posts = page["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["text"], "two");
}

#[tokio::test]
async fn following_yourself_or_nobody_fails() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;

    let resp = app
        .auth_post(&format!("/api/user/{}/follow", alice.id), &alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post(
            &format!("/api/user/{}/follow", ObjectId::new().to_hex()),
            &alice.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn unknown_users_have_null_profiles() {
    let app = TestApp::spawn().await;
    let missing = ObjectId::new().to_hex();

    for path in ["profile", "page", "popup"] {
        let resp = app
            .client
            .get(app.url(&format!("/api/user/{missing}/{path}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "{path}");
        let json: Value = resp.json().await.unwrap();
        assert!(json.is_null(), "{path}");
    }
}

#[tokio::test]
async fn own_profile_is_null_for_anonymous_callers() {
    let app = TestApp::spawn().await;

    let resp = reqwest::Client::new()
        .get(app.url("/api/user/me/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json.is_null());
}
