use bson::doc;
use serde_json::Value;

use crate::fixtures::{seed::SeededUser, test_app::TestApp};

async fn upload_url(app: &TestApp, user: &SeededUser) -> String {
    let resp = app
        .auth_post("/api/user/upload-url", &user.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let url = json["upload_url"].as_str().unwrap().to_string();
    assert!(url.starts_with(&app.base_url));
    url
}

async fn upload(app: &TestApp, url: &str, bytes: &'static [u8]) -> reqwest::Response {
    app.client
        .post(url)
        .header("Content-Type", "image/png")
        .body(bytes)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn uploaded_bytes_are_served_back() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let url = upload_url(&app, &alice).await;

    let resp = upload(&app, &url, b"\x89PNG fake image").await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let storage_id = json["storage_id"].as_str().unwrap();

    let resp = app
        .client
        .get(app.url(&format!("/api/storage/{storage_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(&resp.bytes().await.unwrap()[..], b"\x89PNG fake image");
}

#[tokio::test]
async fn upload_urls_are_single_use() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let url = upload_url(&app, &alice).await;

    assert_eq!(upload(&app, &url, b"first").await.status().as_u16(), 200);
    assert_eq!(upload(&app, &url, b"second").await.status().as_u16(), 409);
}

#[tokio::test]
async fn expired_upload_urls_are_refused() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let url = upload_url(&app, &alice).await;

    let past = bson::DateTime::from_millis(bson::DateTime::now().timestamp_millis() - 60_000);
    app.db
        .collection::<bson::Document>("files")
        .update_many(doc! {}, doc! { "$set": { "upload_expires_at": past } })
        .await
        .unwrap();

    assert_eq!(upload(&app, &url, b"late").await.status().as_u16(), 403);
}

#[tokio::test]
async fn unknown_tokens_and_empty_bodies_are_rejected() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;

    let resp = upload(&app, &app.url("/api/storage/upload/nope"), b"data").await;
    assert_eq!(resp.status().as_u16(), 404);

    let url = upload_url(&app, &alice).await;
    assert_eq!(upload(&app, &url, b"").await.status().as_u16(), 400);
}

#[tokio::test]
async fn pending_files_are_not_served() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    upload_url(&app, &alice).await;

    let file = app
        .db
        .collection::<bson::Document>("files")
        .find_one(doc! {})
        .await
        .unwrap()
        .unwrap();
    let id = file.get_object_id("_id").unwrap().to_hex();

    let resp = app
        .client
        .get(app.url(&format!("/api/storage/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn profile_image_resolves_to_a_storage_url() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user("Alice").await;
    let url = upload_url(&app, &alice).await;
    let json: Value = upload(&app, &url, b"avatar").await.json().await.unwrap();
    let storage_id = json["storage_id"].as_str().unwrap();

    let profile: Value = app
        .auth_put("/api/user/profile", &alice.access_token)
        .json(&serde_json::json!({ "image_id": storage_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        profile["image_url"],
        format!("{}/api/storage/{storage_id}", app.base_url)
    );
}
