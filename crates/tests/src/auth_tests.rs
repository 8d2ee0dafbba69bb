use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn register_creates_user_and_returns_tokens() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "alice@test.com",
            "username": "alice",
            "display_name": "Alice",
            "password": "Password123!",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);
    assert!(resp.headers().get("set-cookie").is_some());

    let json: Value = resp.json().await.unwrap();
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["email"], "alice@test.com");
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["user"]["display_name"], "Alice");
}

#[tokio::test]
async fn register_duplicate_email_fails() {
    let app = TestApp::spawn().await;
    app.register_user("dup@test.com", "user1", "User 1", "Password123!")
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "dup@test.com",
            "username": "user2",
            "display_name": "User 2",
            "password": "Password123!",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "conflict");
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "not-an-email",
            "username": "carol",
            "display_name": "Carol",
            "password": "Password123!",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn register_duplicate_username_fails() {
    let app = TestApp::spawn().await;
    app.register_user("first@test.com", "taken", "First", "Password123!")
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "second@test.com",
            "username": "taken",
            "display_name": "Second",
            "password": "Password123!",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn login_by_username_or_email() {
    let app = TestApp::spawn().await;
    let user = app
        .register_user("erin@test.com", "erin", "Erin", "Password123!")
        .await;

    for credentials in [
        serde_json::json!({ "username": "erin", "password": "Password123!" }),
        serde_json::json!({ "email": "erin@test.com", "password": "Password123!" }),
    ] {
        let resp = app
            .client
            .post(app.url("/api/auth/login"))
            .json(&credentials)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["user"]["id"], user.id.as_str());
    }

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": "nobody", "password": "Password123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "password": "Password123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::spawn().await;
    app.register_user("dave@test.com", "dave", "Dave", "Password123!")
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({
            "email": "dave@test.com",
            "password": "wrong-password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = TestApp::spawn().await;

    let resp = reqwest::Client::new()
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn me_accepts_bearer_token_and_cookie() {
    let app = TestApp::spawn().await;
    let user = app
        .register_user("erin@test.com", "erin", "Erin", "Password123!")
        .await;

    let resp = app
        .auth_get("/api/auth/me", &user.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["id"], user.id.as_str());

    let resp = reqwest::Client::new()
        .get(app.url("/api/auth/me"))
        .header("Cookie", format!("theme=dark; access_token={}", user.access_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn refresh_issues_new_tokens_and_rejects_access_tokens() {
    let app = TestApp::spawn().await;
    let user = app
        .register_user("finn@test.com", "finn", "Finn", "Password123!")
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&serde_json::json!({ "refresh_token": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["user"]["id"], user.id.as_str());

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&serde_json::json!({ "refresh_token": user.access_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = TestApp::spawn().await;
    app.register_user("gail@test.com", "gail", "Gail", "Password123!")
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let cookie = resp.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("access_token=;"));
    assert!(cookie.contains("Max-Age=0"));
}
