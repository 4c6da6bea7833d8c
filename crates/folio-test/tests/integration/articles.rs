#![allow(clippy::unused_async, unused_must_use)]
//! Tests for the `/articles` routes and their ownership rules.

use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

/// Alice and Bob with a session each.
async fn two_members(app: &TestApp) -> (String, String) {
    app.seed_user("Alice", "alice", "pw1").await;
    app.seed_user("Bob", "bob", "pw2").await;
    (
        app.login("alice", "pw1").await,
        app.login("bob", "pw2").await,
    )
}

#[test_log::test(tokio::test)]
async fn anonymous_cannot_create() {
    let app = TestApp::new();

    TestRequest::post("/articles")
        .json(&json!({"title": "Hello"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error("Authentication required");
}

#[test_log::test(tokio::test)]
async fn create_records_owner_and_default_author() {
    let app = TestApp::new();
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    let cookie = app.login("alice", "pw1").await;

    let id = app.create_article(&cookie, "Hello").await;

    let detail = TestRequest::get(&format!("/articles/{id}"))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(detail["title"], json!("Hello"));
    assert_eq!(detail["author"], json!("alice"));
    assert_eq!(detail["content"], json!("Hello body"));
    assert_eq!(detail["ownerId"], json!(alice.to_string()));
    assert!(detail["createdAt"].is_string());
}

#[test_log::test(tokio::test)]
async fn create_requires_a_title() {
    let app = TestApp::new();
    let (alice, _) = two_members(&app).await;

    TestRequest::post("/articles")
        .cookie(&alice)
        .json(&json!({"content": "untitled"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn list_is_public_and_omits_content() {
    let app = TestApp::new();
    let (alice, _) = two_members(&app).await;
    app.create_article(&alice, "Hello").await;

    let list = TestRequest::get("/articles")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_not_contains("content")
        .assert_body_not_contains("ownerId")
        .json();
    assert_eq!(list[0]["title"], json!("Hello"));
    assert_eq!(list[0]["author"], json!("alice"));
}

#[test_log::test(tokio::test)]
async fn detail_requires_a_session() {
    let app = TestApp::new();
    let (alice, bob) = two_members(&app).await;
    let id = app.create_article(&alice, "Hello").await;

    TestRequest::get(&format!("/articles/{id}"))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    TestRequest::get(&format!("/articles/{id}"))
        .cookie(&bob)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn non_owner_cannot_modify() {
    let app = TestApp::new();
    let (alice, bob) = two_members(&app).await;
    let id = app.create_article(&alice, "Hello").await;
    let path = format!("/articles/{id}");

    TestRequest::put(&path)
        .cookie(&bob)
        .json(&json!({"title": "Hijacked"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_error("Access denied");
    TestRequest::patch(&path)
        .cookie(&bob)
        .json(&json!({"title": "Hijacked"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    TestRequest::delete(&path)
        .cookie(&bob)
        .send(&app.service)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::get(&path)
        .cookie(&alice)
        .send(&app.service)
        .await
        .assert_body_contains("\"title\":\"Hello\"");
}

#[test_log::test(tokio::test)]
async fn owner_replace_keeps_owner() {
    let app = TestApp::new();
    let (alice, bob) = two_members(&app).await;
    let bob_id = app
        .services
        .users
        .find_by_username("bob")
        .await
        .expect("lookup")
        .expect("bob exists")
        .id;
    let id = app.create_article(&alice, "Hello").await;

    let replaced = TestRequest::put(&format!("/articles/{id}"))
        .cookie(&alice)
        .json(&json!({
            "title": "Goodbye",
            "content": "Rewritten",
            "ownerId": bob_id.to_string(),
        }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(replaced["title"], json!("Goodbye"));
    assert_eq!(replaced["author"], json!("alice"));
    assert_ne!(replaced["ownerId"], json!(bob_id.to_string()));

    // Still Alice's: Bob remains locked out.
    TestRequest::delete(&format!("/articles/{id}"))
        .cookie(&bob)
        .send(&app.service)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn owner_patch_and_delete() {
    let app = TestApp::new();
    let (alice, _) = two_members(&app).await;
    let id = app.create_article(&alice, "Hello").await;
    let path = format!("/articles/{id}");

    let patched = TestRequest::patch(&path)
        .cookie(&alice)
        .json(&json!({"content": "Updated"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(patched["title"], json!("Hello"));
    assert_eq!(patched["content"], json!("Updated"));

    TestRequest::delete(&path)
        .cookie(&alice)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    TestRequest::get(&path)
        .cookie(&alice)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error("Article Not Found");
}

#[test_log::test(tokio::test)]
async fn admin_may_modify_any_article() {
    let app = TestApp::new();
    let (alice, _) = two_members(&app).await;
    app.seed_admin().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let id = app.create_article(&alice, "Hello").await;
    let path = format!("/articles/{id}");

    TestRequest::patch(&path)
        .cookie(&admin)
        .json(&json!({"title": "Moderated"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);
    TestRequest::delete(&path)
        .cookie(&admin)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[test_log::test(tokio::test)]
async fn mutating_a_missing_article_is_not_found() {
    let app = TestApp::new();
    let (alice, _) = two_members(&app).await;
    let missing = uuid::Uuid::now_v7();

    TestRequest::put(&format!("/articles/{missing}"))
        .cookie(&alice)
        .json(&json!({"title": "Ghost"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    TestRequest::delete("/articles/not-a-uuid")
        .cookie(&alice)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn cursor_and_stats() {
    let app = TestApp::new();
    let (alice, bob) = two_members(&app).await;
    app.create_article(&alice, "One").await;
    app.create_article(&alice, "Three").await;
    app.create_article(&bob, "Four").await;

    let cursor = TestRequest::get("/articles/cursor/list")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_not_contains("content")
        .json();
    assert_eq!(cursor["count"], json!(3));
    assert_eq!(cursor["articles"].as_array().map(Vec::len), Some(3));

    let stats = TestRequest::get("/articles/stats/summary")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(
        stats,
        json!([
            {"_id": "alice", "totalArticles": 2, "avgTitleLength": 4.0},
            {"_id": "bob", "totalArticles": 1, "avgTitleLength": 4.0},
        ])
    );
}
