#![allow(clippy::unused_async, unused_must_use)]
//! Tests for the `/users` routes.

use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

fn alice_registration() -> serde_json::Value {
    json!({
        "name": "Alice",
        "username": "alice",
        "email": "alice@example.com",
        "password": "pw1",
    })
}

#[test_log::test(tokio::test)]
async fn registration_is_public_and_hides_the_hash() {
    let app = TestApp::new();

    let created = TestRequest::post("/users")
        .json(&alice_registration())
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED);
    assert!(created.json()["_id"].is_string());

    TestRequest::get("/users")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("alice@example.com")
        .assert_body_contains("createdAt")
        .assert_body_not_contains("password")
        .assert_body_not_contains("argon2")
        .assert_body_not_contains("role");

    app.login("alice", "pw1").await;
}

#[test_log::test(tokio::test)]
async fn registration_accepts_form_body() {
    let app = TestApp::new();

    TestRequest::post("/users")
        .form("name=Alice&username=alice&password=pw1")
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED);
}

#[test_log::test(tokio::test)]
async fn duplicate_username_conflicts() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;

    TestRequest::post("/users")
        .json(&alice_registration())
        .send(&app.service)
        .await
        .assert_status(StatusCode::CONFLICT)
        .assert_error("Username already taken");
}

#[test_log::test(tokio::test)]
async fn registration_requires_fields() {
    let app = TestApp::new();

    TestRequest::post("/users")
        .json(&json!({"name": "Alice"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn clients_cannot_grant_themselves_a_role() {
    let app = TestApp::new();
    let mut body = alice_registration();
    body["role"] = json!("admin");

    TestRequest::post("/users")
        .json(&body)
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED);

    let cookie = app.login("alice", "pw1").await;
    TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_body_contains("\"role\":\"member\"");
}

#[test_log::test(tokio::test)]
async fn detail_requires_a_session() {
    let app = TestApp::new();
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    let bob = app.seed_user("Bob", "bob", "pw2").await;

    TestRequest::get(&format!("/users/{alice}"))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error("Authentication required");

    let cookie = app.login("bob", "pw2").await;
    let detail = TestRequest::get(&format!("/users/{alice}"))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_not_contains("password")
        .json();
    assert_eq!(detail["_id"], json!(alice.to_string()));
    assert_eq!(detail["username"], json!("alice"));
    assert_ne!(detail["_id"], json!(bob.to_string()));
}

#[test_log::test(tokio::test)]
async fn malformed_or_missing_id_is_not_found() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;
    let cookie = app.login("alice", "pw1").await;

    TestRequest::get("/users/not-a-uuid")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error("User Not Found");
    TestRequest::get(&format!("/users/{}", uuid::Uuid::now_v7()))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Anonymous callers learn nothing about ids.
    TestRequest::get("/users/not-a-uuid")
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn members_may_only_modify_themselves() {
    let app = TestApp::new();
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    let bob = app.seed_user("Bob", "bob", "pw2").await;
    let cookie = app.login("alice", "pw1").await;

    TestRequest::patch(&format!("/users/{bob}"))
        .cookie(&cookie)
        .json(&json!({"name": "Mallory"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_error("Access denied");
    TestRequest::delete(&format!("/users/{bob}"))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let updated = TestRequest::patch(&format!("/users/{alice}"))
        .cookie(&cookie)
        .json(&json!({"name": "Alice Liddell"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(updated["name"], json!("Alice Liddell"));
    assert_eq!(updated["email"], json!("alice@example.com"));
}

#[test_log::test(tokio::test)]
async fn put_replaces_but_keeps_role() {
    let app = TestApp::new();
    app.seed_admin().await;
    let admin_cookie = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let root = app
        .services
        .users
        .find_by_username(ADMIN_USERNAME)
        .await
        .expect("lookup")
        .expect("admin exists")
        .id;

    let replaced = TestRequest::put(&format!("/users/{root}"))
        .cookie(&admin_cookie)
        .json(&json!({"name": "Super", "username": "super", "password": "newpw"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(replaced["username"], json!("super"));
    assert_eq!(replaced["email"], json!(""));

    let cookie = app.login("super", "newpw").await;
    TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_body_contains("\"role\":\"admin\"");
}

#[test_log::test(tokio::test)]
async fn put_requires_every_field() {
    let app = TestApp::new();
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    let cookie = app.login("alice", "pw1").await;

    TestRequest::put(&format!("/users/{alice}"))
        .cookie(&cookie)
        .json(&json!({"name": "Alice"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn renaming_onto_a_taken_username_conflicts() {
    let app = TestApp::new();
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    app.seed_user("Bob", "bob", "pw2").await;
    let cookie = app.login("alice", "pw1").await;

    TestRequest::patch(&format!("/users/{alice}"))
        .cookie(&cookie)
        .json(&json!({"username": "bob"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[test_log::test(tokio::test)]
async fn admin_may_delete_any_user() {
    let app = TestApp::new();
    app.seed_admin().await;
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    let cookie = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;

    TestRequest::delete(&format!("/users/{alice}"))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    TestRequest::delete(&format!("/users/{alice}"))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn cursor_and_stats() {
    let app = TestApp::new();

    let stats = TestRequest::get("/users/stats/summary")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(stats, json!({"totalUsers": 0, "avgNameLength": null}));

    app.seed_user("Al", "al", "pw").await;
    app.seed_user("Alice", "alice", "pw1").await;

    let cursor = TestRequest::get("/users/cursor/list")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_not_contains("username")
        .json();
    assert_eq!(cursor["count"], json!(2));
    let emails: Vec<&str> = cursor["users"]
        .as_array()
        .expect("users array")
        .iter()
        .filter_map(|user| user["email"].as_str())
        .collect();
    assert!(emails.contains(&"al@example.com"));
    assert!(emails.contains(&"alice@example.com"));

    let stats = TestRequest::get("/users/stats/summary")
        .send(&app.service)
        .await
        .json();
    assert_eq!(stats["totalUsers"], json!(2));
    assert_eq!(stats["avgNameLength"], json!(3.5));
}
