#![allow(clippy::unused_async, unused_must_use)]
//! Tests for login, logout, and session handling.

use salvo::http::StatusCode;
use serde_json::json;

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn healthcheck_is_public() {
    let app = TestApp::new();

    TestRequest::get("/healthcheck")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("OK");
}

/// ## Summary
/// `alice` / `pw1` logs in, gets an `HttpOnly` session cookie, and is known to
/// `/whoami` without her password hash.
#[test_log::test(tokio::test)]
async fn login_sets_session_cookie() {
    let app = TestApp::new();
    let id = app.seed_user("Alice", "alice", "pw1").await;

    let response = TestRequest::post("/login")
        .json(&json!({"username": "alice", "password": "pw1"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_not_contains("password")
        .assert_body_not_contains("argon2");

    let body = response.json();
    assert_eq!(body["user"]["id"], json!(id.to_string()));
    assert_eq!(body["user"]["role"], json!("member"));

    let cookies = response.set_cookies("folio.sid");
    assert!(!cookies.is_empty(), "session cookie expected");
    assert!(
        cookies.iter().all(|c| c.contains("HttpOnly") && c.contains("Path=/")),
        "cookies: {cookies:?}"
    );

    let cookie = format!(
        "folio.sid={}",
        response.cookie_value("folio.sid").expect("session cookie")
    );
    TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("\"username\":\"alice\"")
        .assert_body_not_contains("password");
}

#[test_log::test(tokio::test)]
async fn login_accepts_form_body() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;

    let response = TestRequest::post("/login")
        .form("username=alice&password=pw1")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);

    assert!(response.cookie_value("folio.sid").is_some());
}

#[test_log::test(tokio::test)]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;

    let wrong_password = TestRequest::post("/login")
        .json(&json!({"username": "alice", "password": "wrong"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error("Invalid credentials");
    let unknown_user = TestRequest::post("/login")
        .json(&json!({"username": "ghost", "password": "x"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password.body, unknown_user.body);
    assert!(wrong_password.set_cookies("folio.sid").is_empty());
}

#[test_log::test(tokio::test)]
async fn login_with_unparsable_body_is_a_bad_request() {
    let app = TestApp::new();

    TestRequest::post("/login")
        .content_type("text/plain")
        .body("alice:pw1")
        .send(&app.service)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn anonymous_whoami() {
    let app = TestApp::new();

    TestRequest::get("/whoami")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("anonymous");

    TestRequest::get("/whoami")
        .cookie("folio.sid=not-a-session")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("anonymous");
}

#[test_log::test(tokio::test)]
async fn restored_session_reissues_cookie() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;
    let cookie = app.login("alice", "pw1").await;
    let session_id = cookie.trim_start_matches("folio.sid=");

    let response = TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("alice");

    assert_eq!(response.cookie_value("folio.sid").as_deref(), Some(session_id));
    let reissued = response.set_cookies("folio.sid");
    assert!(
        reissued
            .iter()
            .any(|c| c.contains("Max-Age=3600") && c.contains("HttpOnly")),
        "cookies: {reissued:?}"
    );
}

#[test_log::test(tokio::test)]
async fn unknown_or_ended_session_gets_no_cookie() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;

    let response = TestRequest::get("/whoami")
        .cookie("folio.sid=not-a-session")
        .send(&app.service)
        .await
        .assert_body_contains("anonymous");
    assert!(response.set_cookies("folio.sid").is_empty());

    let cookie = app.login("alice", "pw1").await;
    TestRequest::post("/logout")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let response = TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_body_contains("anonymous");
    assert!(response.set_cookies("folio.sid").is_empty());
}

#[test_log::test(tokio::test)]
async fn logout_ends_session_and_clears_cookie() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;
    let cookie = app.login("alice", "pw1").await;

    let response = TestRequest::post("/logout")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(response.cookie_value("folio.sid").as_deref(), Some(""));
    let cleared = response.set_cookies("folio.sid");
    assert!(
        cleared.iter().any(|c| c.contains("Max-Age=0")),
        "cookie should expire: {cleared:?}"
    );

    // Replaying the old cookie no longer works.
    TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_body_contains("anonymous");
}

#[test_log::test(tokio::test)]
async fn logout_without_session_still_succeeds() {
    let app = TestApp::new();

    TestRequest::get("/logout")
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[test_log::test(tokio::test)]
async fn relogin_revokes_presented_session() {
    let app = TestApp::new();
    app.seed_user("Alice", "alice", "pw1").await;
    let first = app.login("alice", "pw1").await;

    let response = TestRequest::post("/login")
        .cookie(&first)
        .json(&json!({"username": "alice", "password": "pw1"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);
    let second = format!(
        "folio.sid={}",
        response.cookie_value("folio.sid").expect("new cookie")
    );
    assert_ne!(first, second);

    TestRequest::get("/whoami")
        .cookie(&first)
        .send(&app.service)
        .await
        .assert_body_contains("anonymous");
    TestRequest::get("/whoami")
        .cookie(&second)
        .send(&app.service)
        .await
        .assert_body_contains("alice");
}

/// ## Summary
/// Once alice's record is deleted, her still-valid cookie makes her anonymous
/// and protected routes answer 401.
#[test_log::test(tokio::test)]
async fn deleted_user_session_is_anonymous() {
    let app = TestApp::new();
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    let bob = app.seed_user("Bob", "bob", "pw2").await;
    let cookie = app.login("alice", "pw1").await;

    TestRequest::delete(&format!("/users/{alice}"))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    TestRequest::get(&format!("/users/{bob}"))
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error("Authentication required");
    TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_body_contains("anonymous");
}

#[test_log::test(tokio::test)]
async fn password_change_keeps_existing_session() {
    let app = TestApp::new();
    let alice = app.seed_user("Alice", "alice", "pw1").await;
    let cookie = app.login("alice", "pw1").await;

    TestRequest::patch(&format!("/users/{alice}"))
        .cookie(&cookie)
        .json(&json!({"password": "pw2"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);

    TestRequest::get("/whoami")
        .cookie(&cookie)
        .send(&app.service)
        .await
        .assert_body_contains("alice");
    TestRequest::post("/login")
        .json(&json!({"username": "alice", "password": "pw1"}))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.login("alice", "pw2").await;
}
