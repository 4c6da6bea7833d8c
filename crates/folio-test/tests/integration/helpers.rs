#![allow(clippy::unused_async, clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building the full router over fresh in-memory stores (one per test)
//! - Seeding users, including an elevated one
//! - Making HTTP requests with session cookies
//! - Asserting on responses

use std::sync::Arc;

use salvo::http::header::HeaderName;
use salvo::http::{Method, ReqBody, StatusCode};
use salvo::prelude::*;
use salvo::test::{RequestBuilder, ResponseExt, TestClient};
use serde_json::Value;

use folio_app::app::router;
use folio_app::services::AppServices;
use folio_core::config::{BootstrapAdminConfig, Settings};
use folio_db::model::document::DocumentId;
use folio_service::auth::ensure_bootstrap_admin;
use folio_service::resource::UserInput;

pub use tracing;

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "rootpw";

/// A running application with its own stores.
pub struct TestApp {
    pub service: Service,
    pub services: Arc<AppServices>,
    pub settings: Settings,
}

impl TestApp {
    /// ## Panics
    /// Panics if the settings or services cannot be built.
    #[must_use]
    pub fn new() -> Self {
        let settings = folio_test::test_settings().expect("test settings");
        let services =
            Arc::new(AppServices::in_memory(&settings.session).expect("in-memory services"));
        let service = Service::new(router(settings.clone(), Arc::clone(&services)));
        Self {
            service,
            services,
            settings,
        }
    }

    /// Registers a member directly through the user service.
    ///
    /// ## Panics
    /// Panics if registration fails.
    pub async fn seed_user(&self, name: &str, username: &str, password: &str) -> DocumentId {
        self.services
            .users
            .register(UserInput {
                name: Some(name.to_string()),
                username: Some(username.to_string()),
                email: Some(format!("{username}@example.com")),
                password: Some(password.to_string()),
            })
            .await
            .expect("Failed to seed user")
    }

    /// Creates the bootstrap admin (`root` / `rootpw`).
    ///
    /// ## Panics
    /// Panics if the admin cannot be created.
    pub async fn seed_admin(&self) -> DocumentId {
        let config = BootstrapAdminConfig {
            username: ADMIN_USERNAME.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Root".to_string(),
        };
        ensure_bootstrap_admin(&self.services.users, &config)
            .await
            .expect("Failed to seed admin")
            .id
    }

    /// Logs in over HTTP and returns the session cookie as `name=value`.
    ///
    /// ## Panics
    /// Panics if the login is rejected.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = TestRequest::post("/login")
            .json(&serde_json::json!({"username": username, "password": password}))
            .send(&self.service)
            .await
            .assert_status(StatusCode::OK);
        let value = response
            .cookie_value(&self.settings.session.cookie_name)
            .expect("Login should set the session cookie");
        format!("{}={value}", self.settings.session.cookie_name)
    }

    /// Creates an article over HTTP as the holder of `cookie` and returns its id.
    ///
    /// ## Panics
    /// Panics if the article is not created.
    pub async fn create_article(&self, cookie: &str, title: &str) -> String {
        let response = TestRequest::post("/articles")
            .cookie(cookie)
            .json(&serde_json::json!({"title": title, "content": format!("{title} body")}))
            .send(&self.service)
            .await
            .assert_status(StatusCode::CREATED);
        response.json()["_id"]
            .as_str()
            .expect("created id")
            .to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl TestRequest {
    /// Creates a new test request with the given method and path.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Adds a header to the request.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sends a cookie given as `name=value`.
    #[must_use]
    pub fn cookie(self, cookie: &str) -> Self {
        self.header("cookie", cookie)
    }

    #[must_use]
    pub fn content_type(self, content_type: &str) -> Self {
        self.header("content-type", content_type)
    }

    /// Sets the raw request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(self, value: &Value) -> Self {
        self.content_type("application/json")
            .body(value.to_string())
    }

    /// Sets an urlencoded form body, e.g. `username=alice&password=pw1`.
    #[must_use]
    pub fn form(self, encoded: &str) -> Self {
        self.content_type("application/x-www-form-urlencoded")
            .body(encoded)
    }

    /// Sends the request to the given service and returns the response.
    ///
    /// ## Panics
    /// Panics if the request cannot be sent or the response cannot be read.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);

        let mut client = match self.method.as_str() {
            "GET" => TestClient::get(&url),
            "POST" => TestClient::post(&url),
            "PUT" => TestClient::put(&url),
            "PATCH" => TestClient::patch(&url),
            "DELETE" => TestClient::delete(&url),
            _ => RequestBuilder::new(&url, self.method.clone()),
        };

        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        if let Some(body_bytes) = self.body {
            client = client.body(ReqBody::Once(body_bytes.into()));
        }

        let mut response = client.send(service).await;

        let status = response
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        // Cookies only reach the headers when the response is written out.
        for cookie in response.cookies().delta() {
            let rendered = cookie.to_string();
            if !headers
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case("set-cookie") && *v == rendered)
            {
                headers.push(("set-cookie".to_string(), rendered));
            }
        }

        let body: Vec<u8> = response.take_bytes(None).await.unwrap_or_default().to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {expected} but got {}: {}",
            self.status,
            self.body_string()
        );
        self
    }

    /// Asserts that the response body contains the expected substring.
    #[must_use]
    pub fn assert_body_contains(self, expected: &str) -> Self {
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            body.contains(expected),
            "Expected body to contain '{expected}' but got:\n{body}"
        );
        self
    }

    /// Asserts that the response body does not contain the specified substring.
    #[must_use]
    pub fn assert_body_not_contains(self, unexpected: &str) -> Self {
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            !body.contains(unexpected),
            "Expected body to NOT contain '{unexpected}' but got:\n{body}"
        );
        self
    }

    /// Asserts the `{"error": ...}` payload.
    #[must_use]
    pub fn assert_error(self, expected: &str) -> Self {
        assert_eq!(
            self.json()["error"],
            Value::from(expected),
            "Unexpected error body: {}",
            self.body_string()
        );
        self
    }

    /// Returns the body as a UTF-8 string.
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// ## Panics
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body should be JSON")
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every `Set-Cookie` header for `name`.
    #[must_use]
    pub fn set_cookies(&self, name: &str) -> Vec<&str> {
        let prefix = format!("{name}=");
        self.headers
            .iter()
            .filter(|(k, v)| k.eq_ignore_ascii_case("set-cookie") && v.starts_with(&prefix))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns the value of the last `Set-Cookie` for `name`.
    #[must_use]
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies(name).last().map(|cookie| {
            cookie
                .trim_start_matches(prefix.as_str())
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string()
        })
    }
}
