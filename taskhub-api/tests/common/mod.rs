//! Common test utilities for integration tests
//!
//! Database-backed tests need `DATABASE_URL`; without it [`TestContext::new`]
//! returns `None` and the test returns early.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::Config;
use taskhub_shared::auth::jwt::issue_token_pair;
use taskhub_shared::db::migrations::run_migrations;
use taskhub_shared::models::user::User;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context holding the pool and the router under test
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
}

/// A user together with a valid access token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

/// Short unique suffix for emails and tag names
pub fn unique() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl TestContext {
    pub async fn new() -> Option<Self> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("DATABASE_URL not set, skipping");
                return None;
            }
        };

        let db = PgPool::connect(&url).await.expect("connect to test database");
        run_migrations(&db).await.expect("run migrations");

        let app = build_router(AppState::new(db.clone(), Config::for_tests(url, SECRET)));
        Some(Self { db, app })
    }

    pub async fn user(&self) -> TestUser {
        let mut conn = self.db.acquire().await.unwrap();
        let email = format!("user-{}@example.com", unique());
        let user = User::create_user(&mut conn, &email, "Test User", Some("password123"))
            .await
            .unwrap();
        Self::with_token(user)
    }

    pub async fn admin(&self) -> TestUser {
        let mut conn = self.db.acquire().await.unwrap();
        let email = format!("admin-{}@example.com", unique());
        let user = User::create_superuser(&mut conn, &email, "Admin", "password123")
            .await
            .unwrap();
        Self::with_token(user)
    }

    pub async fn deactivate(&self, user: &TestUser) {
        let mut conn = self.db.acquire().await.unwrap();
        User::set_active(&mut conn, user.id(), false).await.unwrap();
    }

    fn with_token(user: User) -> TestUser {
        let (token, _) = issue_token_pair(user.id, SECRET).unwrap();
        TestUser { user, token }
    }

    /// Sends a request and returns the status with the JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(&self.app, method, uri, user.map(|u| u.token.as_str()), body).await
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(user), None).await
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, user: &TestUser, body: Value) -> i64 {
        let (status, json) = self.post("/api/tasks", user, body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", json);
        json["id"].as_i64().unwrap()
    }

    /// Creates a tag through the API as `admin` and returns its id
    pub async fn create_tag(&self, admin: &TestUser, name: &str) -> i64 {
        let (status, json) = self
            .post("/api/tags", admin, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", json);
        json["id"].as_i64().unwrap()
    }
}

/// Drives one request through `app` with an optional bearer token
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, json)
}
