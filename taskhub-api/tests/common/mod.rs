/// Common test utilities for integration tests
///
/// Every context gets its own in-memory store and rate limiter, so tests
/// never share state and need neither PostgreSQL nor Redis.
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::Config;
use taskhub_api::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use taskhub_shared::models::user::{UpdateUser, UserRole};
use taskhub_shared::store::Store;
use tower::Service as _;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "wonderland42";

/// Test context containing the router and the store behind it
pub struct TestContext {
    pub app: axum::Router,
    pub store: Store,
    pub config: Config,
}

/// Tokens and id returned by register/login
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
}

/// Status, headers and parsed JSON body (`Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("memory://".to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_rate_limit(10_000)
    }

    /// Context whose limiter allows `max_requests` per 15 minutes
    pub fn with_rate_limit(max_requests: u64) -> Self {
        Self::with_limiter(RateLimitConfig::new(max_requests, 900))
    }

    /// Like [`TestContext::with_rate_limit`], keyed on `X-Forwarded-For`
    pub fn behind_proxy(max_requests: u64) -> Self {
        Self::with_limiter(RateLimitConfig::new(max_requests, 900).with_trust_proxy(true))
    }

    fn with_limiter(limit: RateLimitConfig) -> Self {
        let config = test_config();
        let store = Store::memory();
        let limiter = RateLimiter::in_memory(limit);
        let app = build_router(AppState::new(store.clone(), config.clone(), limiter));

        Self { app, store, config }
    }

    /// Sends a request, with an optional bearer token and JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.call(request).await
    }

    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers `username` with [`TEST_PASSWORD`]
    pub async fn register(&self, username: &str) -> Session {
        let response = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": TEST_PASSWORD,
                    "firstName": "Test",
                    "lastName": "User",
                })),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "register failed: {}",
            response.body
        );
        session_from(&response.body)
    }

    pub async fn login(&self, username: &str) -> Session {
        let response = self
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "password": TEST_PASSWORD,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        session_from(&response.body)
    }

    /// Registers a user, grants `role` and logs in again so the token carries it
    pub async fn register_with_role(&self, username: &str, role: UserRole) -> Session {
        let session = self.register(username).await;
        self.store
            .users
            .update(
                session.user_id,
                UpdateUser {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        self.login(username).await
    }

    /// Creates a task in `project` and returns its id
    pub async fn create_task(&self, token: &str, title: &str, project: &str, status: &str) -> Uuid {
        let response = self
            .send(
                "POST",
                "/api/tasks",
                Some(token),
                Some(serde_json::json!({
                    "title": title,
                    "project": project,
                    "status": status,
                })),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "create task failed: {}",
            response.body
        );
        parse_id(&response.body["id"])
    }
}

pub fn session_from(body: &Value) -> Session {
    Session {
        token: body["token"].as_str().unwrap().to_string(),
        refresh_token: body["refreshToken"].as_str().unwrap().to_string(),
        user_id: parse_id(&body["user"]["id"]),
    }
}

pub fn parse_id(value: &Value) -> Uuid {
    value.as_str().unwrap().parse().unwrap()
}
