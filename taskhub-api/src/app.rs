//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskhub_api::app::{build_router, AppState};
//! use taskhub_api::config::Config;
//! use taskhub_api::middleware::rate_limit::{RateLimitConfig, RateLimiter};
//! use taskhub_shared::store::Store;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let limiter = RateLimiter::in_memory(RateLimitConfig::new(100, 900));
//! let state = AppState::new(Store::memory(), config, limiter);
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{auth::jwt_auth_layer, rate_limit::RateLimiter, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use taskhub_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// Repository bundle (PostgreSQL or in-memory)
    pub store: Store,

    pub config: Arc<Config>,

    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(store: Store, config: Config, rate_limiter: RateLimiter) -> Self {
        Self {
            store,
            config: Arc::new(config),
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api
/// ├── GET  /health                     (public)
/// ├── /auth                            (public)
/// │   ├── POST /register
/// │   ├── POST /login
/// │   ├── POST /refresh
/// │   └── POST /logout
/// ├── /users                           (JWT)
/// │   ├── GET|PUT /profile
/// │   ├── GET     /
/// │   ├── GET|DELETE /:id              (DELETE: admin)
/// │   ├── PUT     /:id/role            (admin)
/// │   └── PUT     /:id/status          (admin)
/// ├── /tasks                           (JWT)
/// │   ├── GET|POST /
/// │   ├── GET|PUT|DELETE /:id
/// │   ├── POST /:id/comments
/// │   └── POST /:id/attachments
/// ├── /projects                        (JWT)
/// │   ├── GET|POST /
/// │   └── GET|PUT|DELETE /:id
/// └── GET /analytics/dashboard         (JWT)
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, rate limiting,
/// then JWT authentication on the protected groups. Unknown routes fall
/// through to a JSON 404.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let user_routes = Router::new()
        .route(
            "/profile",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/", get(routes::users::list_users))
        .route(
            "/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        )
        .route("/:id/role", put(routes::users::update_role))
        .route("/:id/status", put(routes::users::update_status));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/comments", post(routes::tasks::add_comment))
        .route("/:id/attachments", post(routes::tasks::add_attachment));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        );

    let analytics_routes =
        Router::new().route("/dashboard", get(routes::analytics::get_dashboard));

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .nest("/projects", project_routes)
        .nest("/analytics", analytics_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::rate_limit_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
