/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskhub_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskhub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```
use crate::{
    config::Config,
    middleware::{auth::auth_layer, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through `State`; the config sits behind an
/// `Arc` and the pool is reference-counted internally.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Base for absolute links in responses
    pub fn public_url(&self) -> &str {
        &self.config.api.public_url
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /api
/// ├── GET    /health                        # public
/// ├── /users                                # everything below requires a token
/// │   ├── GET        /
/// │   ├── GET        /me
/// │   └── GET|PUT|PATCH /:id
/// ├── /tasks
/// │   ├── GET|POST   /
/// │   ├── GET        /my_tasks
/// │   ├── GET        /assigned_to_me
/// │   ├── GET|PUT|PATCH|DELETE /:id
/// │   └── POST       /:id/{assign,complete,mark_in_progress,mark_todo}
/// ├── /comments
/// │   ├── GET|POST   /
/// │   └── GET|PUT|PATCH|DELETE /:id
/// └── /tags
///     ├── GET|POST   /
///     ├── GET        /autocomplete
///     └── GET|DELETE /:id                   # PUT|PATCH answer 405
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, then
/// authentication on the protected routes.
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/me", get(routes::users::me))
        .route(
            "/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .patch(routes::users::partial_update_user),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/my_tasks", get(routes::tasks::my_tasks))
        .route("/assigned_to_me", get(routes::tasks::assigned_to_me))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .patch(routes::tasks::partial_update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/assign", post(routes::tasks::assign_task))
        .route("/:id/complete", post(routes::tasks::complete_task))
        .route(
            "/:id/mark_in_progress",
            post(routes::tasks::mark_in_progress),
        )
        .route("/:id/mark_todo", post(routes::tasks::mark_todo));

    let comment_routes = Router::new()
        .route(
            "/",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/:id",
            get(routes::comments::get_comment)
                .put(routes::comments::update_comment)
                .patch(routes::comments::partial_update_comment)
                .delete(routes::comments::delete_comment),
        );

    let tag_routes = Router::new()
        .route(
            "/",
            get(routes::tags::list_tags).post(routes::tags::create_tag),
        )
        .route("/autocomplete", get(routes::tags::autocomplete))
        .route(
            "/:id",
            get(routes::tags::get_tag)
                .delete(routes::tags::delete_tag)
                .put(routes::tags::update_not_allowed)
                .patch(routes::tags::update_not_allowed),
        );

    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/tags", tag_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    let api = Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
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
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
