pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the full application router.
///
/// Public routes (auth, setup, health) are reachable without a token;
/// everything else passes through the authentication middleware, which
/// verifies the token and re-resolves the user from the store per request.
pub fn app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/setup-admin", post(handlers::auth::setup_admin))
        .route("/setup/status", get(handlers::setup::status))
        .route("/setup/run-migrations", post(handlers::setup::run_migrations))
        .route("/setup/create-admin", post(handlers::setup::create_admin));

    let protected = Router::new()
        .route(
            "/users",
            get(handlers::users::user_list).post(handlers::users::user_create),
        )
        .route(
            "/users/:id",
            get(handlers::users::user_get)
                .put(handlers::users::user_update)
                .delete(handlers::users::user_delete),
        )
        .route(
            "/tenants",
            get(handlers::tenants::tenant_list).post(handlers::tenants::tenant_create),
        )
        .route(
            "/tenants/:id",
            get(handlers::tenants::tenant_get)
                .put(handlers::tenants::tenant_update)
                .delete(handlers::tenants::tenant_delete),
        )
        .route("/tenants/:id/users", get(handlers::tenants::tenant_users))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    public
        .merge(protected)
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "status": "ok",
        "name": "StarterX API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    match database::health_check(&state.pool).await {
        Ok(()) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "status": "ok",
                "timestamp": Utc::now(),
                "database": "ok",
            })),
        ),
        Err(err) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "status": "degraded",
                "timestamp": Utc::now(),
                "database_error": err.to_string(),
            })),
        ),
    }
}

/// Unmatched routes get the standard envelope instead of an empty body.
async fn not_found(uri: axum::http::Uri) -> impl axum::response::IntoResponse {
    (
        axum::http::StatusCode::NOT_FOUND,
        axum::response::Json(json!({
            "statusCode": 404,
            "timestamp": Utc::now(),
            "path": uri.path(),
            "error": "Not Found",
        })),
    )
}
