//! Public authentication endpoints: login, logout, bootstrap admin setup.

use axum::{extract::State, http::HeaderMap, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, password, Claims, TokenError};
use crate::database::models::{user::USER_COLUMNS, Role, User};
use crate::error::{codes, ApiError};
use crate::middleware::auth::authenticate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/login - verify credentials and issue a signed access token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let (email, password) = match (body.email, body.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => return Err(ApiError::bad_request("Missing email or password")),
    };

    if !state.config.security.jwt_secret_configured() {
        return Err(ApiError::misconfigured(
            "Server misconfiguration: JWT secret missing",
        ));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1 LIMIT 1",
        USER_COLUMNS
    ))
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?;

    let user = user.ok_or_else(|| {
        ApiError::unauthorized("Invalid credentials", codes::INVALID_CREDENTIALS)
    })?;

    if !password::verify_password(&password, &user.password_hash) {
        return Err(ApiError::unauthorized(
            "Invalid credentials",
            codes::INVALID_CREDENTIALS,
        ));
    }

    let claims = Claims::new(&user, state.config.security.jwt_expiry_hours);
    let token =
        auth::generate_jwt(&claims, &state.config.security.jwt_secret).map_err(|err| match err {
            TokenError::MissingSecret => {
                ApiError::misconfigured("Server misconfiguration: JWT secret missing")
            }
            other => {
                tracing::error!("token generation failed: {}", other);
                ApiError::internal("Failed to issue access token")
            }
        })?;

    Ok(Json(json!({
        "access_token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "tenant_id": user.tenant_id,
            "user_metadata": {
                "role": user.role,
                "tenant_id": user.tenant_id,
            },
        },
    })))
}

/// POST /auth/logout - stateless JWT, the client just discards the token.
pub async fn logout() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// POST /auth/setup-admin - create or update the admin account from env
/// defaults. Open only while no admin row exists (one-way latch); afterwards
/// the caller must present admin credentials.
pub async fn setup_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    // This route is public, so an auth context (if any) is resolved
    // opportunistically rather than by the middleware.
    let ctx = authenticate(&state, &headers).await.ok();
    crate::auth::guards::ensure_admin_or_bootstrap(&state.pool, ctx.as_ref()).await?;

    let email = env_or("ADMIN_EMAIL", "admin@starterx.com");
    let password = env_or("ADMIN_PASSWORD", "admin123");
    let first_name = env_or("ADMIN_FIRST", "Admin");
    let last_name = env_or("ADMIN_LAST", "User");
    let role = Role::parse(&env_or("ADMIN_ROLE", "super_admin"));

    let hash = password::hash_password(&password, state.config.security.bcrypt_cost)?;
    let name = format!("{} {}", first_name, last_name);

    // The upsert on email keeps concurrent bootstrap calls idempotent.
    let (id,): (uuid::Uuid,) = sqlx::query_as(
        "INSERT INTO users (first_name, last_name, email, name, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (email) DO UPDATE SET \
             first_name = EXCLUDED.first_name, \
             last_name = EXCLUDED.last_name, \
             name = EXCLUDED.name, \
             password_hash = EXCLUDED.password_hash, \
             role = EXCLUDED.role, \
             updated_at = now() \
         RETURNING id",
    )
    .bind(&first_name)
    .bind(&last_name)
    .bind(&email)
    .bind(&name)
    .bind(&hash)
    .bind(&role)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({ "success": true, "id": id })))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
