//! First-run setup endpoints: installation status, migrations, and the
//! initial super admin account.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::password;
use crate::database::{self, models::user::USER_COLUMNS, models::User, MIGRATOR};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatus {
    pub installed: bool,
    pub database: bool,
    pub migrations: bool,
    pub admin_user: bool,
    pub env_configured: bool,
    pub errors: Vec<String>,
}

/// GET /setup/status - aggregate health: store connectivity, schema
/// presence, admin existence, required env vars.
pub async fn status(State(state): State<AppState>) -> Json<SetupStatus> {
    let mut status = SetupStatus {
        installed: false,
        database: false,
        migrations: false,
        admin_user: false,
        env_configured: false,
        errors: Vec::new(),
    };

    match database::health_check(&state.pool).await {
        Ok(()) => status.database = true,
        Err(err) => status
            .errors
            .push(format!("Database connection failed: {}", err)),
    }

    if status.database {
        let exists: Result<(bool,), sqlx::Error> = sqlx::query_as(
            "SELECT EXISTS (SELECT FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = 'users')",
        )
        .fetch_one(&state.pool)
        .await;
        match exists {
            Ok((true,)) => status.migrations = true,
            Ok((false,)) => status
                .errors
                .push("Database migrations have not been run".to_string()),
            Err(err) => status
                .errors
                .push(format!("Failed to check migrations: {}", err)),
        }
    }

    if status.migrations {
        // Tolerate legacy role spellings when probing for an admin.
        let count: Result<(i64,), sqlx::Error> = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE LOWER(TRIM(role)) IN \
             ('admin', 'super_admin', 'superadmin', 'administrator')",
        )
        .fetch_one(&state.pool)
        .await;
        match count {
            Ok((n,)) => status.admin_user = n > 0,
            Err(err) => status
                .errors
                .push(format!("Failed to check admin user: {}", err)),
        }
    }

    status.env_configured = state.config.security.jwt_secret_configured();
    if !status.env_configured {
        status
            .errors
            .push("Missing environment variables: JWT_SECRET".to_string());
    }

    status.installed =
        status.database && status.migrations && status.admin_user && status.env_configured;

    Json(status)
}

/// POST /setup/run-migrations - apply the embedded schema migrations.
pub async fn run_migrations(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    MIGRATOR.run(&state.pool).await.map_err(|err| {
        tracing::error!("migration failed: {}", err);
        ApiError::internal(format!("Migration failed: {}", err))
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Migrations completed successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
}

/// POST /setup/create-admin - create the initial super admin. The first
/// user of an installation is always a super admin.
pub async fn create_admin(
    State(state): State<AppState>,
    Json(body): Json<CreateAdminRequest>,
) -> Result<Json<Value>, ApiError> {
    let (email, plain) = match (body.email, body.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => return Err(ApiError::bad_request("Email and password are required")),
    };
    if plain.len() < 6 {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters",
        ));
    }

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;
    if existing > 0 {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let first_name = body.first_name.unwrap_or_else(|| "Admin".to_string());
    let last_name = body.last_name.unwrap_or_else(|| "User".to_string());
    let hash = password::hash_password(&plain, state.config.security.bcrypt_cost)?;

    let user: User = sqlx::query_as(&format!(
        "INSERT INTO users (first_name, last_name, name, email, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5, 'super_admin') RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&first_name)
    .bind(&last_name)
    .bind(format!("{} {}", first_name, last_name))
    .bind(&email)
    .bind(&hash)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Admin user created successfully",
        "user": user,
    })))
}
