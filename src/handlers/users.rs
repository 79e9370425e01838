//! User CRUD. Admin-gated, tenant-scoped, with role-escalation rules
//! enforced before any row is touched.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::guards::{self, TenantFilter};
use crate::auth::password;
use crate::database::models::{user::USER_COLUMNS, Role, User};
use crate::database::patch::{Patch, PatchValue};
use crate::error::ApiError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

/// Columns a partial update may touch. `password` in the request body maps
/// to `password_hash` after hashing.
const UPDATABLE_COLUMNS: &[&str] = &[
    "email",
    "name",
    "first_name",
    "last_name",
    "status",
    "role",
    "tenant_id",
    "password_hash",
];

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: Option<String>,
    pub tenant_id: Option<Uuid>,
}

/// Partial update. Nullable columns use a double Option so "absent" and
/// "explicitly null" stay distinguishable.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<Option<String>>,
    #[serde(default)]
    pub first_name: Option<Option<String>>,
    #[serde(default)]
    pub last_name: Option<Option<String>>,
    #[serde(default)]
    pub tenant_id: Option<Option<Uuid>>,
}

/// Render the list query for a visibility filter. The tenant id, when
/// present, is always bound as `$1`, never interpolated.
fn list_users_sql(filter: &TenantFilter) -> String {
    let base = format!("SELECT {} FROM users", USER_COLUMNS);
    match filter {
        TenantFilter::All => format!("{} ORDER BY created_at DESC LIMIT 50", base),
        TenantFilter::Tenant(_) => format!(
            "{} WHERE tenant_id = $1 ORDER BY created_at DESC LIMIT 50",
            base
        ),
        TenantFilter::Unassigned => format!(
            "{} WHERE tenant_id IS NULL ORDER BY created_at DESC LIMIT 50",
            base
        ),
    }
}

/// GET /users - list users visible to the actor (limited to 50).
pub async fn user_list(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Value>, ApiError> {
    guards::require_admin(&ctx)?;

    let filter = guards::tenant_filter(&ctx);
    let sql = list_users_sql(&filter);
    let mut query = sqlx::query_as(&sql);
    if let TenantFilter::Tenant(tenant_id) = filter {
        query = query.bind(tenant_id);
    }
    let users: Vec<User> = query.fetch_all(&state.pool).await?;

    Ok(Json(json!({ "users": users })))
}

/// GET /users/:id
pub async fn user_get(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    guards::require_admin(&ctx)?;

    let user = fetch_user(&state, id).await?;
    if !guards::can_access_tenant(&ctx, user.tenant_id) {
        return Err(ApiError::forbidden("Access to this tenant is not allowed"));
    }

    Ok(Json(json!({ "user": user })))
}

/// POST /users - create a user. A missing password is auto-generated and
/// returned once in the response body, never re-displayed.
pub async fn user_create(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    guards::require_admin(&ctx)?;

    let email = body
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing email"))?;

    let role = Role::parse(body.role.as_deref().unwrap_or("user"));
    if role.is_admin() && !ctx.role.is_super_admin() {
        return Err(ApiError::forbidden(
            "Only a super admin can assign admin roles",
        ));
    }

    // Non-super-admins create users inside their own tenant scope only.
    let tenant_id = if ctx.role.is_super_admin() {
        body.tenant_id
    } else {
        let target = body.tenant_id.or(ctx.tenant_id);
        if !guards::can_access_tenant(&ctx, target) {
            return Err(ApiError::forbidden("Access to this tenant is not allowed"));
        }
        target
    };

    let generated = body.password.is_none();
    let plain_password = body
        .password
        .unwrap_or_else(|| password::generate_password(12));
    let hash = password::hash_password(&plain_password, state.config.security.bcrypt_cost)?;

    let name = body.name.or_else(|| {
        match (body.first_name.as_deref(), body.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            _ => None,
        }
    });

    let user: User = sqlx::query_as(&format!(
        "INSERT INTO users (email, password_hash, role, name, first_name, last_name, status, tenant_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&email)
    .bind(&hash)
    .bind(&role)
    .bind(&name)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(body.status.as_deref().unwrap_or("active"))
    .bind(tenant_id)
    .fetch_one(&state.pool)
    .await?;

    let mut payload = serde_json::to_value(&user).map_err(|err| {
        tracing::error!("failed to serialize user: {}", err);
        ApiError::internal("Failed to format response")
    })?;
    if generated {
        payload["generated_password"] = json!(plain_password);
    }

    Ok(Json(json!({ "user": payload })))
}

/// PUT /users/:id - partial update from the recognized fields only.
pub async fn user_update(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    guards::require_admin(&ctx)?;

    let target = fetch_user(&state, id).await?;
    ensure_update_allowed(&ctx, &target, body.role.as_deref(), body.tenant_id.is_some())?;

    let mut patch = Patch::new("users", UPDATABLE_COLUMNS);
    if let Some(email) = body.email {
        patch.set("email", PatchValue::Text(Some(email)))?;
    }
    if let Some(role) = body.role {
        patch.set("role", PatchValue::Text(Some(role)))?;
    }
    if let Some(status) = body.status {
        patch.set("status", PatchValue::Text(Some(status)))?;
    }
    if let Some(name) = body.name {
        patch.set("name", PatchValue::Text(name))?;
    }
    if let Some(first_name) = body.first_name {
        patch.set("first_name", PatchValue::Text(first_name))?;
    }
    if let Some(last_name) = body.last_name {
        patch.set("last_name", PatchValue::Text(last_name))?;
    }
    if let Some(tenant_id) = body.tenant_id {
        patch.set("tenant_id", PatchValue::Uuid(tenant_id))?;
    }
    if let Some(password) = body.password {
        let hash = password::hash_password(&password, state.config.security.bcrypt_cost)?;
        patch.set("password_hash", PatchValue::Text(Some(hash)))?;
    }

    let updated: Option<User> = patch.apply(&state.pool, id, USER_COLUMNS).await?;
    let updated = updated.ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "user": updated })))
}

/// DELETE /users/:id
pub async fn user_delete(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    guards::require_admin(&ctx)?;

    let target = fetch_user(&state, id).await?;
    if !guards::can_access_tenant(&ctx, target.tenant_id) {
        return Err(ApiError::forbidden("Access to this tenant is not allowed"));
    }
    if target.id == ctx.user_id {
        return Err(ApiError::forbidden("Cannot delete your own account"));
    }
    if target.role.is_super_admin() && !ctx.role.is_super_admin() {
        return Err(ApiError::forbidden(
            "Only a super admin can delete a super admin",
        ));
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Permission decision for a partial user update. Runs before any patch is
/// built, so a forbidden body mutates nothing: tenant scope first, then
/// role/tenant reassignment (super-admin-only), then the super admin
/// downgrade bar.
fn ensure_update_allowed(
    ctx: &AuthContext,
    target: &User,
    new_role: Option<&str>,
    changes_tenant: bool,
) -> Result<(), ApiError> {
    if !guards::can_access_tenant(ctx, target.tenant_id) {
        return Err(ApiError::forbidden("Access to this tenant is not allowed"));
    }

    if (new_role.is_some() || changes_tenant) && !ctx.role.is_super_admin() {
        return Err(ApiError::forbidden(
            "Only a super admin can change role or tenant",
        ));
    }

    if let Some(new_role) = new_role.map(Role::parse) {
        if target.role.is_super_admin() && !new_role.is_super_admin() {
            return Err(ApiError::forbidden("Cannot change a super admin's role"));
        }
    }

    Ok(())
}

async fn fetch_user(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    let user: Option<User> = sqlx::query_as(&format!(
        "SELECT {} FROM users WHERE id = $1 LIMIT 1",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    user.ok_or_else(|| ApiError::not_found("User not found"))
}
