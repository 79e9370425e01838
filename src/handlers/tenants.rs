//! Tenant CRUD. Every operation here is super-admin-only; tenant deletion
//! cascades to the tenant's users and cannot be undone.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::guards;
use crate::database::models::tenant::{slugify, Tenant, TENANT_COLUMNS};
use crate::database::models::user::USER_COLUMNS;
use crate::database::models::User;
use crate::database::patch::{Patch, PatchValue};
use crate::error::ApiError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

const UPDATABLE_COLUMNS: &[&str] = &["name", "slug", "domain", "status", "metadata"];

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub domain: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub domain: Option<Option<String>>,
    #[serde(default)]
    pub metadata: Option<Option<Value>>,
}

/// GET /tenants
pub async fn tenant_list(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Value>, ApiError> {
    guards::require_super_admin(&ctx)?;

    let tenants: Vec<Tenant> = sqlx::query_as(&format!(
        "SELECT {} FROM tenants ORDER BY created_at DESC",
        TENANT_COLUMNS
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "tenants": tenants })))
}

/// GET /tenants/:id
pub async fn tenant_get(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    guards::require_super_admin(&ctx)?;

    let tenant = fetch_tenant(&state, id).await?;
    Ok(Json(json!({ "tenant": tenant })))
}

/// POST /tenants - slug is derived from the name when not supplied, and
/// uniqueness is checked before insert.
pub async fn tenant_create(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<CreateTenantRequest>,
) -> Result<Json<Value>, ApiError> {
    guards::require_super_admin(&ctx)?;

    let name = body
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing name"))?;

    let slug = body.slug.unwrap_or_else(|| slugify(&name));

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants WHERE slug = $1")
        .bind(&slug)
        .fetch_one(&state.pool)
        .await?;
    if existing > 0 {
        return Err(ApiError::conflict("Slug already exists"));
    }

    let tenant: Tenant = sqlx::query_as(&format!(
        "INSERT INTO tenants (name, slug, domain, status, metadata) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        TENANT_COLUMNS
    ))
    .bind(&name)
    .bind(&slug)
    .bind(&body.domain)
    .bind(body.status.as_deref().unwrap_or("active"))
    .bind(&body.metadata)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({ "tenant": tenant })))
}

/// PUT /tenants/:id - partial update from the recognized fields only.
pub async fn tenant_update(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTenantRequest>,
) -> Result<Json<Value>, ApiError> {
    guards::require_super_admin(&ctx)?;

    let mut patch = Patch::new("tenants", UPDATABLE_COLUMNS);
    if let Some(name) = body.name {
        patch.set("name", PatchValue::Text(Some(name)))?;
    }
    if let Some(slug) = body.slug {
        patch.set("slug", PatchValue::Text(Some(slug)))?;
    }
    if let Some(status) = body.status {
        patch.set("status", PatchValue::Text(Some(status)))?;
    }
    if let Some(domain) = body.domain {
        patch.set("domain", PatchValue::Text(domain))?;
    }
    if let Some(metadata) = body.metadata {
        patch.set("metadata", PatchValue::Json(metadata))?;
    }

    let updated: Option<Tenant> = patch.apply(&state.pool, id, TENANT_COLUMNS).await?;
    let updated = updated.ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    Ok(Json(json!({ "tenant": updated })))
}

/// DELETE /tenants/:id - removes the tenant and, via the cascade, every
/// user that belonged to it.
pub async fn tenant_delete(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    guards::require_super_admin(&ctx)?;

    fetch_tenant(&state, id).await?;

    sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Tenant deleted successfully",
    })))
}

/// GET /tenants/:id/users
pub async fn tenant_users(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    guards::require_super_admin(&ctx)?;

    let users: Vec<User> = sqlx::query_as(&format!(
        "SELECT {} FROM users WHERE tenant_id = $1 ORDER BY created_at DESC",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "users": users })))
}

async fn fetch_tenant(state: &AppState, id: Uuid) -> Result<Tenant, ApiError> {
    let tenant: Option<Tenant> = sqlx::query_as(&format!(
        "SELECT {} FROM tenants WHERE id = $1 LIMIT 1",
        TENANT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    tenant.ok_or_else(|| ApiError::not_found("Tenant not found"))
}
