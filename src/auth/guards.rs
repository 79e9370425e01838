//! Access guards: pure predicates over the request's `AuthContext`, plus the
//! one store-backed bootstrap check.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthContext;

pub fn require_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin role required"))
    }
}

pub fn require_super_admin(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.role.is_super_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Super admin role required"))
    }
}

/// Whether the actor may touch a resource belonging to `target_tenant_id`.
///
/// Super admins see everything. Everyone else needs a tenant on both sides,
/// and they must match: a tenant-less actor gets no implicit global access.
pub fn can_access_tenant(ctx: &AuthContext, target_tenant_id: Option<Uuid>) -> bool {
    if ctx.role.is_super_admin() {
        return true;
    }
    match (ctx.tenant_id, target_tenant_id) {
        (Some(own), Some(target)) => own == target,
        _ => false,
    }
}

/// Row-visibility constraint derived from the auth context. This is a
/// contract for query construction, not a string fragment: each arm maps to
/// a parameterized WHERE clause at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantFilter {
    /// No constraint (super admin).
    All,
    /// Rows whose tenant_id equals the actor's tenant.
    Tenant(Uuid),
    /// Rows with no tenant. A tenant-less admin sees only tenant-less
    /// resources, never all of them.
    Unassigned,
}

pub fn tenant_filter(ctx: &AuthContext) -> TenantFilter {
    if ctx.role.is_super_admin() {
        TenantFilter::All
    } else {
        match ctx.tenant_id {
            Some(id) => TenantFilter::Tenant(id),
            None => TenantFilter::Unassigned,
        }
    }
}

/// Bootstrap escape hatch for first-run setup: while no admin or super admin
/// row exists, the operation is allowed unauthenticated. Once one exists the
/// latch is closed for good and an admin context is required.
pub async fn ensure_admin_or_bootstrap(
    pool: &PgPool,
    ctx: Option<&AuthContext>,
) -> Result<(), ApiError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM users WHERE role IN ('admin', 'super_admin')",
    )
    .fetch_one(pool)
    .await
    .map_err(|err| {
        // Ambiguity during an authorization check always denies.
        tracing::error!("bootstrap admin check failed: {}", err);
        ApiError::forbidden("Authorization check failed")
    })?;

    if count == 0 {
        return Ok(());
    }

    match ctx {
        None => Err(ApiError::forbidden("Authentication required")),
        Some(ctx) => require_admin(ctx),
    }
}
