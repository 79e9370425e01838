use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::TokenError;
use crate::database::models::Role;
use crate::error::{codes, ApiError};
use crate::state::AppState;

/// Request-scoped authentication context.
///
/// The email comes from the token; role and tenant are re-fetched from the
/// store at request time so a deleted or demoted user's unexpired token
/// carries no stale privileges.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub subject: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

#[derive(FromRow)]
struct AuthRow {
    id: Uuid,
    role: Role,
    tenant_id: Option<Uuid>,
}

/// Middleware guarding every non-public route. On success the `AuthContext`
/// is attached to request extensions for the extractor below.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Full token-to-context pipeline: bearer extraction, signature/expiry
/// verification, then the per-request store lookup. Every ambiguous outcome
/// rejects with 401; authentication never fails open.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let token = extract_bearer(headers)?;

    let claims = crate::auth::validate_jwt(&token, &state.config.security.jwt_secret).map_err(
        |err| match err {
            TokenError::Expired => ApiError::unauthorized("Token expired", codes::TOKEN_EXPIRED),
            TokenError::MissingSecret => {
                tracing::error!("rejecting request: JWT secret not configured");
                ApiError::unauthorized("Invalid token", codes::INVALID_TOKEN)
            }
            TokenError::Invalid(_) => ApiError::unauthorized("Invalid token", codes::INVALID_TOKEN),
        },
    )?;

    let row = sqlx::query_as::<_, AuthRow>(
        "SELECT id, role, tenant_id FROM users WHERE id = $1 LIMIT 1",
    )
    .bind(claims.sub)
    .fetch_optional(&state.pool)
    .await
    .map_err(|err| {
        tracing::error!("auth lookup failed for {}: {}", claims.sub, err);
        ApiError::unauthorized("Authentication lookup failed", codes::DB_ERROR)
    })?;

    let row = row
        .ok_or_else(|| ApiError::unauthorized("User no longer exists", codes::USER_NOT_FOUND))?;

    Ok(AuthContext {
        subject: claims.sub,
        user_id: row.id,
        email: claims.email,
        role: row.role,
        tenant_id: row.tenant_id,
    })
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization", codes::MISSING_AUTH))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Missing Authorization", codes::MISSING_AUTH))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::unauthorized(
            "Missing Authorization",
            codes::MISSING_AUTH,
        )),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| {
                ApiError::unauthorized("Authentication required", codes::MISSING_AUTH)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_missing_auth() {
        let err = extract_bearer(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.error_code(), codes::MISSING_AUTH);
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let err = extract_bearer(&headers_with("Basic dXNlcjpwYXNz")).unwrap_err();
        assert_eq!(err.error_code(), codes::MISSING_AUTH);
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        let err = extract_bearer(&headers_with("Bearer   ")).unwrap_err();
        assert_eq!(err.error_code(), codes::MISSING_AUTH);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let token = extract_bearer(&headers_with("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }
}
