//! Rejection gates of the authentication middleware, end to end through the
//! router. No live database is needed: every case here must be rejected at
//! or before the store boundary, and a store failure must fail closed.

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use starterx_api::database::models::Role;

const SECRET: &str = "integration-test-secret";

#[tokio::test]
async fn protected_route_without_token_is_missing_auth() -> Result<()> {
    let (status, body) = common::send(common::test_app(SECRET), common::get("/users")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_AUTH");
    Ok(())
}

#[tokio::test]
async fn non_bearer_authorization_is_missing_auth() -> Result<()> {
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/tenants")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())?;
    let (status, body) = common::send(common::test_app(SECRET), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_AUTH");
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_invalid_token() -> Result<()> {
    let (status, body) = common::send(
        common::test_app(SECRET),
        common::get_with_token("/users", "not.a.jwt"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn token_signed_with_wrong_secret_is_invalid_token() -> Result<()> {
    let token = common::make_token("some-other-secret", Role::Admin, None, 0);
    let (status, body) = common::send(
        common::test_app(SECRET),
        common::get_with_token("/users", &token),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_distinguished_from_invalid() -> Result<()> {
    let token = common::make_token(SECRET, Role::Admin, None, 10);
    let (status, body) = common::send(
        common::test_app(SECRET),
        common::get_with_token("/users", &token),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_EXPIRED");
    Ok(())
}

#[tokio::test]
async fn valid_token_fails_closed_when_store_is_unreachable() -> Result<()> {
    // A well-signed, unexpired token must still be rejected when the
    // per-request user lookup cannot run.
    let token = common::make_token(SECRET, Role::SuperAdmin, None, 0);
    let (status, body) = common::send(
        common::test_app(SECRET),
        common::get_with_token("/users", &token),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "DB_ERROR");
    Ok(())
}
