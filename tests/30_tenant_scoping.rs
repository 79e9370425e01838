//! Row-level scoping behavior that can only be observed against a live
//! Postgres: tenant-confined listing and the cascade on tenant deletion.
//! Ignored by default; point DATABASE_URL at a scratch database and run
//! with `--ignored` to exercise them.

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use starterx_api::auth::{generate_jwt, Claims};
use starterx_api::config::AppConfig;
use starterx_api::database::models::{Role, User};
use starterx_api::database::MIGRATOR;
use starterx_api::state::AppState;
use starterx_api::{app, database};

const SECRET: &str = "integration-test-secret";

async fn live_state() -> Result<AppState> {
    let mut config = AppConfig::from_env();
    assert!(
        config.database.url.is_some(),
        "DATABASE_URL must point at a scratch database"
    );
    config.security.jwt_secret = SECRET.to_string();

    let pool = database::connect(&config.database)?;
    MIGRATOR.run(&pool).await?;
    Ok(AppState::new(pool, config))
}

async fn seed_tenant(state: &AppState, name: &str) -> Result<Uuid> {
    let slug = format!("{}-{}", name, Uuid::new_v4());
    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO tenants (name, slug) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(&slug)
            .fetch_one(&state.pool)
            .await?;
    Ok(id)
}

async fn seed_user(
    state: &AppState,
    role: &str,
    tenant_id: Option<Uuid>,
) -> Result<(Uuid, String)> {
    let email = format!("{}-{}@example.com", role, Uuid::new_v4());
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (email, password_hash, role, tenant_id) \
         VALUES ($1, 'x', $2, $3) RETURNING id",
    )
    .bind(&email)
    .bind(role)
    .bind(tenant_id)
    .fetch_one(&state.pool)
    .await?;
    Ok((id, email))
}

/// Token for a seeded row. The middleware re-resolves role and tenant from
/// the store, so the id must reference a real user.
fn token_for(id: Uuid, email: &str, role: Role, tenant_id: Option<Uuid>) -> String {
    let now = Utc::now();
    let user = User {
        id,
        email: email.to_string(),
        password_hash: String::new(),
        role,
        name: None,
        first_name: None,
        last_name: None,
        status: "active".to_string(),
        tenant_id,
        created_at: now,
        updated_at: now,
    };
    generate_jwt(&Claims::new(&user, 8), SECRET).expect("token")
}

fn delete_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
#[ignore = "needs a live Postgres via DATABASE_URL"]
async fn listing_is_confined_to_the_actors_tenant() -> Result<()> {
    let state = live_state().await?;
    let tenant_a = seed_tenant(&state, "alpha").await?;
    let tenant_b = seed_tenant(&state, "beta").await?;

    let (admin_id, admin_email) = seed_user(&state, "admin", Some(tenant_a)).await?;
    let (_, member_email) = seed_user(&state, "user", Some(tenant_a)).await?;
    let (_, outsider_email) = seed_user(&state, "user", Some(tenant_b)).await?;

    let token = token_for(admin_id, &admin_email, Role::Admin, Some(tenant_a));
    let (status, body) = common::send(
        app(state.clone()),
        common::get_with_token("/users", &token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().expect("users array");
    let emails: Vec<&str> = users.iter().filter_map(|u| u["email"].as_str()).collect();
    assert!(emails.contains(&member_email.as_str()));
    assert!(emails.contains(&admin_email.as_str()));
    assert!(!emails.contains(&outsider_email.as_str()));
    for user in users {
        assert_eq!(user["tenant_id"], json!(tenant_a));
    }
    Ok(())
}

#[tokio::test]
#[ignore = "needs a live Postgres via DATABASE_URL"]
async fn deleting_a_tenant_cascades_to_its_users() -> Result<()> {
    let state = live_state().await?;
    let tenant = seed_tenant(&state, "doomed").await?;
    seed_user(&state, "user", Some(tenant)).await?;
    seed_user(&state, "user", Some(tenant)).await?;

    let (root_id, root_email) = seed_user(&state, "super_admin", None).await?;
    let token = token_for(root_id, &root_email, Role::SuperAdmin, None);

    let (status, body) = common::send(
        app(state.clone()),
        delete_with_token(&format!("/tenants/{}", tenant), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (remaining,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
            .bind(tenant)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(remaining, 0);

    let (tenants,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants WHERE id = $1")
        .bind(tenant)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(tenants, 0);
    Ok(())
}
