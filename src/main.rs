use anyhow::Context;
use starterx_api::{app, config::AppConfig, database, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and JWT_SECRET.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    tracing::info!("Starting StarterX API in {:?} mode", config.environment);

    if !config.security.jwt_secret_configured() {
        tracing::warn!("JWT_SECRET is not configured; logins will fail until it is set");
    }

    // The pool connects lazily so the server can come up (and report setup
    // status) while the database is still unreachable.
    let pool =
        database::connect(&config.database).context("failed to initialize database pool")?;

    let port = config.server.port;
    let state = AppState::new(pool, config);
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("StarterX API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
