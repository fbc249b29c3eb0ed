use anyhow::{Context, Result};
use deadpool_diesel::postgres::{
    Manager as DeadpoolManager, Pool as DeadpoolPool, PoolConfig, Runtime as DeadpoolRuntime,
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::net::SocketAddr;
use std::sync::Arc;

use parley_backend::PgPool;
use parley_backend::config::Config;
use parley_backend::llm::build_ai_gateway;
use parley_backend::logging::init_subscriber;
use parley_backend::routes::build_router;
use parley_backend::services::conversation_store::DieselConversationStore;
use parley_backend::state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_subscriber();

    tracing::info!("Starting parley backend server...");

    let config = Arc::new(Config::load().context("Failed to load configuration")?);
    tracing::debug!(?config, "Configuration loaded");

    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;
    tracing::info!("Connecting to database...");
    let manager = DeadpoolManager::new(database_url, DeadpoolRuntime::Tokio1);
    let pool: PgPool = DeadpoolPool::builder(manager)
        .config(PoolConfig::default())
        .runtime(DeadpoolRuntime::Tokio1)
        .build()
        .context("Failed to create DB pool")?;
    tracing::info!("Database connection pool established.");

    run_migrations(&pool).await?;

    // One shared, pooled HTTP client for the AI gateway, built once.
    let ai_client = build_ai_gateway(&config).context("Failed to build AI gateway client")?;
    let store = Arc::new(DieselConversationStore::new(pool.clone()));

    let app_state = AppState::new(pool, config.clone(), store, ai_client);
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listener")?;
    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

async fn run_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running database migrations...");
    let conn = pool
        .get()
        .await
        .context("Failed to get connection for migrations")?;
    conn.interact(|conn| {
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|e| anyhow::anyhow!("Migration failed: {e}"))
    })
    .await
    .map_err(|e| anyhow::anyhow!("Migration interact task failed: {e}"))?
    .map(|count| tracing::info!("Applied {count} pending migrations"))?;
    Ok(())
}
