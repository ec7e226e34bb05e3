use anyhow::Context;
use notification_hub::{
    db::{create_pool, run_migrations},
    notification::start_reconcile_job,
    push::{HttpPushDispatcher, LogPushDispatcher, PushDispatcher},
    routes::create_router,
    state::{AppState, Config},
    storage::{MemoryStorage, PgStorage, StorageBackend},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notification_hub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    let storage: Arc<dyn StorageBackend> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let db = create_pool(database_url)
                .await
                .context("failed to connect to database")?;

            tracing::info!("Running migrations...");
            run_migrations(&db).await?;
            Arc::new(PgStorage::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, notifications are kept in memory only");
            Arc::new(MemoryStorage::new())
        }
    };

    let push: Arc<dyn PushDispatcher> = match &config.push_gateway_url {
        Some(url) => Arc::new(HttpPushDispatcher::new(url.clone())),
        None => Arc::new(LogPushDispatcher),
    };

    let state = AppState::new(config.clone(), storage, push);

    // Start reconciliation job
    let _scheduler = start_reconcile_job(
        state.store.clone(),
        state.listener.clone(),
        &config.reconcile_schedule,
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to start reconcile job: {}", e))?;

    let listener_registry = state.listener.clone();
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    let closed = listener_registry.unsubscribe_all();
    tracing::info!("Shut down, closed {} push subscriptions", closed);

    Ok(())
}
