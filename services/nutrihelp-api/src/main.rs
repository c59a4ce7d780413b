use nutrihelp_api::repo::{ServiceRepo, VerificationRepo};
use nutrihelp_api::{routes::create_router, services::start_background_tasks, AppState, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let builder = FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env());
    if config.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    tracing::info!("Starting nutrihelp-api in {:?} mode", config.environment);

    // Connect to PostgreSQL
    tracing::info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {:?}", e);
            e
        })?;

    tracing::info!("Connected to PostgreSQL");

    // Initialize database tables
    init_db(&pool).await?;

    let state = AppState::new(pool, config.clone());

    // Start background tasks
    start_background_tasks(state.clone());

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize database tables
async fn init_db(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    tracing::info!("Initializing database tables");

    ServiceRepo::new(pool.clone()).init_tables().await?;
    tracing::info!("Service content tables initialized");

    VerificationRepo::new(pool.clone()).init_tables().await?;
    tracing::info!("Verification tables initialized");

    Ok(())
}
