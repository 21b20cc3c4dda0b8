use dotenv::dotenv;
use garagepilot_core::api::{cors_layer, create_router, AppState};
use garagepilot_core::config::Config;
use garagepilot_core::db::Database;
use garagepilot_core::ids::ClockIds;
use garagepilot_core::pipeline::{JsonDirectory, Workshop};
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting GaragePilot Core Server...");

    let config = Config::from_env()?;
    if config.is_development() {
        warn!("Running in development mode");
    }

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", config.data_dir.display(), e))?;
    let db = Database::open(&config.data_dir).await?;

    let directory = Arc::new(JsonDirectory::new(&config.data_dir));
    let workshop = Workshop::new(&db, directory.clone(), directory, Arc::new(ClockIds::new()));
    let state = AppState::new(workshop, &config.jwt_secret);

    let app = create_router(state).layer(cors_layer(&config.cors_origins));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", address, e))?;

    info!("Server listening on {}", address);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
