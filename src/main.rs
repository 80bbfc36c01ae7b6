use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use snapfeed::auth::notify::LogNotifier;
use snapfeed::config::{Cli, Config};
use snapfeed::db;
use snapfeed::media::ImageKitClient;
use snapfeed::routes;
use snapfeed::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    if config.media.private_key.is_none() {
        tracing::warn!(
            "No media host private key configured; uploads will be rejected. Set media.private_key or {}",
            snapfeed::config::MEDIA_KEY_ENV
        );
    }
    let media = ImageKitClient::new(&config.media)?;

    let state = AppState {
        db: pool,
        config: config.clone(),
        media: Arc::new(media),
        notifier: Arc::new(LogNotifier),
    };

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
