//! Arena - pure WebSocket game server binary

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena Game Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Border: {}x{}", config.border.width, config.border.height);
    info!("  Spawn: {:?}", config.player.spawn);
    info!(
        "  Ticks: physics {}ms, slow {}ms, broadcast {}Hz",
        config.server.physics_tick_ms, config.server.slow_tick_ms, config.server.network_update_factor
    );

    // Start the game server (WebSocket only)
    server::run(config).await?;

    Ok(())
}
