//! Splitroom - shared-cost room server
//!
//! Usage: `splitroom [CONFIG]`

use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod state;

#[tokio::main]
async fn main() {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    let app_state = match state::AppState::new(config_path.as_deref()) {
        Ok(state) => state,
        Err(e) => {
            // Logging is not configured yet
            eprintln!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&app_state.config.server.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    tracing::info!(db = %app_state.db_path.display(), "Starting Splitroom");

    let (config, manager) = app_state.into_manager();
    let server = match splitroom_net::Server::start(
        config.server.listen.as_str(),
        manager,
        config.rooms.request_timeout(),
    )
    .await
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %server.addr(), "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to wait for Ctrl-C: {}", e);
    }

    server.shutdown();
    tracing::info!("Splitroom stopped");
}
