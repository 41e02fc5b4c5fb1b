pub mod app;
pub mod chess;
pub mod config;
pub mod error;
pub mod server;
pub mod session;

use derivative::Derivative;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::session::SessionDirector;

pub use crate::error::Error;

/// State shared by every connection.
#[derive(Derivative)]
#[derivative(Default)]
pub struct AppState {
    pub config: ServerConfig,
    pub director: SessionDirector,
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
pub async fn run() -> Result<()> {
    app::logging::init_logging();
    let config = ServerConfig::from_env()?;
    info_startup(&config);
    let state = app::setup::setup_app(config);
    server::serve(state).await
}

fn info_startup(config: &ServerConfig) {
    log::info!(
        "pawn-duel {} starting (stats every {}s, {} msgs/s per connection)",
        env!("CARGO_PKG_VERSION"),
        config.stats_interval_secs,
        config.message_rate_limit
    );
}
