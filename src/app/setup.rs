use std::sync::Arc;

use log::info;

use crate::config::ServerConfig;
use crate::session::SessionDirector;
use crate::AppState;

/// Builds the shared state and starts background tasks. Must run inside a
/// tokio runtime.
pub fn setup_app(config: ServerConfig) -> Arc<AppState> {
    info!("Setting up chess server");
    let state = Arc::new(AppState { config, director: SessionDirector::new() });
    spawn_stats_reporter(Arc::clone(&state));
    info!("Finished chess server initialization");
    state
}

/// Logs lobby statistics every `stats_interval`.
fn spawn_stats_reporter(state: Arc<AppState>) {
    let period = state.config.stats_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = state.director.stats().await;
            info!("Lobby: {}", stats);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn setup_builds_an_empty_lobby() {
        let state = setup_app(ServerConfig::default());
        let stats = state.director.stats().await;
        assert_eq!((stats.connected, stats.active_games, stats.waiting), (0, 0, 0));
    }
}
