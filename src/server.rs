//! WebSocket transport. Turns sockets into participants and frames into
//! `SessionDirector` calls; none of the game logic lives here.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use governor::RateLimiter;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::session::{Participant, ParticipantId, ServerMessage};
use crate::AppState;

type ConnectionLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/stats", get(stats_handler))
        .layer(Extension(state))
}

/// Serves until Ctrl-C.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.socket_addr();
    let app = router(Arc::clone(&state));

    info!("Chess server listening on {}", addr);
    axum::Server::try_bind(&addr)
        .map_err(|e| Error::Server(e.to_string()))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    info!("Chess server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn stats_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(state.director.stats().await)
}

async fn ws_handler(ws: WebSocketUpgrade, Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerMessage>();
    let id = ParticipantId::new();
    state.director.connect(Participant::new(id, outbox));

    let writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialise {} for {}: {}", message.kind(), id, e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!("Socket for {} closed while sending: {}", id, e);
                break;
            }
        }
    });

    let limiter: ConnectionLimiter = RateLimiter::direct(state.config.rate_quota());
    let mut throttled = 0u64;

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket error from {}: {}", id, e);
                break;
            }
        };

        if limiter.check().is_err() {
            throttled += 1;
            if throttled == 1 || throttled % 100 == 0 {
                warn!("Throttling {} ({} frames dropped)", id, throttled);
            }
            continue;
        }
        state.director.handle_text(id, &text).await;
    }

    state.director.on_participant_leave(id).await;
    writer.abort();
}
