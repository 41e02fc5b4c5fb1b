//! Matchmaking and message routing.
//!
//! Two kinds of shared state live here. The participant registry is a
//! `DashMap`. The lobby (the single waiting slot plus the table of live
//! sessions) sits behind one async mutex, so two simultaneous joins can never
//! both claim the same waiter. Each session has its own mutex, so moves in
//! different games never contend.
//!
//! Lock order is lobby, then session. Nothing takes the lobby lock while
//! holding a session guard.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use super::events::Participant;
use super::game::{GameInfo, GameSession};
use super::protocol::{ClientMessage, LegalMovesPayload, ProposedMove, ServerMessage};
use super::types::{ParticipantId, SessionError, SessionResult};
use crate::chess::Square;

pub type SharedSession = Arc<Mutex<GameSession>>;

#[derive(Default)]
struct Lobby {
    waiting: Option<Participant>,
    /// Keyed by both participants of every live session.
    sessions: HashMap<ParticipantId, SharedSession>,
    games_started: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStats {
    pub connected: usize,
    pub active_games: usize,
    pub waiting: usize,
    pub games_started: u64,
}

#[derive(Default)]
pub struct SessionDirector {
    participants: DashMap<ParticipantId, Participant>,
    lobby: Mutex<Lobby>,
}

impl SessionDirector {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Registers a freshly connected participant and greets it.
    pub fn connect(&self, participant: Participant) {
        info!("Participant {} connected", participant.id());
        participant.send(ServerMessage::welcome());
        self.participants.insert(participant.id(), participant);
    }

    /// Pairs `id` with the waiting participant, or makes it the waiter.
    pub async fn on_participant_join(&self, id: ParticipantId) -> SessionResult<()> {
        let joiner = self.participant(id).ok_or(SessionError::SessionNotFound)?;

        let mut lobby = self.lobby.lock().await;
        if lobby.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyInGame);
        }

        match lobby.waiting.take() {
            Some(waiter) if waiter.id() == id => {
                debug!("Participant {} is already waiting", id);
                joiner.send(ServerMessage::waiting());
                lobby.waiting = Some(waiter);
            }
            Some(waiter) if waiter.is_connected() => {
                let (white, black) = (waiter.id(), id);
                let session = GameSession::new(waiter, joiner);
                session.start();
                let session = Arc::new(Mutex::new(session));
                lobby.sessions.insert(white, Arc::clone(&session));
                lobby.sessions.insert(black, session);
                lobby.games_started += 1;
            }
            stale => {
                if let Some(waiter) = stale {
                    debug!("Discarding disconnected waiter {}", waiter.id());
                }
                info!("Participant {} is waiting for an opponent", id);
                joiner.send(ServerMessage::waiting());
                lobby.waiting = Some(joiner);
            }
        }
        Ok(())
    }

    /// Drops a participant. A waiter simply leaves the slot; a player in a
    /// live game forfeits it and the session is discarded.
    pub async fn on_participant_leave(&self, id: ParticipantId) {
        self.participants.remove(&id);
        {
            let mut lobby = self.lobby.lock().await;
            if lobby.waiting.as_ref().is_some_and(|w| w.id() == id) {
                lobby.waiting = None;
                debug!("Participant {} left the waiting slot", id);
            }
            if let Some(session) = lobby.sessions.remove(&id) {
                let mut game = session.lock().await;
                game.participant_departed(id);
                if let Some(opponent) = game.opponent_of(id) {
                    lobby.sessions.remove(&opponent);
                }
            }
        }
        let stats = self.stats().await;
        info!("Participant {} disconnected; {}", id, stats);
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Parses and routes one text frame.
    pub async fn handle_text(&self, id: ParticipantId, text: &str) {
        match ClientMessage::parse(text) {
            Ok(Some(message)) => self.on_message(id, message).await,
            Ok(None) => warn!("Dropping unrecognised message from {}: {}", id, text),
            Err(err) => {
                warn!("Malformed message from {}: {}", id, err);
                self.reply(id, ServerMessage::error(&err));
            }
        }
    }

    /// Routes a parsed message. Rejections go back to the sender as `error`
    /// events; they never affect other participants.
    pub async fn on_message(&self, id: ParticipantId, message: ClientMessage) {
        debug!("Received {} from {}", message.kind(), id);
        let result = match message {
            ClientMessage::InitGame => self.on_participant_join(id).await,
            ClientMessage::Move(request) => self.submit_move(id, &request.proposal).await,
            ClientMessage::Resign => self.resign(id).await,
            ClientMessage::LegalMoves(request) => self.legal_moves(id, &request.square).await,
        };
        if let Err(err) = result {
            warn!("Rejected message from {}: {}", id, err);
            self.reply(id, ServerMessage::error(&err));
        }
    }

    async fn submit_move(&self, id: ParticipantId, proposal: &ProposedMove) -> SessionResult<()> {
        let session = self.session_of(id).await.ok_or(SessionError::SessionNotFound)?;
        let finished = {
            let mut game = session.lock().await;
            game.submit_move(id, proposal)?;
            game.is_finished()
        };
        if finished {
            self.retire(&session).await;
        }
        Ok(())
    }

    async fn resign(&self, id: ParticipantId) -> SessionResult<()> {
        let session = self.session_of(id).await.ok_or(SessionError::SessionNotFound)?;
        let resigned = session.lock().await.resign(id)?;
        if resigned {
            info!("Participant {} resigned", id);
        }
        self.retire(&session).await;
        Ok(())
    }

    async fn legal_moves(&self, id: ParticipantId, square: &str) -> SessionResult<()> {
        let session = self.session_of(id).await.ok_or(SessionError::SessionNotFound)?;
        let from: Square = square.parse().map_err(|_| SessionError::InvalidSource(square.to_string()))?;
        let destinations = session.lock().await.legal_destinations(from);
        self.reply(id, ServerMessage::LegalMoves(LegalMovesPayload { square: from, destinations }));
        Ok(())
    }

    /// Removes a finished session from the lobby table so both players can
    /// queue again.
    async fn retire(&self, session: &SharedSession) {
        let mut lobby = self.lobby.lock().await;
        lobby.sessions.retain(|_, s| !Arc::ptr_eq(s, session));
    }

    fn reply(&self, id: ParticipantId, message: ServerMessage) {
        match self.participant(id) {
            Some(participant) => participant.send(message),
            None => debug!("No participant {} to receive {}", id, message.kind()),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    fn participant(&self, id: ParticipantId) -> Option<Participant> {
        self.participants.get(&id).map(|entry| entry.value().clone())
    }

    /// The live session `id` is playing in.
    pub async fn session_of(&self, id: ParticipantId) -> Option<SharedSession> {
        self.lobby.lock().await.sessions.get(&id).cloned()
    }

    pub async fn is_waiting(&self, id: ParticipantId) -> bool {
        self.lobby.lock().await.waiting.as_ref().is_some_and(|w| w.id() == id)
    }

    pub async fn stats(&self) -> LobbyStats {
        let lobby = self.lobby.lock().await;
        LobbyStats {
            connected: self.participants.len(),
            active_games: lobby.sessions.len() / 2,
            waiting: usize::from(lobby.waiting.is_some()),
            games_started: lobby.games_started,
        }
    }

    /// Info for every live session.
    pub async fn games(&self) -> Vec<GameInfo> {
        let sessions: Vec<SharedSession> = {
            let lobby = self.lobby.lock().await;
            let mut unique: Vec<SharedSession> = Vec::new();
            for session in lobby.sessions.values() {
                if !unique.iter().any(|s| Arc::ptr_eq(s, session)) {
                    unique.push(Arc::clone(session));
                }
            }
            unique
        };
        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.lock().await.info());
        }
        infos
    }
}

impl std::fmt::Display for LobbyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} connected, {} active games, {} waiting, {} started",
            self.connected, self.active_games, self.waiting, self.games_started
        )
    }
}
