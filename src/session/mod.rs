//! Game sessions and matchmaking.
//!
//! `GameSession` owns one board and enforces turns; `SessionDirector` pairs
//! participants and routes their messages. Participants are reached only
//! through their outbox, so nothing here depends on the transport.

pub mod types;
pub mod protocol;
pub mod events;
pub mod game;
pub mod director;

#[allow(unused_imports)]
pub use {
    types::*,
    protocol::{ClientMessage, ProposedMove, ServerMessage},
    events::Participant,
    game::{GameInfo, GameSession},
    director::{LobbyStats, SessionDirector, SharedSession},
};
