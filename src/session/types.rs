//! Identifiers, lifecycle states and errors shared by the session layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chess::{Color, Termination};

// =============================================================================
// Identifiers
// =============================================================================

/// Handle identifying one connected participant. Assigned by the transport
/// when a connection opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Opaque game identifier, unique for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("game_{}", Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
    Resignation,
    OpponentDisconnected,
}

impl FinishReason {
    /// Maps a terminal classification to its reason, `None` while ongoing.
    #[must_use]
    pub fn from_termination(termination: Termination) -> Option<Self> {
        match termination {
            Termination::Ongoing => None,
            Termination::Checkmate { .. } => Some(Self::Checkmate),
            Termination::Stalemate => Some(Self::Stalemate),
            Termination::InsufficientMaterial => Some(Self::InsufficientMaterial),
            Termination::ThreefoldRepetition => Some(Self::ThreefoldRepetition),
            Termination::FiftyMoveRule => Some(Self::FiftyMoveRule),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::InsufficientMaterial => "insufficient material",
            Self::ThreefoldRepetition => "threefold repetition",
            Self::FiftyMoveRule => "fifty-move rule",
            Self::Resignation => "resignation",
            Self::OpponentDisconnected => "opponent disconnected",
        };
        f.write_str(text)
    }
}

/// Game result as announced to participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl From<Option<Color>> for Winner {
    fn from(color: Option<Color>) -> Self {
        match color {
            Some(Color::White) => Self::White,
            Some(Color::Black) => Self::Black,
            None => Self::Draw,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white wins"),
            Self::Black => write!(f, "black wins"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Session lifecycle. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GameStatus {
    AwaitingFirstMove,
    Active,
    Finished {
        reason: FinishReason,
        /// `None` for a draw.
        winner: Option<Color>,
    },
}

impl GameStatus {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Rejections at the session boundary. Each is reported to the offending
/// participant as an `error` event and leaves session state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No piece of yours on {0}")]
    InvalidSource(String),

    #[error("Invalid move: {from} to {to}")]
    IllegalDestination { from: String, to: String },

    #[error("Not your turn!")]
    NotYourTurn,

    #[error("No active game")]
    SessionNotFound,

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Game is already over")]
    GameFinished,

    #[error("Already playing a game")]
    AlreadyInGame,
}

impl SessionError {
    /// Stable wire code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSource(_) => "invalid_source",
            Self::IllegalDestination { .. } => "illegal_destination",
            Self::NotYourTurn => "not_your_turn",
            Self::SessionNotFound => "session_not_found",
            Self::MalformedMessage(_) => "malformed_message",
            Self::GameFinished => "game_finished",
            Self::AlreadyInGame => "already_in_game",
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_ids_are_unique_and_prefixed() {
        let a = GameId::generate();
        let b = GameId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("game_"));
        assert_eq!(serde_json::to_string(&a).unwrap(), format!("\"{a}\""));
    }

    #[test]
    fn winner_from_color() {
        assert_eq!(Winner::from(Some(Color::Black)), Winner::Black);
        assert_eq!(Winner::from(None), Winner::Draw);
        assert_eq!(serde_json::to_string(&Winner::Draw).unwrap(), "\"draw\"");
    }

    #[test]
    fn finish_reason_follows_termination() {
        assert_eq!(FinishReason::from_termination(Termination::Ongoing), None);
        assert_eq!(
            FinishReason::from_termination(Termination::Checkmate { loser: Color::White }),
            Some(FinishReason::Checkmate)
        );
        assert_eq!(serde_json::to_string(&FinishReason::OpponentDisconnected).unwrap(), "\"opponent_disconnected\"");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(SessionError::NotYourTurn.code(), "not_your_turn");
        assert_eq!(SessionError::InvalidSource("e4".into()).to_string(), "No piece of yours on e4");
        assert_eq!(
            SessionError::IllegalDestination { from: "e2".into(), to: "e5".into() }.code(),
            "illegal_destination"
        );
    }
}
