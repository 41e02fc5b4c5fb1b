//! Wire messages exchanged with participants.
//!
//! Every frame is a JSON object `{"type": "<kind>", "payload": {...}}`.
//! Inbound and outbound kinds are closed enums; adding a kind means adding a
//! variant and handling it everywhere it is matched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{FinishReason, GameId, SessionError, SessionResult, Winner};
use crate::chess::{BoardSnapshot, Color, Role, Square};

// =============================================================================
// Inbound
// =============================================================================

/// Move as proposed by a client. Squares stay raw strings so a bad origin can
/// be reported as `invalid_source` rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedMove {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Role>,
}

impl ProposedMove {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), promotion: None }
    }

    #[must_use]
    pub fn promoting(mut self, role: Role) -> Self {
        self.promotion = Some(role);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    #[serde(rename = "move")]
    pub proposal: ProposedMove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalMovesRequest {
    pub square: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the lobby and ask to be paired.
    InitGame,
    Move(MoveRequest),
    Resign,
    /// Read-only query for highlighting.
    LegalMoves(LegalMovesRequest),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl ClientMessage {
    pub const KINDS: [&'static str; 4] = ["init_game", "move", "resign", "legal_moves"];

    /// Parses one text frame. `Ok(None)` is an unrecognised kind, which the
    /// caller drops; a frame that is not an envelope, or a known kind with a
    /// bad payload, is `MalformedMessage`.
    pub fn parse(text: &str) -> SessionResult<Option<Self>> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| SessionError::MalformedMessage(e.to_string()))?;

        let message = match envelope.kind.as_str() {
            "init_game" => Self::InitGame,
            "resign" => Self::Resign,
            "move" => Self::Move(payload(envelope.payload)?),
            "legal_moves" => Self::LegalMoves(payload(envelope.payload)?),
            _ => return Ok(None),
        };
        Ok(Some(message))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitGame => "init_game",
            Self::Move(_) => "move",
            Self::Resign => "resign",
            Self::LegalMoves(_) => "legal_moves",
        }
    }

    pub fn make_move(proposal: ProposedMove) -> Self {
        Self::Move(MoveRequest { proposal })
    }
}

fn payload<T: serde::de::DeserializeOwned>(value: Value) -> SessionResult<T> {
    serde_json::from_value(value).map_err(|e| SessionError::MalformedMessage(e.to_string()))
}

// =============================================================================
// Outbound
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomePayload {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitGamePayload {
    pub color: Color,
    pub game_id: GameId,
    pub board_snapshot: BoardSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingPayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    pub board: BoardSnapshot,
    pub turn: Color,
    pub ply_count: usize,
    pub game_id: GameId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub from: Square,
    pub to: Square,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Role>,
    pub notation: String,
    pub board_snapshot: BoardSnapshot,
    pub ply_count: usize,
    pub turn: Color,
    pub check: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    pub winner: Winner,
    pub reason: FinishReason,
    pub board_snapshot: BoardSnapshot,
    pub game_id: GameId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalMovesPayload {
    pub square: Square,
    pub destinations: Vec<Square>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome(WelcomePayload),
    InitGame(InitGamePayload),
    WaitingForOpponent(WaitingPayload),
    GameState(GameStatePayload),
    Move(MovePayload),
    GameOver(GameOverPayload),
    LegalMoves(LegalMovesPayload),
    Error(ErrorPayload),
}

impl ServerMessage {
    pub fn welcome() -> Self {
        Self::Welcome(WelcomePayload {
            message: "Connected to chess server".to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn waiting() -> Self {
        Self::WaitingForOpponent(WaitingPayload { message: "Waiting for an opponent...".to_string() })
    }

    pub fn error(err: &SessionError) -> Self {
        Self::Error(ErrorPayload { message: err.to_string(), code: err.code().to_string() })
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome(_) => "welcome",
            Self::InitGame(_) => "init_game",
            Self::WaitingForOpponent(_) => "waiting_for_opponent",
            Self::GameState(_) => "game_state",
            Self::Move(_) => "move",
            Self::GameOver(_) => "game_over",
            Self::LegalMoves(_) => "legal_moves",
            Self::Error(_) => "error",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::BoardState;
    use serde_json::json;

    #[test]
    fn parses_known_kinds() {
        assert_eq!(ClientMessage::parse(r#"{"type":"init_game"}"#).unwrap(), Some(ClientMessage::InitGame));
        assert_eq!(
            ClientMessage::parse(r#"{"type":"resign","payload":{}}"#).unwrap(),
            Some(ClientMessage::Resign)
        );

        let msg = ClientMessage::parse(r#"{"type":"move","payload":{"move":{"from":"e7","to":"e8","promotion":"n"}}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(msg, ClientMessage::make_move(ProposedMove::new("e7", "e8").promoting(Role::Knight)));

        let msg = ClientMessage::parse(r#"{"type":"legal_moves","payload":{"square":"g1"}}"#).unwrap().unwrap();
        assert_eq!(msg.kind(), "legal_moves");
    }

    #[test]
    fn full_role_names_are_accepted() {
        let msg = ClientMessage::parse(r#"{"type":"move","payload":{"move":{"from":"a7","to":"a8","promotion":"rook"}}}"#)
            .unwrap()
            .unwrap();
        match msg {
            ClientMessage::Move(req) => assert_eq!(req.proposal.promotion, Some(Role::Rook)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_dropped() {
        assert_eq!(ClientMessage::parse(r#"{"type":"chat","payload":{"text":"hi"}}"#).unwrap(), None);
    }

    #[test]
    fn malformed_frames() {
        for text in ["not json", "{}", r#"{"type":"move","payload":{"from":"e2"}}"#, r#"{"type":"move"}"#] {
            let err = ClientMessage::parse(text).unwrap_err();
            assert_eq!(err.code(), "malformed_message", "{text}");
        }
    }

    #[test]
    fn client_messages_serialize_in_envelope() {
        let text = serde_json::to_string(&ClientMessage::make_move(ProposedMove::new("e2", "e4"))).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&text).unwrap(),
            json!({"type": "move", "payload": {"move": {"from": "e2", "to": "e4"}}})
        );
        assert_eq!(ClientMessage::parse(&text).unwrap(), Some(ClientMessage::make_move(ProposedMove::new("e2", "e4"))));
    }

    #[test]
    fn server_messages_use_camel_case_payloads() {
        let msg = ServerMessage::InitGame(InitGamePayload {
            color: Color::White,
            game_id: GameId::generate(),
            board_snapshot: BoardState::initial().snapshot(),
        });
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "init_game");
        assert_eq!(value["payload"]["color"], "white");
        assert!(value["payload"]["gameId"].as_str().unwrap().starts_with("game_"));
        assert_eq!(value["payload"]["boardSnapshot"]["halfmoveClock"], 0);
    }

    #[test]
    fn error_event_carries_code() {
        let value = serde_json::to_value(ServerMessage::error(&SessionError::NotYourTurn)).unwrap();
        assert_eq!(value, json!({"type": "error", "payload": {"message": "Not your turn!", "code": "not_your_turn"}}));
    }
}
