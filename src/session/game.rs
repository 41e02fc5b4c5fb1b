//! One two-player game: board, turn enforcement and lifecycle.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use super::events::Participant;
use super::protocol::{
    GameOverPayload, GameStatePayload, InitGamePayload, MovePayload, ProposedMove, ServerMessage,
};
use super::types::{FinishReason, GameId, GameStatus, ParticipantId, SessionError, SessionResult, Winner};
use crate::chess::{
    BoardState, Color, Move, MoveApplier, MoveGenerator, MoveRecord, Square, TerminationClassifier,
};

/// Summary of a session for stats and diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub game_id: GameId,
    pub fen: String,
    pub turn: Color,
    pub ply_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished: bool,
    pub winner: Option<Winner>,
}

/// A game between two participants. All mutation goes through `&mut self`;
/// the director wraps each session in its own mutex so the turn check and the
/// board update happen as one step.
#[derive(Debug)]
pub struct GameSession {
    id: GameId,
    white: Participant,
    black: Participant,
    board: BoardState,
    status: GameStatus,
    records: Vec<MoveRecord>,
    started_at: DateTime<Utc>,
}

impl GameSession {
    /// Pairs two participants with `white` moving first.
    pub fn new(white: Participant, black: Participant) -> Self {
        Self::from_position(white, black, BoardState::initial())
    }

    /// Starts from an arbitrary position.
    pub fn from_position(white: Participant, black: Participant, board: BoardState) -> Self {
        Self {
            id: GameId::generate(),
            white,
            black,
            board,
            status: GameStatus::AwaitingFirstMove,
            records: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Announces the game: each side learns its colour, then both get the
    /// opening position.
    pub fn start(&self) {
        info!("Starting game {} ({} white, {} black)", self.id, self.white.id(), self.black.id());
        let snapshot = self.board.snapshot();
        for (participant, color) in [(&self.white, Color::White), (&self.black, Color::Black)] {
            participant.send(ServerMessage::InitGame(InitGamePayload {
                color,
                game_id: self.id.clone(),
                board_snapshot: snapshot.clone(),
            }));
        }
        self.broadcast(ServerMessage::GameState(GameStatePayload {
            board: snapshot,
            turn: self.board.turn(),
            ply_count: self.ply_count(),
            game_id: self.id.clone(),
        }));
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Validates and plays a move for `who`. On rejection nothing changes and
    /// no event is emitted; the caller reports the error.
    pub fn submit_move(&mut self, who: ParticipantId, proposal: &ProposedMove) -> SessionResult<MoveRecord> {
        if self.status.is_finished() {
            return Err(SessionError::GameFinished);
        }
        let color = self.color_of(who).ok_or(SessionError::SessionNotFound)?;
        if color != self.board.turn() {
            return Err(SessionError::NotYourTurn);
        }

        let invalid_source = || SessionError::InvalidSource(proposal.from.clone());
        let illegal = || SessionError::IllegalDestination { from: proposal.from.clone(), to: proposal.to.clone() };

        let from: Square = proposal.from.parse().map_err(|_| invalid_source())?;
        match self.board.piece_at(from) {
            Some(piece) if piece.color == color => {}
            _ => return Err(invalid_source()),
        }
        let to: Square = proposal.to.parse().map_err(|_| illegal())?;

        let mv = MoveGenerator::normalize(&self.board, Move { from, to, promotion: proposal.promotion });
        if !MoveGenerator::is_legal(&self.board, &mv) {
            return Err(illegal());
        }

        let (board, record) = MoveApplier::apply(&self.board, &mv);
        self.board = board;
        self.records.push(record.clone());
        self.status = GameStatus::Active;
        debug!("Game {}: {} played {}", self.id, color, record.notation);

        let termination = TerminationClassifier::classify(&self.board);
        if let Some(reason) = FinishReason::from_termination(termination) {
            self.status = GameStatus::Finished { reason, winner: termination.winner() };
        }

        self.broadcast(ServerMessage::Move(MovePayload {
            from: record.from,
            to: record.to,
            promotion: record.promotion,
            notation: record.notation.clone(),
            board_snapshot: self.board.snapshot(),
            ply_count: self.ply_count(),
            turn: self.board.turn(),
            check: record.check,
        }));
        if self.is_finished() {
            self.announce_result(None);
        }
        Ok(record)
    }

    /// Ends the game in the opponent's favour. `Ok(false)` when it was
    /// already over.
    pub fn resign(&mut self, who: ParticipantId) -> SessionResult<bool> {
        if self.status.is_finished() {
            return Ok(false);
        }
        let color = self.color_of(who).ok_or(SessionError::SessionNotFound)?;
        self.status = GameStatus::Finished { reason: FinishReason::Resignation, winner: Some(color.opposite()) };
        self.announce_result(None);
        Ok(true)
    }

    /// Departure counts as resignation; only the remaining side is told.
    /// Returns whether the session changed.
    pub fn participant_departed(&mut self, who: ParticipantId) -> bool {
        if self.status.is_finished() {
            return false;
        }
        let Some(color) = self.color_of(who) else {
            return false;
        };
        self.status = GameStatus::Finished {
            reason: FinishReason::OpponentDisconnected,
            winner: Some(color.opposite()),
        };
        self.announce_result(Some(who));
        true
    }

    fn announce_result(&self, skip: Option<ParticipantId>) {
        let GameStatus::Finished { reason, winner } = self.status else {
            return;
        };
        info!("Game {} over: {} ({})", self.id, reason, Winner::from(winner));
        let message = ServerMessage::GameOver(GameOverPayload {
            winner: winner.into(),
            reason,
            board_snapshot: self.board.snapshot(),
            game_id: self.id.clone(),
        });
        for participant in [&self.white, &self.black] {
            if Some(participant.id()) != skip {
                participant.send(message.clone());
            }
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        self.white.send(message.clone());
        self.black.send(message);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Legal destinations from `from` for the side to move.
    #[must_use]
    pub fn legal_destinations(&self, from: Square) -> Vec<Square> {
        MoveGenerator::legal_destinations(&self.board, from)
    }

    #[must_use]
    pub fn color_of(&self, who: ParticipantId) -> Option<Color> {
        if who == self.white.id() {
            Some(Color::White)
        } else if who == self.black.id() {
            Some(Color::Black)
        } else {
            None
        }
    }

    #[must_use]
    pub fn opponent_of(&self, who: ParticipantId) -> Option<ParticipantId> {
        match self.color_of(who)? {
            Color::White => Some(self.black.id()),
            Color::Black => Some(self.white.id()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &GameId {
        &self.id
    }

    #[must_use]
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    #[must_use]
    pub fn ply_count(&self) -> usize {
        self.records.len()
    }

    /// Moves played so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn info(&self) -> GameInfo {
        let winner = match self.status {
            GameStatus::Finished { winner, .. } => Some(winner.into()),
            _ => None,
        };
        GameInfo {
            game_id: self.id.clone(),
            fen: self.board.to_fen(),
            turn: self.board.turn(),
            ply_count: self.ply_count(),
            started_at: self.started_at,
            finished: self.is_finished(),
            winner,
        }
    }
}
