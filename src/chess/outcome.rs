//! Terminal-state classification.

use serde::{Deserialize, Serialize};

use super::board::BoardState;
use super::movegen::MoveGenerator;
use super::types::{Color, Role};

/// Half-move clock value at which the fifty-move rule ends the game.
pub const FIFTY_MOVE_PLIES: u32 = 100;

/// Occurrences of one position that end the game by repetition.
pub const REPETITION_LIMIT: usize = 3;

/// Classification of a position for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    Ongoing,
    Checkmate { loser: Color },
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

impl Termination {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    /// The winning color, `None` for draws and ongoing games.
    #[must_use]
    pub fn winner(self) -> Option<Color> {
        match self {
            Self::Checkmate { loser } => Some(loser.opposite()),
            _ => None,
        }
    }
}

pub struct TerminationClassifier;

impl TerminationClassifier {
    /// Classifies `board` for its side to move. Rules are checked in a fixed
    /// order: mate, stalemate, insufficient material, repetition, fifty moves.
    pub fn classify(board: &BoardState) -> Termination {
        if !MoveGenerator::has_legal_move(board) {
            return if MoveGenerator::is_check(board) {
                Termination::Checkmate { loser: board.turn() }
            } else {
                Termination::Stalemate
            };
        }
        if Self::insufficient_material(board) {
            return Termination::InsufficientMaterial;
        }
        if board.repetitions() >= REPETITION_LIMIT {
            return Termination::ThreefoldRepetition;
        }
        if board.halfmove_clock() >= FIFTY_MOVE_PLIES {
            return Termination::FiftyMoveRule;
        }
        Termination::Ongoing
    }

    /// Neither side can mate: each side has at most one minor piece besides
    /// its king, or every remaining non-king piece is a bishop and all of them
    /// stand on one square colour.
    #[must_use]
    pub fn insufficient_material(board: &BoardState) -> bool {
        let others: Vec<_> = board
            .placement()
            .pieces()
            .filter(|(_, piece)| piece.role != Role::King)
            .collect();

        if others.iter().any(|(_, piece)| !piece.role.is_minor()) {
            return false;
        }

        let at_most_one_minor_each = Color::ALL
            .iter()
            .all(|&color| others.iter().filter(|(_, piece)| piece.color == color).count() <= 1);
        if at_most_one_minor_each {
            return true;
        }

        let all_bishops = others.iter().all(|(_, piece)| piece.role == Role::Bishop);
        all_bishops
            && (others.iter().all(|(sq, _)| sq.is_dark()) || others.iter().all(|(sq, _)| !sq.is_dark()))
    }
}
