//! Authoritative rules engine.
//!
//! Board representation, legal move generation, move application and
//! terminal-state classification. Everything here is synchronous and pure:
//! a `BoardState` goes in, a new `BoardState` (or a verdict) comes out.

pub mod types;
pub mod board;
pub mod movegen;
pub mod apply;
pub mod outcome;

#[allow(unused_imports)]
pub use {
    types::*,
    board::{BoardSnapshot, BoardState, CastlingRights, PlacedPiece, Placement, STARTING_FEN},
    movegen::{is_attacked, pseudo_legal_moves, MoveGenerator},
    apply::{MoveApplier, MoveRecord},
    outcome::{Termination, TerminationClassifier},
};
