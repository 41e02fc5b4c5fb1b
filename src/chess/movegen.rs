//! Move generation.
//!
//! Two layers: per-piece pseudo-legal generation that ignores king safety,
//! then a filter that plays each candidate on a scratch placement and drops
//! it if the mover's king ends up attacked. Attack detection reuses the same
//! movement rules (pawns by their capture diagonals only).

use log::trace;

use super::apply::MoveApplier;
use super::board::{BoardState, Placement};
use super::types::{CastleSide, Color, Move, Piece, Role, Square};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];
const KING_OFFSETS: [(i8, i8); 8] = [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)];
const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Legal move generation for a `BoardState`.
///
/// This is the only place legality is decided. The session layer, the
/// termination classifier and the move-highlighting projection all call it.
pub struct MoveGenerator;

impl MoveGenerator {
    /// Legal moves for the side to move, either from one square or from every
    /// square when `from` is `None`.
    ///
    /// An empty square or one holding the opponent's piece yields an empty
    /// set rather than an error.
    pub fn legal_moves(board: &BoardState, from: Option<Square>) -> Vec<Move> {
        match from {
            Some(sq) => match board.piece_at(sq) {
                Some(piece) if piece.color == board.turn() => Self::legal_from(board, sq),
                _ => Vec::new(),
            },
            None => board
                .placement()
                .pieces()
                .filter(|(_, piece)| piece.color == board.turn())
                .flat_map(|(sq, _)| Self::legal_from(board, sq))
                .collect(),
        }
    }

    /// Distinct destination squares reachable from `from`. Used to highlight
    /// targets for a selected piece without duplicating the rules elsewhere.
    pub fn legal_destinations(board: &BoardState, from: Square) -> Vec<Square> {
        let mut targets: Vec<Square> = Self::legal_moves(board, Some(from)).into_iter().map(|mv| mv.to).collect();
        targets.sort();
        targets.dedup();
        targets
    }

    /// Fills in the promotion role a client left out (queen) and strips one a
    /// client attached to a move that does not promote.
    #[must_use]
    pub fn normalize(board: &BoardState, mv: Move) -> Move {
        let promotes = board
            .piece_at(mv.from)
            .is_some_and(|p| p.role == Role::Pawn && mv.to.rank() == p.color.promotion_rank());
        Move {
            promotion: if promotes { Some(mv.promotion.unwrap_or(Role::Queen)) } else { None },
            ..mv
        }
    }

    #[must_use]
    pub fn is_legal(board: &BoardState, mv: &Move) -> bool {
        Self::legal_moves(board, Some(mv.from)).contains(mv)
    }

    #[must_use]
    pub fn has_legal_move(board: &BoardState) -> bool {
        board
            .placement()
            .pieces()
            .filter(|(_, piece)| piece.color == board.turn())
            .any(|(sq, _)| !Self::legal_from(board, sq).is_empty())
    }

    /// True when the side to move is in check.
    #[must_use]
    pub fn is_check(board: &BoardState) -> bool {
        let turn = board.turn();
        board
            .placement()
            .king_square(turn)
            .is_some_and(|king| is_attacked(board.placement(), king, turn.opposite()))
    }

    /// Counts leaf nodes of the legal move tree to `depth` plies.
    pub fn perft(board: &BoardState, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = Self::legal_moves(board, None);
        if depth == 1 {
            return moves.len() as u64;
        }
        moves
            .iter()
            .map(|mv| Self::perft(&MoveApplier::successor(board, mv).0, depth - 1))
            .sum()
    }

    fn legal_from(board: &BoardState, from: Square) -> Vec<Move> {
        let mut moves = pseudo_legal_moves(board, from);
        moves.retain(|mv| keeps_king_safe(board, mv));
        trace!("{} legal moves from {}", moves.len(), from);
        moves
    }
}

/// Moves obeying the movement pattern of the piece on `from`, without the
/// king-safety check. Castling is included only when the king's start,
/// transit and landing squares are all free of attack.
pub fn pseudo_legal_moves(board: &BoardState, from: Square) -> Vec<Move> {
    let Some(piece) = board.piece_at(from) else {
        return Vec::new();
    };

    let mut moves = Vec::new();
    match piece.role {
        Role::Pawn => pawn_moves(board, from, piece.color, &mut moves),
        Role::Knight => leaper_moves(board.placement(), from, piece.color, &KNIGHT_OFFSETS, &mut moves),
        Role::King => {
            leaper_moves(board.placement(), from, piece.color, &KING_OFFSETS, &mut moves);
            castling_moves(board, from, piece.color, &mut moves);
        }
        Role::Bishop => slider_moves(board.placement(), from, piece.color, &BISHOP_DIRECTIONS, &mut moves),
        Role::Rook => slider_moves(board.placement(), from, piece.color, &ROOK_DIRECTIONS, &mut moves),
        Role::Queen => {
            slider_moves(board.placement(), from, piece.color, &ROOK_DIRECTIONS, &mut moves);
            slider_moves(board.placement(), from, piece.color, &BISHOP_DIRECTIONS, &mut moves);
        }
    }
    moves
}

/// True if any piece of color `by` attacks `target` on this placement.
///
/// Probes outward from the target: a piece of `by` attacks it exactly when
/// the matching pattern, walked in reverse, reaches that piece.
pub fn is_attacked(placement: &Placement, target: Square, by: Color) -> bool {
    // A pawn of `by` attacks diagonally forward, so look one rank behind.
    let pawn = Piece::new(Role::Pawn, by);
    if [-1, 1]
        .into_iter()
        .filter_map(|df| target.offset(df, -by.forward()))
        .any(|sq| placement.get(sq) == Some(pawn))
    {
        return true;
    }

    let hits = |offsets: &[(i8, i8)], role: Role| {
        offsets
            .iter()
            .filter_map(|&(df, dr)| target.offset(df, dr))
            .any(|sq| placement.get(sq) == Some(Piece::new(role, by)))
    };
    if hits(&KNIGHT_OFFSETS[..], Role::Knight) || hits(&KING_OFFSETS[..], Role::King) {
        return true;
    }

    let ray_hits = |directions: &[(i8, i8)], slider: Role| {
        directions.iter().any(|&(df, dr)| {
            let mut cur = target;
            while let Some(next) = cur.offset(df, dr) {
                if let Some(piece) = placement.get(next) {
                    return piece.color == by && (piece.role == slider || piece.role == Role::Queen);
                }
                cur = next;
            }
            false
        })
    };
    ray_hits(&ROOK_DIRECTIONS[..], Role::Rook) || ray_hits(&BISHOP_DIRECTIONS[..], Role::Bishop)
}

fn keeps_king_safe(board: &BoardState, mv: &Move) -> bool {
    let mover = board.turn();
    let mut scratch = *board.placement();
    scratch.play(mv, board.en_passant());
    match scratch.king_square(mover) {
        Some(king) => !is_attacked(&scratch, king, mover.opposite()),
        None => false,
    }
}

fn push_pawn_move(from: Square, to: Square, color: Color, moves: &mut Vec<Move>) {
    if to.rank() == color.promotion_rank() {
        moves.extend(Role::PROMOTIONS.iter().map(|&role| Move::with_promotion(from, to, role)));
    } else {
        moves.push(Move::new(from, to));
    }
}

fn pawn_moves(board: &BoardState, from: Square, color: Color, moves: &mut Vec<Move>) {
    let placement = board.placement();
    let forward = color.forward();

    if let Some(one) = from.offset(0, forward) {
        if placement.get(one).is_none() {
            push_pawn_move(from, one, color, moves);
            if from.rank() == color.pawn_rank() {
                if let Some(two) = one.offset(0, forward) {
                    if placement.get(two).is_none() {
                        moves.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(target) = from.offset(df, forward) else {
            continue;
        };
        let enemy = placement.get(target).is_some_and(|p| p.color != color);
        if enemy || board.en_passant() == Some(target) {
            push_pawn_move(from, target, color, moves);
        }
    }
}

fn leaper_moves(placement: &Placement, from: Square, color: Color, offsets: &[(i8, i8)], moves: &mut Vec<Move>) {
    for &(df, dr) in offsets {
        if let Some(to) = from.offset(df, dr) {
            if placement.get(to).map_or(true, |p| p.color != color) {
                moves.push(Move::new(from, to));
            }
        }
    }
}

fn slider_moves(placement: &Placement, from: Square, color: Color, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
    for &(df, dr) in directions {
        let mut cur = from;
        while let Some(to) = cur.offset(df, dr) {
            match placement.get(to) {
                None => moves.push(Move::new(from, to)),
                Some(p) => {
                    if p.color != color {
                        moves.push(Move::new(from, to));
                    }
                    break;
                }
            }
            cur = to;
        }
    }
}

fn castling_moves(board: &BoardState, from: Square, color: Color, moves: &mut Vec<Move>) {
    let rank = color.back_rank();
    if from != Square::new(4, rank) {
        return;
    }
    let placement = board.placement();
    let enemy = color.opposite();

    for side in CastleSide::ALL {
        if !board.castling().has(color, side) {
            continue;
        }
        if placement.get(Square::new(side.rook_from_file(), rank)) != Some(Piece::new(Role::Rook, color)) {
            continue;
        }

        let (lo, hi) = match side {
            CastleSide::KingSide => (5, 6),
            CastleSide::QueenSide => (1, 3),
        };
        if (lo..=hi).any(|file| placement.get(Square::new(file, rank)).is_some()) {
            continue;
        }

        let king_to = side.king_to_file();
        let walk = if king_to > 4 { 4..=king_to } else { king_to..=4 };
        if walk.into_iter().any(|file| is_attacked(placement, Square::new(file, rank), enemy)) {
            continue;
        }

        moves.push(Move::new(from, Square::new(king_to, rank)));
    }
}
