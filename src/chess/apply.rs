//! Move application and move records.

use serde::Serialize;

use super::board::{BoardState, Placement};
use super::movegen::MoveGenerator;
use super::types::{CastleSide, ChessError, ChessResult, Color, Move, Piece, Role, Square};

/// Audit entry for one applied move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub piece: Piece,
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
    pub captured: Option<Piece>,
    pub en_passant: bool,
    pub castle: Option<CastleSide>,
    /// Standard algebraic notation, with `+`/`#` suffix.
    pub notation: String,
    /// Whether the side now to move is in check.
    pub check: bool,
}

impl MoveRecord {
    #[must_use]
    pub fn as_move(&self) -> Move {
        Move { from: self.from, to: self.to, promotion: self.promotion }
    }

    /// Undoes this move on the placement it produced, giving back the
    /// placement it was played on.
    #[must_use]
    pub fn revert(&self, after: &Placement) -> Placement {
        let mut placement = *after;
        placement.take(self.to);
        placement.set(self.from, Some(self.piece));

        if let Some(side) = self.castle {
            let rank = self.from.rank();
            let rook = placement.take(Square::new(side.rook_to_file(), rank));
            placement.set(Square::new(side.rook_from_file(), rank), rook);
        }

        if self.en_passant {
            placement.set(Square::new(self.to.file(), self.from.rank()), self.captured);
        } else {
            placement.set(self.to, self.captured);
        }
        placement
    }
}

/// Produces successor positions. Callers must have checked the move with
/// `MoveGenerator` first; applying cannot fail.
pub struct MoveApplier;

impl MoveApplier {
    /// Plays a legal move and describes it.
    #[must_use]
    pub fn apply(board: &BoardState, mv: &Move) -> (BoardState, MoveRecord) {
        let mv = MoveGenerator::normalize(board, *mv);
        let notation_base = san_without_suffix(board, &mv);
        let (next, captured) = Self::successor(board, &mv);

        // A legal move always starts from an occupied square.
        let piece = board.piece_at(mv.from).unwrap_or(Piece::new(Role::Pawn, board.turn()));
        let en_passant = piece.role == Role::Pawn
            && mv.from.file() != mv.to.file()
            && board.piece_at(mv.to).is_none();
        let castle = castle_side(piece, &mv);

        let check = MoveGenerator::is_check(&next);
        let suffix = if check && !MoveGenerator::has_legal_move(&next) {
            "#"
        } else if check {
            "+"
        } else {
            ""
        };

        let record = MoveRecord {
            piece,
            from: mv.from,
            to: mv.to,
            promotion: mv.promotion,
            captured,
            en_passant,
            castle,
            notation: format!("{notation_base}{suffix}"),
            check,
        };
        (next, record)
    }

    /// Builds the successor position and returns it with the captured piece.
    /// Skips notation, which makes it the cheap path for search and perft.
    #[must_use]
    pub fn successor(board: &BoardState, mv: &Move) -> (BoardState, Option<Piece>) {
        let mover = board.turn();
        let moving = board.piece_at(mv.from);
        let is_pawn = moving.is_some_and(|p| p.role == Role::Pawn);

        let mut placement = board.placement;
        let captured = placement.play(mv, board.en_passant);

        let mut castling = board.castling;
        castling.touch(mv.from);
        castling.touch(mv.to);

        let en_passant = if is_pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
            Square::from_coords(mv.from.file() as i8, (mv.from.rank() as i8 + mv.to.rank() as i8) / 2)
        } else {
            None
        };

        let halfmove_clock = if is_pawn || captured.is_some() { 0 } else { board.halfmove_clock + 1 };
        let fullmove_number = match mover {
            Color::White => board.fullmove_number,
            Color::Black => board.fullmove_number + 1,
        };

        let mut next = BoardState {
            placement,
            turn: mover.opposite(),
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
            history: board.history.clone(),
        };
        let signature = next.signature();
        next.history.push(signature);
        (next, captured)
    }

    /// Replays a move list from `start`, rejecting the first illegal move.
    pub fn replay(start: &BoardState, moves: &[Move]) -> ChessResult<(BoardState, Vec<MoveRecord>)> {
        let mut board = start.clone();
        let mut records = Vec::with_capacity(moves.len());
        for mv in moves {
            let mv = MoveGenerator::normalize(&board, *mv);
            if !MoveGenerator::is_legal(&board, &mv) {
                return Err(ChessError::IllegalMove(mv.to_uci()));
            }
            let (next, record) = Self::apply(&board, &mv);
            board = next;
            records.push(record);
        }
        Ok((board, records))
    }
}

fn castle_side(piece: Piece, mv: &Move) -> Option<CastleSide> {
    if piece.role != Role::King || mv.from.file().abs_diff(mv.to.file()) != 2 {
        return None;
    }
    Some(if mv.to.file() > mv.from.file() { CastleSide::KingSide } else { CastleSide::QueenSide })
}

fn san_without_suffix(board: &BoardState, mv: &Move) -> String {
    let Some(piece) = board.piece_at(mv.from) else {
        return mv.to_uci();
    };

    if let Some(side) = castle_side(piece, mv) {
        return match side {
            CastleSide::KingSide => "O-O".to_string(),
            CastleSide::QueenSide => "O-O-O".to_string(),
        };
    }

    let capture = board.piece_at(mv.to).is_some()
        || (piece.role == Role::Pawn && mv.from.file() != mv.to.file());
    let mut san = String::new();

    if piece.role == Role::Pawn {
        if capture {
            san.push(mv.from.file_char());
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
        if let Some(role) = mv.promotion {
            san.push('=');
            san.push(role.upper_char());
        }
        return san;
    }

    san.push(piece.role.upper_char());

    let rivals: Vec<Square> = MoveGenerator::legal_moves(board, None)
        .into_iter()
        .filter(|other| other.to == mv.to && other.from != mv.from && board.piece_at(other.from) == Some(piece))
        .map(|other| other.from)
        .collect();
    if !rivals.is_empty() {
        if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
            san.push(mv.from.file_char());
        } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
            san.push(mv.from.rank_char());
        } else {
            san.push_str(&mv.from.to_string());
        }
    }

    if capture {
        san.push('x');
    }
    san.push_str(&mv.to.to_string());
    san
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn play(board: &BoardState, uci: &str) -> (BoardState, MoveRecord) {
        let mv: Move = uci.parse().unwrap();
        assert!(MoveGenerator::is_legal(board, &MoveGenerator::normalize(board, mv)), "{uci} should be legal");
        MoveApplier::apply(board, &mv)
    }

    #[test]
    fn double_push_sets_en_passant_for_one_ply() {
        let start = BoardState::initial();
        let (after_e4, record) = play(&start, "e2e4");
        assert_eq!(record.notation, "e4");
        assert_eq!(after_e4.en_passant(), Some(sq("e3")));
        assert_eq!(after_e4.turn(), Color::Black);
        assert_eq!(after_e4.fullmove_number(), 1);

        let (after_nf6, _) = play(&after_e4, "g8f6");
        assert_eq!(after_nf6.en_passant(), None);
        assert_eq!(after_nf6.fullmove_number(), 2);
        assert_eq!(after_nf6.halfmove_clock(), 1);

        // The input board is untouched.
        assert_eq!(start, BoardState::initial());
    }

    #[test]
    fn en_passant_removes_the_passed_pawn() {
        let board = BoardState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let (next, record) = play(&board, "e5d6");
        assert!(record.en_passant);
        assert_eq!(record.notation, "exd6");
        assert_eq!(record.captured, Some(Piece::new(Role::Pawn, Color::Black)));
        assert_eq!(next.piece_at(sq("d5")), None);
        assert_eq!(next.halfmove_clock(), 0);
        assert_eq!(record.revert(next.placement()), *board.placement());
    }

    #[test]
    fn castling_moves_rook_and_revokes_rights() {
        let board = BoardState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let (next, record) = play(&board, "e1g1");
        assert_eq!(record.notation, "O-O");
        assert_eq!(record.castle, Some(CastleSide::KingSide));
        assert_eq!(next.piece_at(sq("f1")), Some(Piece::new(Role::Rook, Color::White)));
        assert!(!next.castling().white_king_side && !next.castling().white_queen_side);
        assert!(next.castling().black_king_side);
        assert_eq!(record.revert(next.placement()), *board.placement());

        let (next, record) = play(&next, "e8c8");
        assert_eq!(record.notation, "O-O-O");
        assert_eq!(next.piece_at(sq("d8")), Some(Piece::new(Role::Rook, Color::Black)));
    }

    #[test]
    fn capturing_a_rook_revokes_its_right() {
        let board = BoardState::from_fen("r3k2r/8/8/8/8/8/8/R3K1BR w KQkq - 0 1").unwrap();
        let (next, record) = play(&board, "g1a7");
        assert_eq!(record.notation, "Ba7");
        let (next, _) = play(&next, "e8d8");
        let (next, record) = play(&next, "h1h8");
        assert_eq!(record.captured, Some(Piece::new(Role::Rook, Color::Black)));
        assert!(record.check);
        assert_eq!(record.notation, "Rxh8+");
        assert!(!next.castling().black_king_side);
        assert!(!next.castling().white_king_side);
        assert!(next.castling().white_queen_side);
    }

    #[test]
    fn promotion_notation_and_revert() {
        let board = BoardState::from_fen("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let (next, record) = play(&board, "a7b8n");
        assert_eq!(record.notation, "axb8=N");
        assert_eq!(next.piece_at(sq("b8")), Some(Piece::new(Role::Knight, Color::White)));
        assert_eq!(record.revert(next.placement()), *board.placement());

        let (next, record) = play(&board, "a7a8");
        assert_eq!(record.promotion, Some(Role::Queen));
        assert_eq!(record.notation, "a8=Q");
        assert_eq!(next.piece_at(sq("a8")), Some(Piece::new(Role::Queen, Color::White)));
    }

    #[test]
    fn notation_disambiguates_by_file_then_rank() {
        let board = BoardState::from_fen("4k3/8/8/8/8/8/4K3/R6R w - - 0 1").unwrap();
        let (_, record) = play(&board, "a1d1");
        assert_eq!(record.notation, "Rad1");

        let board = BoardState::from_fen("4k3/R7/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let (_, record) = play(&board, "a1a4");
        assert_eq!(record.notation, "R1a4");
    }

    #[test]
    fn fools_mate_notation() {
        let (board, records) = MoveApplier::replay(
            &BoardState::initial(),
            &["f2f3", "e7e5", "g2g4", "d8h4"].map(|s| s.parse::<Move>().unwrap()),
        )
        .unwrap();
        let notations: Vec<&str> = records.iter().map(|r| r.notation.as_str()).collect();
        assert_eq!(notations, ["f3", "e5", "g4", "Qh4#"]);
        assert!(MoveGenerator::is_check(&board));
    }

    #[test]
    fn replay_rejects_illegal_moves() {
        let result = MoveApplier::replay(&BoardState::initial(), &["e2e5".parse().unwrap()]);
        assert_eq!(result.unwrap_err(), ChessError::IllegalMove("e2e5".to_string()));
    }

    #[test]
    fn history_grows_by_one_signature_per_ply() {
        let (board, _) = MoveApplier::replay(
            &BoardState::initial(),
            &["g1f3", "g8f6", "f3g1", "f6g8"].map(|s| s.parse::<Move>().unwrap()),
        )
        .unwrap();
        assert_eq!(board.history().len(), 5);
        assert_eq!(board.repetitions(), 2);
        assert_eq!(board.halfmove_clock(), 4);
    }
}
