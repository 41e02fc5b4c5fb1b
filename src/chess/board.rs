//! Board representation.
//!
//! `Placement` is the bare 64-square array; it is `Copy` and serves as the
//! scratch board for king-safety simulation. `BoardState` wraps a placement
//! with side to move, castling rights, en-passant target, clocks and the
//! repetition history. A `BoardState` is never mutated once handed out: the
//! move applier builds a new one for every ply.

use serde::{Deserialize, Serialize};

use super::types::{CastleSide, ChessError, ChessResult, Color, Move, Piece, Role, Square};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const BACK_RANK: [Role; 8] = [
    Role::Rook,
    Role::Knight,
    Role::Bishop,
    Role::Queen,
    Role::King,
    Role::Bishop,
    Role::Knight,
    Role::Rook,
];

// =============================================================================
// Placement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement([Option<Piece>; 64]);

impl Placement {
    #[must_use]
    pub const fn empty() -> Self {
        Self([None; 64])
    }

    #[must_use]
    pub fn starting() -> Self {
        let mut placement = Self::empty();
        for color in Color::ALL {
            for (file, role) in BACK_RANK.iter().enumerate() {
                placement.set(Square::new(file as u8, color.back_rank()), Some(Piece::new(*role, color)));
                placement.set(Square::new(file as u8, color.pawn_rank()), Some(Piece::new(Role::Pawn, color)));
            }
        }
        placement
    }

    #[inline]
    #[must_use]
    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.0[sq.index()]
    }

    #[inline]
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.0[sq.index()] = piece;
    }

    #[inline]
    pub fn take(&mut self, sq: Square) -> Option<Piece> {
        self.0[sq.index()].take()
    }

    /// Occupied squares in a1..h8 order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|p| (sq, p)))
    }

    #[must_use]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.role == Role::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    /// Plays `mv` on this placement without any legality check and returns the
    /// captured piece. Handles the en-passant capture square, the rook hop of
    /// castling, and promotion (queen when no role is given).
    pub fn play(&mut self, mv: &Move, en_passant: Option<Square>) -> Option<Piece> {
        let Some(piece) = self.take(mv.from) else {
            return None;
        };

        let mut captured = self.get(mv.to);

        if piece.role == Role::Pawn
            && captured.is_none()
            && mv.from.file() != mv.to.file()
            && Some(mv.to) == en_passant
        {
            captured = self.take(Square::new(mv.to.file(), mv.from.rank()));
        }

        if piece.role == Role::King && mv.from.file().abs_diff(mv.to.file()) == 2 {
            let side = if mv.to.file() > mv.from.file() { CastleSide::KingSide } else { CastleSide::QueenSide };
            let rank = mv.from.rank();
            let rook = self.take(Square::new(side.rook_from_file(), rank));
            self.set(Square::new(side.rook_to_file(), rank), rook);
        }

        let landed = if piece.role == Role::Pawn && mv.to.rank() == piece.color.promotion_rank() {
            Piece::new(mv.promotion.unwrap_or(Role::Queen), piece.color)
        } else {
            piece
        };
        self.set(mv.to, Some(landed));

        captured
    }

    /// Piece-placement field of FEN.
    #[must_use]
    pub fn fen_board(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.get(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    fn from_fen_board(board: &str) -> ChessResult<Self> {
        let rows: Vec<&str> = board.split('/').collect();
        if rows.len() != 8 {
            return Err(ChessError::InvalidFen(format!("expected 8 ranks, got {}", rows.len())));
        }

        let mut placement = Self::empty();
        for (i, row) in rows.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in row.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else {
                    let piece = Piece::from_fen_char(c)
                        .ok_or_else(|| ChessError::InvalidFen(format!("unknown piece '{c}'")))?;
                    if file >= 8 {
                        return Err(ChessError::InvalidFen(format!("rank {} overflows", rank + 1)));
                    }
                    placement.set(Square::new(file, rank), Some(piece));
                    file += 1;
                }
                if file > 8 {
                    return Err(ChessError::InvalidFen(format!("rank {} overflows", rank + 1)));
                }
            }
            if file != 8 {
                return Err(ChessError::InvalidFen(format!("rank {} has {} files", rank + 1, file)));
            }
        }
        Ok(placement)
    }
}

// =============================================================================
// Castling rights
// =============================================================================

/// Per-color, per-side castling permissions. Once revoked a right never comes
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastlingRights {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            white_king_side: true,
            white_queen_side: true,
            black_king_side: true,
            black_queen_side: true,
        }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            white_king_side: false,
            white_queen_side: false,
            black_king_side: false,
            black_queen_side: false,
        }
    }

    #[must_use]
    pub const fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::KingSide) => self.white_king_side,
            (Color::White, CastleSide::QueenSide) => self.white_queen_side,
            (Color::Black, CastleSide::KingSide) => self.black_king_side,
            (Color::Black, CastleSide::QueenSide) => self.black_queen_side,
        }
    }

    pub fn revoke(&mut self, color: Color, side: CastleSide) {
        let flag = match (color, side) {
            (Color::White, CastleSide::KingSide) => &mut self.white_king_side,
            (Color::White, CastleSide::QueenSide) => &mut self.white_queen_side,
            (Color::Black, CastleSide::KingSide) => &mut self.black_king_side,
            (Color::Black, CastleSide::QueenSide) => &mut self.black_queen_side,
        };
        *flag = false;
    }

    /// Revokes whatever right is tied to a king or rook start square that a
    /// move touches, either by leaving it or by capturing on it.
    pub fn touch(&mut self, sq: Square) {
        for color in Color::ALL {
            if sq.rank() != color.back_rank() {
                continue;
            }
            match sq.file() {
                4 => {
                    self.revoke(color, CastleSide::KingSide);
                    self.revoke(color, CastleSide::QueenSide);
                }
                7 => self.revoke(color, CastleSide::KingSide),
                0 => self.revoke(color, CastleSide::QueenSide),
                _ => {}
            }
        }
    }

    #[must_use]
    pub fn fen(&self) -> String {
        let mut out = String::new();
        if self.white_king_side {
            out.push('K');
        }
        if self.white_queen_side {
            out.push('Q');
        }
        if self.black_king_side {
            out.push('k');
        }
        if self.black_queen_side {
            out.push('q');
        }
        if out.is_empty() {
            out.push('-');
        }
        out
    }

    fn from_fen(field: &str) -> ChessResult<Self> {
        let mut rights = Self::none();
        if field == "-" {
            return Ok(rights);
        }
        for c in field.chars() {
            match c {
                'K' => rights.white_king_side = true,
                'Q' => rights.white_queen_side = true,
                'k' => rights.black_king_side = true,
                'q' => rights.black_queen_side = true,
                _ => return Err(ChessError::InvalidFen(format!("bad castling field '{field}'"))),
            }
        }
        Ok(rights)
    }

    /// Drops rights whose king or rook is not on its start square.
    fn sanitize(&mut self, placement: &Placement) {
        for color in Color::ALL {
            let rank = color.back_rank();
            let king_home = placement.get(Square::new(4, rank)) == Some(Piece::new(Role::King, color));
            for side in CastleSide::ALL {
                let rook_home =
                    placement.get(Square::new(side.rook_from_file(), rank)) == Some(Piece::new(Role::Rook, color));
                if !(king_home && rook_home) {
                    self.revoke(color, side);
                }
            }
        }
    }
}

// =============================================================================
// Board state
// =============================================================================

/// Full game position plus the history needed for repetition detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    pub(crate) placement: Placement,
    pub(crate) turn: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
    pub(crate) history: Vec<String>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::initial()
    }
}

impl BoardState {
    /// The standard starting position, white to move.
    #[must_use]
    pub fn initial() -> Self {
        let mut board = Self {
            placement: Placement::starting(),
            turn: Color::White,
            castling: CastlingRights::all(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            history: Vec::new(),
        };
        board.history.push(board.signature());
        board
    }

    /// Builds a position from FEN. The clock fields may be omitted.
    pub fn from_fen(fen: &str) -> ChessResult<Self> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return Err(ChessError::InvalidFen(format!("expected 4 to 6 fields, got {}", fields.len())));
        }

        let placement = Placement::from_fen_board(fields[0])?;
        for color in Color::ALL {
            let kings = placement
                .pieces()
                .filter(|(_, p)| p.role == Role::King && p.color == color)
                .count();
            if kings != 1 {
                return Err(ChessError::InvalidFen(format!("{color} must have exactly one king, found {kings}")));
            }
        }

        let turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(ChessError::InvalidFen(format!("bad side to move '{other}'"))),
        };

        let mut castling = CastlingRights::from_fen(fields[2])?;
        castling.sanitize(&placement);

        let en_passant = match fields[3] {
            "-" => None,
            sq => Some(sq.parse::<Square>().map_err(|e| ChessError::InvalidFen(e.to_string()))?),
        };

        let halfmove_clock = match fields.get(4) {
            Some(n) => n.parse().map_err(|_| ChessError::InvalidFen(format!("bad halfmove clock '{n}'")))?,
            None => 0,
        };
        let fullmove_number = match fields.get(5) {
            Some(n) => n.parse().map_err(|_| ChessError::InvalidFen(format!("bad fullmove number '{n}'")))?,
            None => 1,
        };

        let mut board = Self {
            placement,
            turn,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number: fullmove_number.max(1),
            history: Vec::new(),
        };
        board.history.push(board.signature());
        Ok(board)
    }

    #[must_use]
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.placement.fen_board(),
            self.turn.fen_char(),
            self.castling.fen(),
            self.en_passant.map_or_else(|| "-".to_string(), |sq| sq.to_string()),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    #[must_use]
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.placement.get(sq)
    }

    #[must_use]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[must_use]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    #[must_use]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Canonical encoding used for repetition: placement, side to move,
    /// castling rights and the en-passant target. The target only counts when
    /// a pawn of the side to move stands ready to take it, so a double push
    /// nobody can capture does not make an otherwise identical position
    /// distinct.
    #[must_use]
    pub fn signature(&self) -> String {
        let ep = match self.en_passant {
            Some(sq) if self.en_passant_capturable(sq) => sq.to_string(),
            _ => "-".to_string(),
        };
        format!("{} {} {} {}", self.placement.fen_board(), self.turn.fen_char(), self.castling.fen(), ep)
    }

    fn en_passant_capturable(&self, target: Square) -> bool {
        let pawn = Piece::new(Role::Pawn, self.turn);
        let behind = -self.turn.forward();
        [-1, 1]
            .into_iter()
            .filter_map(|df| target.offset(df, behind))
            .any(|sq| self.placement.get(sq) == Some(pawn))
    }

    /// How many times the current signature occurs in the history, including
    /// the current occurrence.
    #[must_use]
    pub fn repetitions(&self) -> usize {
        match self.history.last() {
            Some(current) => self.history.iter().filter(|sig| *sig == current).count(),
            None => 0,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            fen: self.to_fen(),
            pieces: self
                .placement
                .pieces()
                .map(|(square, piece)| PlacedPiece { square, role: piece.role, color: piece.color })
                .collect(),
            turn: self.turn,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        }
    }

    /// Rebuilds the position a snapshot describes. Repetition history starts
    /// over from the snapshot.
    pub fn from_snapshot(snapshot: &BoardSnapshot) -> ChessResult<Self> {
        Self::from_fen(&snapshot.fen)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPiece {
    pub square: Square,
    pub role: Role,
    pub color: Color,
}

/// Self-describing serialisation of a `BoardState`, sent with every event
/// that changes or announces the position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub fen: String,
    pub pieces: Vec<PlacedPiece>,
    pub turn: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn initial_matches_starting_fen() {
        let board = BoardState::initial();
        assert_eq!(board.to_fen(), STARTING_FEN);
        assert_eq!(BoardState::from_fen(STARTING_FEN).unwrap(), board);
        assert_eq!(board.history().len(), 1);
        assert_eq!(board.repetitions(), 1);
    }

    #[test]
    fn fen_requires_one_king_each() {
        assert!(BoardState::from_fen("8/8/8/8/8/8/8/K7 w - - 0 1").is_err());
        assert!(BoardState::from_fen("kk6/8/8/8/8/8/8/K7 w - - 0 1").is_err());
        assert!(BoardState::from_fen("k7/8/8/8/8/8/8/K7 w - - 0 1").is_ok());
    }

    #[test]
    fn fen_rejects_garbage() {
        assert!(BoardState::from_fen("").is_err());
        assert!(BoardState::from_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
        assert!(BoardState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
        assert!(BoardState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkz - 0 1").is_err());
    }

    #[test]
    fn castling_rights_need_pieces_at_home() {
        let board = BoardState::from_fen("r3k3/8/8/8/8/8/8/4K2R w KQkq - 0 1").unwrap();
        let rights = board.castling();
        assert!(rights.white_king_side);
        assert!(!rights.white_queen_side);
        assert!(!rights.black_king_side);
        assert!(rights.black_queen_side);
    }

    #[test]
    fn touching_start_squares_revokes_rights() {
        let mut rights = CastlingRights::all();
        rights.touch(sq("h1"));
        assert!(!rights.white_king_side);
        assert!(rights.white_queen_side);
        rights.touch(sq("e8"));
        assert!(!rights.black_king_side && !rights.black_queen_side);
        rights.touch(sq("d4"));
        assert!(rights.white_queen_side);
        assert_eq!(rights.fen(), "Q");
    }

    #[test]
    fn placement_play_handles_castling_and_en_passant() {
        let mut placement = BoardState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap().placement;
        placement.play(&Move::new(sq("e1"), sq("g1")), None);
        assert_eq!(placement.get(sq("f1")), Some(Piece::new(Role::Rook, Color::White)));
        assert_eq!(placement.get(sq("h1")), None);

        let mut placement = BoardState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap().placement;
        let captured = placement.play(&Move::new(sq("e5"), sq("d6")), Some(sq("d6")));
        assert_eq!(captured, Some(Piece::new(Role::Pawn, Color::Black)));
        assert_eq!(placement.get(sq("d5")), None);
        assert_eq!(placement.get(sq("d6")), Some(Piece::new(Role::Pawn, Color::White)));
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let mut placement = BoardState::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap().placement;
        placement.play(&Move::new(sq("a7"), sq("a8")), None);
        assert_eq!(placement.get(sq("a8")), Some(Piece::new(Role::Queen, Color::White)));
    }

    #[test]
    fn signature_ignores_uncapturable_en_passant() {
        let with_ep = BoardState::from_fen("4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1").unwrap();
        let without = BoardState::from_fen("4k3/8/8/8/4P3/8/8/4K3 b - - 0 1").unwrap();
        assert_eq!(with_ep.signature(), without.signature());

        let capturable = BoardState::from_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
        assert!(capturable.signature().ends_with("e3"));
    }

    #[test]
    fn snapshot_rebuilds_position() {
        let board = BoardState::from_fen("r3k2r/pp3ppp/8/3pP3/8/8/PP3PPP/R3K2R w KQkq d6 4 12").unwrap();
        let snapshot = board.snapshot();
        assert_eq!(snapshot.pieces.len(), 18);
        assert_eq!(snapshot.en_passant, Some(sq("d6")));
        let rebuilt = BoardState::from_snapshot(&snapshot).unwrap();
        assert_eq!(rebuilt.to_fen(), board.to_fen());
    }
}
