//! Core value types for the rules engine.
//!
//! Colors, roles, pieces, squares and moves are small `Copy` values. They are
//! serialisable so the session layer can put them on the wire directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while parsing rules-engine values from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChessError {
    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid piece role: {0}")]
    InvalidRole(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error("illegal move in replay: {0}")]
    IllegalMove(String),
}

pub type ChessResult<T> = Result<T, ChessError>;

// =============================================================================
// Color
// =============================================================================

/// Side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Rank index pawns of this color start on.
    #[must_use]
    pub const fn pawn_rank(self) -> u8 {
        match self {
            Self::White => 1,
            Self::Black => 6,
        }
    }

    /// Rank index on which pawns of this color promote.
    #[must_use]
    pub const fn promotion_rank(self) -> u8 {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }

    /// Back rank, where king and rooks start.
    #[must_use]
    pub const fn back_rank(self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    /// Direction of pawn advance along ranks.
    #[must_use]
    pub const fn forward(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    #[must_use]
    pub const fn fen_char(self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

// =============================================================================
// Role
// =============================================================================

/// Piece type. Single-letter aliases let clients send `"q"` for a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "p")]
    Pawn,
    #[serde(alias = "n")]
    Knight,
    #[serde(alias = "b")]
    Bishop,
    #[serde(alias = "r")]
    Rook,
    #[serde(alias = "q")]
    Queen,
    #[serde(alias = "k")]
    King,
}

impl Role {
    /// Roles a pawn may promote to.
    pub const PROMOTIONS: [Role; 4] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight];

    /// Uppercase letter used by FEN (white) and SAN.
    #[must_use]
    pub const fn upper_char(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_minor(self) -> bool {
        matches!(self, Self::Knight | Self::Bishop)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Role::from_char(c).ok_or_else(|| ChessError::InvalidRole(s.to_string()));
        }
        match s.to_ascii_lowercase().as_str() {
            "pawn" => Ok(Self::Pawn),
            "knight" => Ok(Self::Knight),
            "bishop" => Ok(Self::Bishop),
            "rook" => Ok(Self::Rook),
            "queen" => Ok(Self::Queen),
            "king" => Ok(Self::King),
            _ => Err(ChessError::InvalidRole(s.to_string())),
        }
    }
}

// =============================================================================
// Piece
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub role: Role,
    pub color: Color,
}

impl Piece {
    #[must_use]
    pub const fn new(role: Role, color: Color) -> Self {
        Self { role, color }
    }

    /// FEN letter: uppercase for white, lowercase for black.
    #[must_use]
    pub fn fen_char(self) -> char {
        let c = self.role.upper_char();
        match self.color {
            Color::White => c,
            Color::Black => c.to_ascii_lowercase(),
        }
    }

    #[must_use]
    pub fn from_fen_char(c: char) -> Option<Self> {
        let role = Role::from_char(c)?;
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        Some(Self { role, color })
    }
}

// =============================================================================
// Square
// =============================================================================

/// Board coordinate, stored as `file + 8 * rank` (a1 = 0, h8 = 63).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square(u8);

impl Square {
    #[must_use]
    pub const fn new(file: u8, rank: u8) -> Self {
        debug_assert!(file < 8 && rank < 8);
        Self(file + 8 * rank)
    }

    /// Builds a square from signed coordinates, `None` when off the board.
    #[must_use]
    pub fn from_coords(file: i8, rank: i8) -> Option<Self> {
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Self::new(file as u8, rank as u8))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 64 {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    /// The square `(df, dr)` away, if it is still on the board.
    #[must_use]
    pub fn offset(self, df: i8, dr: i8) -> Option<Self> {
        Self::from_coords(self.file() as i8 + df, self.rank() as i8 + dr)
    }

    /// True for dark squares (a1 is dark).
    #[must_use]
    pub const fn is_dark(self) -> bool {
        (self.file() + self.rank()) % 2 == 0
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64u8).map(Square)
    }

    #[must_use]
    pub fn file_char(self) -> char {
        (b'a' + self.file()) as char
    }

    #[must_use]
    pub fn rank_char(self) -> char {
        (b'1' + self.rank()) as char
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Square {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        match bytes {
            [f @ b'a'..=b'h', r @ b'1'..=b'8'] => Ok(Square::new(f - b'a', r - b'1')),
            _ => Err(ChessError::InvalidSquare(s.to_string())),
        }
    }
}

impl TryFrom<String> for Square {
    type Error = ChessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(sq: Square) -> Self {
        sq.to_string()
    }
}

// =============================================================================
// Move
// =============================================================================

/// Castling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl CastleSide {
    pub const ALL: [CastleSide; 2] = [CastleSide::KingSide, CastleSide::QueenSide];

    /// File the king lands on.
    #[must_use]
    pub const fn king_to_file(self) -> u8 {
        match self {
            Self::KingSide => 6,
            Self::QueenSide => 2,
        }
    }

    /// File the rook starts on.
    #[must_use]
    pub const fn rook_from_file(self) -> u8 {
        match self {
            Self::KingSide => 7,
            Self::QueenSide => 0,
        }
    }

    /// File the rook lands on.
    #[must_use]
    pub const fn rook_to_file(self) -> u8 {
        match self {
            Self::KingSide => 5,
            Self::QueenSide => 3,
        }
    }
}

/// A move as (from, to, promotion). Castling is encoded as the king's
/// two-square step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Role>,
}

impl Move {
    #[must_use]
    pub const fn new(from: Square, to: Square) -> Self {
        Self { from, to, promotion: None }
    }

    #[must_use]
    pub const fn with_promotion(from: Square, to: Square, role: Role) -> Self {
        Self { from, to, promotion: Some(role) }
    }

    /// Long algebraic form, e.g. `e7e8q`.
    #[must_use]
    pub fn to_uci(&self) -> String {
        match self.promotion {
            Some(role) => format!("{}{}{}", self.from, self.to, role.upper_char().to_ascii_lowercase()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

impl FromStr for Move {
    type Err = ChessError;

    /// Parses long algebraic notation (`e2e4`, `e7e8q`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !(4..=5).contains(&s.len()) || !s.is_ascii() {
            return Err(ChessError::IllegalMove(s.to_string()));
        }
        let from: Square = s[0..2].parse()?;
        let to: Square = s[2..4].parse()?;
        let promotion = match s[4..].chars().next() {
            Some(c) => Some(Role::from_char(c).ok_or_else(|| ChessError::InvalidRole(c.to_string()))?),
            None => None,
        };
        Ok(Self { from, to, promotion })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_text_form() {
        let sq: Square = "e4".parse().unwrap();
        assert_eq!(sq.file(), 4);
        assert_eq!(sq.rank(), 3);
        assert_eq!(sq.to_string(), "e4");
        assert!("i1".parse::<Square>().is_err());
        assert!("a9".parse::<Square>().is_err());
        assert!("".parse::<Square>().is_err());
    }

    #[test]
    fn square_offsets_stay_on_board() {
        let h8: Square = "h8".parse().unwrap();
        assert_eq!(h8.offset(1, 0), None);
        assert_eq!(h8.offset(-1, -1), Some("g7".parse().unwrap()));
        assert!(Square::new(0, 0).is_dark());
        assert!(!Square::new(7, 0).is_dark());
    }

    #[test]
    fn role_accepts_letters_and_names() {
        assert_eq!("q".parse::<Role>().unwrap(), Role::Queen);
        assert_eq!("Knight".parse::<Role>().unwrap(), Role::Knight);
        assert!("x".parse::<Role>().is_err());
        let from_json: Role = serde_json::from_str("\"n\"").unwrap();
        assert_eq!(from_json, Role::Knight);
    }

    #[test]
    fn move_uci_form() {
        let mv: Move = "e7e8q".parse().unwrap();
        assert_eq!(mv.promotion, Some(Role::Queen));
        assert_eq!(mv.to_string(), "e7e8q");
        assert!("e7".parse::<Move>().is_err());
    }

    #[test]
    fn square_serializes_as_text() {
        let sq = Square::new(6, 0);
        assert_eq!(serde_json::to_string(&sq).unwrap(), "\"g1\"");
        let back: Square = serde_json::from_str("\"g1\"").unwrap();
        assert_eq!(back, sq);
    }
}
