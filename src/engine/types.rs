use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::snapshot::SnapshotError;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// The two sides in a Xiangqi game. Red moves first and sits at the bottom
/// (high row numbers); Black sits at the top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Red,
    Black,
}

impl Side {
    /// Row delta of a forward soldier step.
    #[inline]
    pub const fn forward(self) -> i32 {
        match self {
            Side::Red => -1,
            Side::Black => 1,
        }
    }

    /// Chinese name used in game-over messages.
    pub fn name_zh(self) -> &'static str {
        match self {
            Side::Red => "红方",
            Side::Black => "黑方",
        }
    }
}

impl std::ops::Not for Side {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Side::Red => Side::Black,
            Side::Black => Side::Red,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Red => write!(f, "red"),
            Side::Black => write!(f, "black"),
        }
    }
}

// ---------------------------------------------------------------------------
// PieceKind
// ---------------------------------------------------------------------------

/// The seven piece kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    General,
    Advisor,
    Elephant,
    Horse,
    Rook,
    Cannon,
    Soldier,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::General,
        PieceKind::Advisor,
        PieceKind::Elephant,
        PieceKind::Horse,
        PieceKind::Rook,
        PieceKind::Cannon,
        PieceKind::Soldier,
    ];

    /// FEN letter: uppercase for Red, lowercase for Black.
    pub fn to_char(self, side: Side) -> char {
        let c = match self {
            PieceKind::General => 'k',
            PieceKind::Advisor => 'a',
            PieceKind::Elephant => 'b',
            PieceKind::Horse => 'n',
            PieceKind::Rook => 'r',
            PieceKind::Cannon => 'c',
            PieceKind::Soldier => 'p',
        };
        match side {
            Side::Red => c.to_ascii_uppercase(),
            Side::Black => c,
        }
    }

    /// Parse a FEN letter. Also accepts the `e`/`h` aliases some tools
    /// emit for elephant and horse.
    pub fn from_char(c: char) -> Option<(Side, PieceKind)> {
        let side = if c.is_ascii_uppercase() {
            Side::Red
        } else {
            Side::Black
        };
        let kind = match c.to_ascii_lowercase() {
            'k' => PieceKind::General,
            'a' => PieceKind::Advisor,
            'b' | 'e' => PieceKind::Elephant,
            'n' | 'h' => PieceKind::Horse,
            'r' => PieceKind::Rook,
            'c' => PieceKind::Cannon,
            'p' => PieceKind::Soldier,
            _ => return None,
        };
        Some((side, kind))
    }

    /// Traditional glyph for the piece on the given side.
    pub fn glyph(self, side: Side) -> char {
        match (side, self) {
            (Side::Red, PieceKind::General) => '帥',
            (Side::Red, PieceKind::Advisor) => '仕',
            (Side::Red, PieceKind::Elephant) => '相',
            (Side::Red, PieceKind::Horse) => '傌',
            (Side::Red, PieceKind::Rook) => '俥',
            (Side::Red, PieceKind::Cannon) => '炮',
            (Side::Red, PieceKind::Soldier) => '兵',
            (Side::Black, PieceKind::General) => '將',
            (Side::Black, PieceKind::Advisor) => '士',
            (Side::Black, PieceKind::Elephant) => '象',
            (Side::Black, PieceKind::Horse) => '馬',
            (Side::Black, PieceKind::Rook) => '車',
            (Side::Black, PieceKind::Cannon) => '砲',
            (Side::Black, PieceKind::Soldier) => '卒',
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceKind::General => write!(f, "general"),
            PieceKind::Advisor => write!(f, "advisor"),
            PieceKind::Elephant => write!(f, "elephant"),
            PieceKind::Horse => write!(f, "horse"),
            PieceKind::Rook => write!(f, "rook"),
            PieceKind::Cannon => write!(f, "cannon"),
            PieceKind::Soldier => write!(f, "soldier"),
        }
    }
}

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// A piece is just its kind and side; two red horses are interchangeable.
///
/// Serializes as `{"type": "horse", "side": "red"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub side: Side,
}

impl Piece {
    #[inline]
    pub const fn new(kind: PieceKind, side: Side) -> Self {
        Piece { kind, side }
    }

    pub fn to_char(self) -> char {
        self.kind.to_char(self.side)
    }

    pub fn from_char(c: char) -> Option<Self> {
        PieceKind::from_char(c).map(|(side, kind)| Piece::new(kind, side))
    }

    pub fn glyph(self) -> char {
        self.kind.glyph(self.side)
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.side, self.kind)
    }
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// A board coordinate. Row 0 is Black's back rank, column 0 is the left
/// file as seen by Red.
///
/// Coordinates are signed so that off-board input can be represented and
/// rejected by bounds checks instead of wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub row: i32,
    pub col: i32,
}

impl Square {
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Square { row, col }
    }

    #[inline]
    pub const fn offset(self, dr: i32, dc: i32) -> Self {
        Square {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Parse ICCS notation such as `"h2"`: file letter from `a`, rank digit
    /// counted from Red's back rank.
    pub fn from_iccs(s: &str, size: BoardSize) -> Option<Self> {
        let bytes = s.as_bytes();
        if !size.supports_iccs() || bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a') as i32;
        let rank = bytes[1].wrapping_sub(b'0') as i32;
        let sq = Square::new(size.rows() - 1 - rank, file);
        size.contains(sq).then_some(sq)
    }

    /// ICCS notation for this square, `None` if it does not fit on `size`.
    pub fn to_iccs(self, size: BoardSize) -> Option<String> {
        if !size.supports_iccs() || !size.contains(self) {
            return None;
        }
        let file = (b'a' + self.col as u8) as char;
        let rank = size.rows() - 1 - self.row;
        Some(format!("{file}{rank}"))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub const fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }

    /// Parse a four-character ICCS move such as `"h2e2"`.
    pub fn from_iccs(s: &str, size: BoardSize) -> Result<Self, XiangqiError> {
        let s = s.trim();
        if !size.supports_iccs() {
            return Err(XiangqiError::InvalidSquare(format!(
                "'{s}': a {size} board has no ICCS names"
            )));
        }
        if s.len() != 4 || !s.is_ascii() {
            return Err(XiangqiError::InvalidSquare(format!("'{s}' is not a move")));
        }
        let square = |part: &str| {
            Square::from_iccs(part, size)
                .ok_or_else(|| XiangqiError::InvalidSquare(format!("'{part}' is off the board")))
        };
        Ok(Move::new(square(&s[..2])?, square(&s[2..])?))
    }

    pub fn to_iccs(self, size: BoardSize) -> Option<String> {
        Some(format!(
            "{}{}",
            self.from.to_iccs(size)?,
            self.to.to_iccs(size)?
        ))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// BoardSize
// ---------------------------------------------------------------------------

/// Board dimensions plus the palace and river geometry derived from them.
///
/// Rows must be even (the river splits the board in half) and columns odd
/// (the palace is centred), with 10×9 as the minimum and the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoardSize {
    rows: i32,
    cols: i32,
}

impl BoardSize {
    pub const STANDARD: BoardSize = BoardSize { rows: 10, cols: 9 };

    pub fn new(rows: i32, cols: i32) -> Result<Self, XiangqiError> {
        let rows_ok = (10..=64).contains(&rows) && rows % 2 == 0;
        let cols_ok = (9..=63).contains(&cols) && cols % 2 == 1;
        if !rows_ok || !cols_ok {
            return Err(XiangqiError::InvalidBoardSize { rows, cols });
        }
        Ok(BoardSize { rows, cols })
    }

    #[inline]
    pub const fn rows(self) -> i32 {
        self.rows
    }

    #[inline]
    pub const fn cols(self) -> i32 {
        self.cols
    }

    /// Number of cells on the board.
    #[inline]
    pub const fn cells(self) -> usize {
        (self.rows * self.cols) as usize
    }

    #[inline]
    pub fn contains(self, sq: Square) -> bool {
        (0..self.rows).contains(&sq.row) && (0..self.cols).contains(&sq.col)
    }

    /// Row-major cell index, `None` when out of bounds.
    #[inline]
    pub fn index(self, sq: Square) -> Option<usize> {
        if self.contains(sq) {
            Some((sq.row * self.cols + sq.col) as usize)
        } else {
            None
        }
    }

    /// All squares, top-to-bottom then left-to-right.
    pub fn squares(self) -> impl Iterator<Item = Square> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Square::new(row, col)))
    }

    /// Centre file (the General's file).
    #[inline]
    pub const fn center_col(self) -> i32 {
        self.cols / 2
    }

    /// ICCS names files `a`..`z` and ranks with one digit, so it only
    /// covers boards up to 10 rows and 26 files.
    #[inline]
    pub const fn supports_iccs(self) -> bool {
        self.rows <= 10 && self.cols <= 26
    }

    /// Whether `row` lies on `side`'s half of the river.
    #[inline]
    pub fn on_own_half(self, side: Side, row: i32) -> bool {
        match side {
            Side::Red => row >= self.rows / 2,
            Side::Black => row < self.rows / 2,
        }
    }

    /// Whether `sq` is inside `side`'s 3×3 palace.
    pub fn in_palace(self, side: Side, sq: Square) -> bool {
        let c = self.center_col();
        if sq.col < c - 1 || sq.col > c + 1 {
            return false;
        }
        match side {
            Side::Black => (0..3).contains(&sq.row),
            Side::Red => (self.rows - 3..self.rows).contains(&sq.row),
        }
    }

    /// Back rank row for `side`.
    #[inline]
    pub const fn home_row(self, side: Side) -> i32 {
        match side {
            Side::Red => self.rows - 1,
            Side::Black => 0,
        }
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        BoardSize::STANDARD
    }
}

impl fmt::Display for BoardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    Checkmate { winner: Side },
    Stalemate,
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Checkmate { .. } => "checkmate",
            Outcome::Stalemate => "stalemate",
        }
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            Outcome::Checkmate { winner } => Some(*winner),
            Outcome::Stalemate => None,
        }
    }

    /// Human-readable reason shown to players.
    pub fn reason(&self) -> String {
        match self {
            Outcome::Checkmate { winner } => format!("将死！{}获胜", winner.name_zh()),
            Outcome::Stalemate => "困毙，和棋".to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// XiangqiError
// ---------------------------------------------------------------------------

/// Domain errors for the engine and its storage shell.
#[derive(Debug, thiserror::Error)]
pub enum XiangqiError {
    #[error("invalid board size {rows}x{cols}: rows must be even and >= 10, cols odd and >= 9")]
    InvalidBoardSize { rows: i32, cols: i32 },

    #[error("invalid FEN string: {0}")]
    InvalidFen(String),

    #[error("invalid square notation: {0}")]
    InvalidSquare(String),

    #[error("illegal move: {from} -> {to}")]
    IllegalMove { from: Square, to: Square },

    #[error("game is already over: {0}")]
    GameOver(String),

    #[error("malformed saved state: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("no saved state found at {}", .0.display())]
    NoSavedState(PathBuf),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode saved state: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
