//! Grid-based Xiangqi board.
//!
//! `Board` stores one `Option<Piece>` per cell in row-major order. Every
//! accessor bounds-checks its coordinates and quietly ignores off-board
//! input, since clicks outside the grid are ordinary UI noise. The board
//! knows nothing about legality; see [`crate::engine::rules`].

use crate::engine::types::{BoardSize, Piece, PieceKind, Side, Square};

/// A Xiangqi board. `Clone` yields a fully independent copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: BoardSize,
    cells: Vec<Option<Piece>>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Board {
    /// An empty board of the given size.
    pub fn empty(size: BoardSize) -> Self {
        Board {
            size,
            cells: vec![None; size.cells()],
        }
    }

    /// A standard 10×9 board in the opening position.
    pub fn starting() -> Self {
        Self::starting_with_size(BoardSize::STANDARD)
    }

    /// A board of the given size in the opening position.
    pub fn starting_with_size(size: BoardSize) -> Self {
        let mut board = Self::empty(size);
        board.setup_initial();
        board
    }

    /// Reset to the opening position.
    ///
    /// On wider boards the outer pieces stay on the edge files and the
    /// palace pieces on the centre files. Soldiers stand on every other file
    /// counted out from the centre, so one always screens the Generals.
    pub fn setup_initial(&mut self) {
        self.clear();
        let size = self.size;
        let last = size.cols() - 1;
        let center = size.center_col();

        for side in [Side::Black, Side::Red] {
            let home = size.home_row(side);
            let cannon_row = home + 2 * side.forward();
            let soldier_row = home + 3 * side.forward();

            let back_rank = [
                (0, PieceKind::Rook),
                (last, PieceKind::Rook),
                (1, PieceKind::Horse),
                (last - 1, PieceKind::Horse),
                (2, PieceKind::Elephant),
                (last - 2, PieceKind::Elephant),
                (center - 1, PieceKind::Advisor),
                (center + 1, PieceKind::Advisor),
                (center, PieceKind::General),
            ];
            for (col, kind) in back_rank {
                self.set_piece(home, col, Some(Piece::new(kind, side)));
            }

            let cannon = Some(Piece::new(PieceKind::Cannon, side));
            self.set_piece(cannon_row, 1, cannon);
            self.set_piece(cannon_row, last - 1, cannon);

            for col in (center % 2..size.cols()).step_by(2) {
                self.set_piece(soldier_row, col, Some(Piece::new(PieceKind::Soldier, side)));
            }
        }
    }

    /// Remove every piece.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl Board {
    #[inline]
    pub fn size(&self) -> BoardSize {
        self.size
    }

    #[inline]
    pub fn rows(&self) -> i32 {
        self.size.rows()
    }

    #[inline]
    pub fn cols(&self) -> i32 {
        self.size.cols()
    }

    /// Piece at `(row, col)`, `None` when empty or off the board.
    #[inline]
    pub fn get_piece(&self, row: i32, col: i32) -> Option<Piece> {
        self.piece_at(Square::new(row, col))
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.size.index(sq).and_then(|i| self.cells[i])
    }

    /// Write a cell. Off-board coordinates are ignored.
    pub fn set_piece(&mut self, row: i32, col: i32, piece: Option<Piece>) {
        if let Some(i) = self.size.index(Square::new(row, col)) {
            self.cells[i] = piece;
        }
    }

    /// Relocate whatever stands on `from` to `to`, returning the piece that
    /// was overwritten there. No legality checks are made.
    ///
    /// Off-board coordinates, or `from == to`, leave the board unchanged and
    /// return `None`.
    pub fn move_piece(
        &mut self,
        from_row: i32,
        from_col: i32,
        to_row: i32,
        to_col: i32,
    ) -> Option<Piece> {
        let from = self.size.index(Square::new(from_row, from_col))?;
        let to = self.size.index(Square::new(to_row, to_col))?;
        if from == to {
            return None;
        }
        let moving = self.cells[from].take();
        std::mem::replace(&mut self.cells[to], moving)
    }

    /// Location of `side`'s General: the first one found in row-major order.
    pub fn general_position(&self, side: Side) -> Option<Square> {
        let general = Piece::new(PieceKind::General, side);
        self.pieces()
            .find(|&(_, piece)| piece == general)
            .map(|(sq, _)| sq)
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.size
            .squares()
            .zip(self.cells.iter())
            .filter_map(|(sq, cell)| cell.map(|piece| (sq, piece)))
    }

    /// Number of pieces currently on the board.
    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    /// The grid as nested rows, top row first.
    pub fn to_grid(&self) -> Vec<Vec<Option<Piece>>> {
        self.cells
            .chunks(self.size.cols() as usize)
            .map(<[Option<Piece>]>::to_vec)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Board display
// ---------------------------------------------------------------------------

impl Board {
    /// Render the board as text, Black's back rank at the top. With
    /// `chinese` set pieces show as glyphs, otherwise as doubled FEN letters.
    pub fn board_string(&self, chinese: bool) -> String {
        let mut s = String::with_capacity(512);
        let river = self.rows() / 2;
        let width = (self.rows() - 1).to_string().len();
        let margin = " ".repeat(width + 1);
        for row in 0..self.rows() {
            if row == river {
                s.push_str(&margin);
                s.push_str(&"~~~".repeat(self.cols() as usize));
                s.push('\n');
            }
            s.push_str(&format!("{:>width$} ", self.rows() - 1 - row));
            for col in 0..self.cols() {
                match self.get_piece(row, col) {
                    Some(p) if chinese => {
                        s.push(p.glyph());
                        s.push(' ');
                    }
                    Some(p) => {
                        s.push(p.to_char());
                        s.push(p.to_char());
                        s.push(' ');
                    }
                    None => s.push_str(" . "),
                }
            }
            s.push('\n');
        }
        s.push_str(&margin);
        for col in 0..self.cols() {
            s.push_str(&file_label(col, self.cols()));
        }
        s
    }
}

/// Three-character file label: a letter while the alphabet suffices,
/// otherwise the column number.
fn file_label(col: i32, cols: i32) -> String {
    if cols <= 26 {
        format!(" {} ", (b'a' + col as u8) as char)
    } else {
        format!("{col:^3}")
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.board_string(true))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
