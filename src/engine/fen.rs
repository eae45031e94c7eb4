//! Xiangqi FEN import/export.
//!
//! Only the first two fields matter here: piece placement (Black's back rank
//! first) and the side to move (`w`/`r` for Red, `b` for Black). Trailing
//! fields such as `- - 0 1` are accepted and ignored.

use crate::engine::board::Board;
use crate::engine::types::{BoardSize, Piece, Side, XiangqiError};

/// FEN of the standard opening position.
pub const START_FEN: &str = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1";

/// Parse a FEN string into a board and side to move. The board size is
/// taken from the placement field and must be a valid [`BoardSize`].
pub fn parse_fen(fen: &str) -> Result<(Board, Side), XiangqiError> {
    let mut fields = fen.split_whitespace();
    let placement = fields
        .next()
        .ok_or_else(|| XiangqiError::InvalidFen("empty string".to_string()))?;

    let side = match fields.next() {
        None | Some("w") | Some("r") => Side::Red,
        Some("b") => Side::Black,
        Some(other) => {
            return Err(XiangqiError::InvalidFen(format!(
                "invalid side to move: '{other}'"
            )));
        }
    };

    let ranks: Vec<&str> = placement.split('/').collect();
    let mut rows: Vec<Vec<Option<Piece>>> = Vec::with_capacity(ranks.len());
    for (row, rank) in ranks.iter().enumerate() {
        let mut cells = Vec::new();
        let mut digits = String::new();
        for ch in rank.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            flush_empty(&mut digits, &mut cells, row)?;
            let piece = Piece::from_char(ch).ok_or_else(|| {
                XiangqiError::InvalidFen(format!("invalid character '{ch}' in rank {row}"))
            })?;
            cells.push(Some(piece));
        }
        flush_empty(&mut digits, &mut cells, row)?;
        rows.push(cells);
    }

    let width = rows.first().map_or(0, Vec::len);
    if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(XiangqiError::InvalidFen(format!(
            "rank {row} has {} squares, expected {width}",
            cells.len()
        )));
    }

    let size = BoardSize::new(rows.len() as i32, width as i32)
        .map_err(|e| XiangqiError::InvalidFen(e.to_string()))?;
    let mut board = Board::empty(size);
    for (row, cells) in rows.into_iter().enumerate() {
        for (col, cell) in cells.into_iter().enumerate() {
            board.set_piece(row as i32, col as i32, cell);
        }
    }
    Ok((board, side))
}

fn flush_empty(
    digits: &mut String,
    cells: &mut Vec<Option<Piece>>,
    row: usize,
) -> Result<(), XiangqiError> {
    if digits.is_empty() {
        return Ok(());
    }
    let n: usize = digits
        .parse()
        .ok()
        .filter(|&n| (1..=64).contains(&n))
        .ok_or_else(|| {
            XiangqiError::InvalidFen(format!("invalid empty count '{digits}' in rank {row}"))
        })?;
    cells.extend(std::iter::repeat_n(None, n));
    digits.clear();
    Ok(())
}

/// Export placement and side to move. The trailing fields are always
/// `- - 0 1` since the engine tracks no move counters.
pub fn to_fen(board: &Board, side: Side) -> String {
    let mut fen = String::with_capacity(96);
    for row in 0..board.rows() {
        let mut empty = 0;
        for col in 0..board.cols() {
            match board.get_piece(row, col) {
                Some(piece) => {
                    if empty > 0 {
                        fen.push_str(&empty.to_string());
                        empty = 0;
                    }
                    fen.push(piece.to_char());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            fen.push_str(&empty.to_string());
        }
        if row + 1 < board.rows() {
            fen.push('/');
        }
    }
    fen.push(' ');
    fen.push(match side {
        Side::Red => 'w',
        Side::Black => 'b',
    });
    fen.push_str(" - - 0 1");
    fen
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
