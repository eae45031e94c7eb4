//! Move legality, check and terminal-state detection.
//!
//! Pipeline:
//!   1. [`can_basic_move`]: geometry and obstruction for one piece kind.
//!   2. [`is_legal_move`]: clone the board, play the move, reject it if the
//!      Generals now face each other or the mover's own General is attacked.
//!
//! Everything here is a pure function of the supplied board. Enumeration is
//! a plain row-major scan of every origin against every destination, so the
//! output order is deterministic.

use crate::engine::board::Board;
use crate::engine::types::{Move, Piece, PieceKind, Side, Square};

// =========================================================================
// Geometry
// =========================================================================

/// Whether `piece` standing on `from` may reach `to` by its movement rules
/// alone, ignoring self-check and facing Generals.
pub fn can_basic_move(board: &Board, piece: Piece, from: Square, to: Square) -> bool {
    let size = board.size();
    if !size.contains(from) || !size.contains(to) || from == to {
        return false;
    }
    if board.piece_at(to).is_some_and(|target| target.side == piece.side) {
        return false;
    }

    let dr = to.row - from.row;
    let dc = to.col - from.col;
    let side = piece.side;

    match piece.kind {
        PieceKind::General => dr.abs() + dc.abs() == 1 && size.in_palace(side, to),
        PieceKind::Advisor => dr.abs() == 1 && dc.abs() == 1 && size.in_palace(side, to),
        PieceKind::Elephant => {
            dr.abs() == 2
                && dc.abs() == 2
                && size.on_own_half(side, to.row)
                && board.piece_at(from.offset(dr / 2, dc / 2)).is_none()
        }
        PieceKind::Horse => {
            let leg = match (dr.abs(), dc.abs()) {
                (2, 1) => from.offset(dr / 2, 0),
                (1, 2) => from.offset(0, dc / 2),
                _ => return false,
            };
            board.piece_at(leg).is_none()
        }
        PieceKind::Rook => pieces_between(board, from, to) == Some(0),
        PieceKind::Cannon => match (pieces_between(board, from, to), board.piece_at(to)) {
            (Some(screens), None) => screens == 0,
            (Some(screens), Some(_)) => screens == 1,
            (None, _) => false,
        },
        PieceKind::Soldier => {
            let forward = dr == side.forward() && dc == 0;
            let crossed = !size.on_own_half(side, from.row);
            let sideways = crossed && dr == 0 && dc.abs() == 1;
            forward || sideways
        }
    }
}

/// Count pieces strictly between two squares on the same row or column.
/// `None` when the squares do not share a line.
fn pieces_between(board: &Board, from: Square, to: Square) -> Option<usize> {
    let (dr, dc) = match (to.row - from.row, to.col - from.col) {
        (0, 0) => return None,
        (0, dc) => (0, dc.signum()),
        (dr, 0) => (dr.signum(), 0),
        _ => return None,
    };
    let mut count = 0;
    let mut sq = from.offset(dr, dc);
    while sq != to {
        if board.piece_at(sq).is_some() {
            count += 1;
        }
        sq = sq.offset(dr, dc);
    }
    Some(count)
}

// =========================================================================
// Check detection
// =========================================================================

/// Both Generals on one file with nothing between them.
pub fn is_facing_general(board: &Board) -> bool {
    match (
        board.general_position(Side::Red),
        board.general_position(Side::Black),
    ) {
        (Some(red), Some(black)) => red.col == black.col && pieces_between(board, red, black) == Some(0),
        _ => false,
    }
}

/// Whether any opposing piece could move onto `side`'s General.
///
/// Generals have no ranged attack here: an open file between the two
/// Generals is not reported as check. That exposure is rejected by
/// [`is_legal_move`] instead. A side with no General is never in check.
pub fn is_in_check(board: &Board, side: Side) -> bool {
    let Some(general) = board.general_position(side) else {
        return false;
    };
    board
        .pieces()
        .any(|(sq, piece)| piece.side != side && can_basic_move(board, piece, sq, general))
}

// =========================================================================
// Legality
// =========================================================================

/// Full legality for `side` moving `from` → `to`: the origin must hold one
/// of `side`'s pieces, the geometry must allow it, and the position after
/// the move must neither expose facing Generals nor leave `side` in check.
pub fn is_legal_move(board: &Board, from: Square, to: Square, side: Side) -> bool {
    let Some(piece) = board.piece_at(from) else {
        return false;
    };
    if piece.side != side || !can_basic_move(board, piece, from, to) {
        return false;
    }

    let mut simulated = board.clone();
    simulated.move_piece(from.row, from.col, to.row, to.col);
    !is_facing_general(&simulated) && !is_in_check(&simulated, side)
}

/// Legal destinations for the piece on `(row, col)`, in row-major order.
/// Empty when the square is empty or off the board.
pub fn legal_moves_for_piece(board: &Board, row: i32, col: i32) -> Vec<Square> {
    let from = Square::new(row, col);
    let Some(piece) = board.piece_at(from) else {
        return Vec::new();
    };
    board
        .size()
        .squares()
        .filter(|&to| is_legal_move(board, from, to, piece.side))
        .collect()
}

/// Every legal move for `side`: origins in row-major order, then
/// destinations in row-major order.
pub fn generate_legal_moves(board: &Board, side: Side) -> Vec<Move> {
    let mut moves = Vec::with_capacity(64);
    for (from, piece) in board.pieces() {
        if piece.side != side {
            continue;
        }
        moves.extend(
            legal_moves_for_piece(board, from.row, from.col)
                .into_iter()
                .map(|to| Move::new(from, to)),
        );
    }
    moves
}

/// In check with no legal reply.
pub fn is_checkmate(board: &Board, side: Side) -> bool {
    is_in_check(board, side) && generate_legal_moves(board, side).is_empty()
}

/// Not in check but without any legal move.
pub fn is_stalemate(board: &Board, side: Side) -> bool {
    !is_in_check(board, side) && generate_legal_moves(board, side).is_empty()
}

// =========================================================================
// Tests
// =========================================================================
