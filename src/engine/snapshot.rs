//! Persisted game state: board grid plus side to move.
//!
//! Wire shape (camelCase):
//!
//! ```json
//! {
//!   "sideToMove": "red",
//!   "board": [[{"type": "rook", "side": "black"}, null, ...], ...],
//!   "savedAt": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! Loading goes through [`GameEngine::apply_snapshot`], which validates the
//! whole document before touching the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::engine::board::Board;
use crate::engine::game::GameEngine;
use crate::engine::types::{BoardSize, Piece, Side};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub side_to_move: Side,
    pub board: Vec<Vec<Option<Piece>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// SnapshotError
// ---------------------------------------------------------------------------

/// Why a persisted document could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("not valid JSON: {0}")]
    Malformed(String),

    #[error("saved state is not a JSON object")]
    NotAnObject,

    #[error("missing 'board' grid")]
    MissingGrid,

    #[error("'board' is not an array")]
    GridNotArray,

    #[error("expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("row {row} is not an array")]
    RowNotArray { row: usize },

    #[error("row {row}: expected {expected} cells, found {found}")]
    ColCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("cell ({row},{col}): {reason}")]
    InvalidCell {
        row: usize,
        col: usize,
        reason: String,
    },

    #[error("missing 'sideToMove'")]
    MissingSide,

    #[error("invalid side to move: {0}")]
    InvalidSide(String),
}

/// Validate `value` as a snapshot for a board of `size`.
pub fn parse_snapshot(value: &Value, size: BoardSize) -> Result<(Board, Side), SnapshotError> {
    let obj = value.as_object().ok_or(SnapshotError::NotAnObject)?;

    let grid = obj.get("board").ok_or(SnapshotError::MissingGrid)?;
    let grid = grid.as_array().ok_or(SnapshotError::GridNotArray)?;
    let rows = size.rows() as usize;
    let cols = size.cols() as usize;
    if grid.len() != rows {
        return Err(SnapshotError::RowCount {
            expected: rows,
            found: grid.len(),
        });
    }

    let mut board = Board::empty(size);
    for (r, row) in grid.iter().enumerate() {
        let row = row.as_array().ok_or(SnapshotError::RowNotArray { row: r })?;
        if row.len() != cols {
            return Err(SnapshotError::ColCount {
                row: r,
                expected: cols,
                found: row.len(),
            });
        }
        for (c, cell) in row.iter().enumerate() {
            if cell.is_null() {
                continue;
            }
            let piece = Piece::deserialize(cell).map_err(|e| SnapshotError::InvalidCell {
                row: r,
                col: c,
                reason: e.to_string(),
            })?;
            board.set_piece(r as i32, c as i32, Some(piece));
        }
    }

    let side = obj.get("sideToMove").ok_or(SnapshotError::MissingSide)?;
    let side =
        Side::deserialize(side).map_err(|_| SnapshotError::InvalidSide(side.to_string()))?;

    Ok((board, side))
}

// ---------------------------------------------------------------------------
// GameEngine integration
// ---------------------------------------------------------------------------

impl GameEngine {
    /// Capture board and side to move, stamped with the current time.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            side_to_move: self.side_to_move(),
            board: self.board().to_grid(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Replace board and side to move from a persisted document. History,
    /// redo, selection and game-over state are reset. On error the engine
    /// is left exactly as it was.
    pub fn apply_snapshot(&mut self, value: &Value) -> Result<(), SnapshotError> {
        let (board, side) = parse_snapshot(value, self.board().size())?;
        self.reset_to(board, side);
        info!(game_id = %self.id, %side, pieces = self.board().piece_count(), "snapshot applied");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Move, PieceKind, Square};
    use serde_json::json;

    fn played_engine() -> GameEngine {
        let mut g = GameEngine::new();
        g.play(Move::new(Square::new(7, 1), Square::new(7, 4))).unwrap();
        g
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let g = GameEngine::new();
        let v = serde_json::to_value(g.snapshot()).unwrap();
        assert_eq!(v["sideToMove"], "red");
        assert_eq!(v["board"][0][0], json!({"type": "rook", "side": "black"}));
        assert_eq!(v["board"][9][4], json!({"type": "general", "side": "red"}));
        assert!(v["board"][1][0].is_null());
        assert!(v["savedAt"].is_string());
    }

    #[test]
    fn round_trip_resets_history() {
        let source = played_engine();
        let value = serde_json::to_value(source.snapshot()).unwrap();

        let mut target = GameEngine::new();
        target.play(Move::new(Square::new(6, 0), Square::new(5, 0))).unwrap();
        target.undo();
        assert!(target.select_square(9, 0));

        target.apply_snapshot(&value).unwrap();
        assert_eq!(target.board(), source.board());
        assert_eq!(target.side_to_move(), Side::Black);
        assert!(!target.can_undo());
        assert!(!target.can_redo());
        assert_eq!(target.selected(), None);
    }

    #[test]
    fn saved_at_is_optional() {
        let mut value = serde_json::to_value(GameEngine::new().snapshot()).unwrap();
        value.as_object_mut().unwrap().remove("savedAt");
        let snap: Snapshot = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(snap.saved_at, None);
        GameEngine::new().apply_snapshot(&value).unwrap();
    }

    /// Error from applying a fresh opening snapshot after `edit`.
    fn broken(edit: impl FnOnce(&mut Value)) -> SnapshotError {
        let mut v = serde_json::to_value(GameEngine::new().snapshot()).unwrap();
        edit(&mut v);
        parse_snapshot(&v, BoardSize::STANDARD).unwrap_err()
    }

    #[test]
    fn rejects_each_malformed_shape() {
        assert_eq!(
            parse_snapshot(&json!([1, 2]), BoardSize::STANDARD).unwrap_err(),
            SnapshotError::NotAnObject
        );
        assert_eq!(
            broken(|v| {
                v.as_object_mut().unwrap().remove("board");
            }),
            SnapshotError::MissingGrid
        );
        assert_eq!(
            broken(|v| v["board"] = json!("grid")),
            SnapshotError::GridNotArray
        );
        assert_eq!(
            broken(|v| {
                v["board"].as_array_mut().unwrap().pop();
            }),
            SnapshotError::RowCount {
                expected: 10,
                found: 9
            }
        );
        assert_eq!(
            broken(|v| v["board"][3] = json!(7)),
            SnapshotError::RowNotArray { row: 3 }
        );
        assert_eq!(
            broken(|v| v["board"][2].as_array_mut().unwrap().push(Value::Null)),
            SnapshotError::ColCount {
                row: 2,
                expected: 9,
                found: 10
            }
        );
        assert!(matches!(
            broken(|v| v["board"][4][4] = json!({"type": "queen", "side": "red"})),
            SnapshotError::InvalidCell { row: 4, col: 4, .. }
        ));
        assert!(matches!(
            broken(|v| v["board"][0][0] = json!("rook")),
            SnapshotError::InvalidCell { row: 0, col: 0, .. }
        ));
        assert_eq!(
            broken(|v| {
                v.as_object_mut().unwrap().remove("sideToMove");
            }),
            SnapshotError::MissingSide
        );
        assert!(matches!(
            broken(|v| v["sideToMove"] = json!("green")),
            SnapshotError::InvalidSide(_)
        ));
    }

    #[test]
    fn failed_apply_leaves_engine_untouched() {
        let mut g = played_engine();
        let board = g.board().clone();
        let mut bad = serde_json::to_value(GameEngine::new().snapshot()).unwrap();
        bad["board"][9][8] = json!({"type": "rook", "side": "purple"});

        assert!(g.apply_snapshot(&bad).is_err());
        assert_eq!(g.board(), &board);
        assert_eq!(g.side_to_move(), Side::Black);
        assert!(g.can_undo());
    }

    #[test]
    fn applies_arbitrary_position() {
        let grid: Vec<Vec<Value>> = (0..10)
            .map(|r| {
                (0..9)
                    .map(|c| match (r, c) {
                        (0, 4) => json!({"type": "general", "side": "black"}),
                        (9, 3) => json!({"type": "general", "side": "red"}),
                        _ => Value::Null,
                    })
                    .collect()
            })
            .collect();
        let value = json!({ "sideToMove": "black", "board": grid });
        let mut g = GameEngine::new();
        g.apply_snapshot(&value).unwrap();
        assert_eq!(g.board().piece_count(), 2);
        assert_eq!(
            g.board().get_piece(0, 4),
            Some(Piece::new(PieceKind::General, Side::Black))
        );
        assert_eq!(g.side_to_move(), Side::Black);
    }
}
