//! Stateful game controller wrapping a `Board`.
//!
//! `GameEngine` owns the live board, whose turn it is, the current
//! selection, and undo/redo stacks of full board snapshots. It is the only
//! type a front end needs: click squares with [`GameEngine::select_square`],
//! step through history with [`GameEngine::undo`] / [`GameEngine::redo`], and
//! read [`GameEngine::status`] to render check and game-over notices.

use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::board::Board;
use crate::engine::fen;
use crate::engine::rules;
use crate::engine::types::{BoardSize, Move, Outcome, Piece, Side, Square, XiangqiError};

// =========================================================================
// HistoryEntry
// =========================================================================

/// One committed move. Both boards are private clones, so nothing done to
/// the live board afterwards can reach them.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// Position before the move.
    pub before: Board,
    /// Position after the move.
    pub after: Board,
    /// Side that made the move.
    pub side: Side,
    pub mv: Move,
    pub captured: Option<Piece>,
}

// =========================================================================
// StatusReport
// =========================================================================

/// Snapshot of the game status for the side to move. Always computed fresh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub in_check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
    pub game_over: bool,
    pub game_over_reason: String,
}

// =========================================================================
// GameEngine
// =========================================================================

/// A Xiangqi game session: board, turn, selection and history.
#[derive(Clone, Debug)]
pub struct GameEngine {
    board: Board,
    side_to_move: Side,
    selected: Option<Square>,
    history: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    outcome: Option<Outcome>,

    // Metadata
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl GameEngine {
    // -----------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------

    /// A new game on the standard 10×9 board.
    pub fn new() -> Self {
        Self::with_size(BoardSize::STANDARD)
    }

    /// A new game on a board of the given size.
    pub fn with_size(size: BoardSize) -> Self {
        Self::from_board(Board::starting_with_size(size), Side::Red)
    }

    /// Start from an arbitrary position.
    pub fn from_board(board: Board, side_to_move: Side) -> Self {
        Self {
            board,
            side_to_move,
            selected: None,
            history: Vec::new(),
            redo_stack: Vec::new(),
            outcome: None,
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Start from a FEN position.
    pub fn from_fen(fen: &str) -> Result<Self, XiangqiError> {
        let (board, side) = fen::parse_fen(fen)?;
        Ok(Self::from_board(board, side))
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    /// Currently selected square, if a piece is picked up.
    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    /// Committed moves, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// All legal moves for the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        guarded(&self.id, "move generation", Vec::new(), || {
            rules::generate_legal_moves(&self.board, self.side_to_move)
        })
    }

    /// Legal destinations for the selected piece, empty without a selection.
    pub fn legal_moves_of_selection(&self) -> Vec<Square> {
        let Some(sq) = self.selected else {
            return Vec::new();
        };
        guarded(&self.id, "move generation", Vec::new(), || {
            rules::legal_moves_for_piece(&self.board, sq.row, sq.col)
        })
    }

    /// Moves played so far, oldest first.
    pub fn move_history(&self) -> Vec<Move> {
        self.history.iter().map(|e| e.mv).collect()
    }

    /// Pieces taken so far, in capture order.
    pub fn captured_pieces(&self) -> Vec<Piece> {
        self.history.iter().filter_map(|e| e.captured).collect()
    }

    /// Current position as FEN.
    pub fn to_fen(&self) -> String {
        fen::to_fen(&self.board, self.side_to_move)
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Reset to the opening position with Red to move. Board size is kept.
    pub fn new_game(&mut self) {
        self.board.setup_initial();
        self.side_to_move = Side::Red;
        self.clear_progress();
        info!(game_id = %self.id, size = %self.board.size(), "new game");
    }

    /// Load a FEN position, discarding history. The FEN must match this
    /// engine's board size.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), XiangqiError> {
        let (board, side) = fen::parse_fen(fen)?;
        if board.size() != self.board.size() {
            return Err(XiangqiError::InvalidFen(format!(
                "board is {}, expected {}",
                board.size(),
                self.board.size()
            )));
        }
        self.reset_to(board, side);
        Ok(())
    }

    /// Replace board and side to move and drop all history, selection and
    /// game-over state.
    pub(crate) fn reset_to(&mut self, board: Board, side_to_move: Side) {
        self.board = board;
        self.side_to_move = side_to_move;
        self.clear_progress();
    }

    fn clear_progress(&mut self) {
        self.selected = None;
        self.history.clear();
        self.redo_stack.clear();
        self.outcome = None;
    }

    // -----------------------------------------------------------------
    // Selection / moves
    // -----------------------------------------------------------------

    /// Handle a click on `(row, col)`.
    ///
    /// Without a selection, picks up a piece of the side to move. With a
    /// selection, plays the move if it is legal; otherwise the selection is
    /// left untouched. Returns whether anything happened. Always `false`
    /// once the game is over.
    pub fn select_square(&mut self, row: i32, col: i32) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        let target = Square::new(row, col);

        let Some(from) = self.selected else {
            return match self.board.get_piece(row, col) {
                Some(piece) if piece.side == self.side_to_move => {
                    self.selected = Some(target);
                    debug!(square = %target, %piece, "piece selected");
                    true
                }
                _ => false,
            };
        };

        if !self.is_legal(from, target) {
            debug!(from = %from, to = %target, side = %self.side_to_move, "illegal move rejected");
            return false;
        }
        self.commit(Move::new(from, target));
        true
    }

    /// Drop the current selection.
    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Play a move directly, bypassing selection.
    pub fn play(&mut self, mv: Move) -> Result<(), XiangqiError> {
        if let Some(outcome) = self.outcome {
            return Err(XiangqiError::GameOver(outcome.reason()));
        }
        if !self.is_legal(mv.from, mv.to) {
            debug!(%mv, side = %self.side_to_move, "illegal move rejected");
            return Err(XiangqiError::IllegalMove {
                from: mv.from,
                to: mv.to,
            });
        }
        self.commit(mv);
        Ok(())
    }

    /// Legality for the side to move. A failed check counts as illegal.
    fn is_legal(&self, from: Square, to: Square) -> bool {
        guarded(&self.id, "legality check", false, || {
            rules::is_legal_move(&self.board, from, to, self.side_to_move)
        })
    }

    fn commit(&mut self, mv: Move) {
        let side = self.side_to_move;
        let before = self.board.clone();
        let captured = self
            .board
            .move_piece(mv.from.row, mv.from.col, mv.to.row, mv.to.col);
        self.history.push(HistoryEntry {
            before,
            after: self.board.clone(),
            side,
            mv,
            captured,
        });
        self.redo_stack.clear();
        self.side_to_move = !side;
        self.selected = None;
        info!(game_id = %self.id, %side, %mv, ?captured, "move committed");

        let opponent = self.side_to_move;
        let (in_check, no_moves) = guarded(&self.id, "terminal detection", (false, false), || {
            (
                rules::is_in_check(&self.board, opponent),
                rules::generate_legal_moves(&self.board, opponent).is_empty(),
            )
        });
        self.outcome = match (in_check, no_moves) {
            (true, true) => Some(Outcome::Checkmate { winner: side }),
            (false, true) => Some(Outcome::Stalemate),
            (true, false) => {
                info!(game_id = %self.id, side = %opponent, "check");
                None
            }
            (false, false) => None,
        };
        if let Some(outcome) = self.outcome {
            info!(
                game_id = %self.id,
                %outcome,
                winner = ?outcome.winner(),
                reason = %outcome.reason(),
                "game over"
            );
        }
    }

    // -----------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------

    /// Take back the last move. Always leaves the game playable.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop() else {
            return false;
        };
        self.board = entry.before.clone();
        self.side_to_move = entry.side;
        self.selected = None;
        self.outcome = None;
        debug!(game_id = %self.id, mv = %entry.mv, "move undone");
        self.redo_stack.push(entry);
        true
    }

    /// Replay the last undone move. Terminal state is not re-derived; read
    /// [`GameEngine::status`] afterwards.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        self.board = entry.after.clone();
        self.side_to_move = !entry.side;
        self.selected = None;
        debug!(game_id = %self.id, mv = %entry.mv, "move redone");
        self.history.push(entry);
        true
    }

    // -----------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------

    /// Check, mate and stalemate for the side to move, plus the game-over
    /// flag. A failure while computing yields the inert default report.
    pub fn status(&self) -> StatusReport {
        let board = &self.board;
        let side = self.side_to_move;
        let computed = guarded(&self.id, "status", None, || {
            let in_check = rules::is_in_check(board, side);
            let no_moves = rules::generate_legal_moves(board, side).is_empty();
            Some((in_check, in_check && no_moves, !in_check && no_moves))
        });

        match computed {
            Some((in_check, checkmate, stalemate)) => StatusReport {
                in_check,
                checkmate,
                stalemate,
                game_over: self.outcome.is_some(),
                game_over_reason: self.outcome.map(|o| o.reason()).unwrap_or_default(),
            },
            None => StatusReport::default(),
        }
    }
}

/// Run a rules computation behind an unwind boundary. A panic is logged and
/// replaced by `fallback`, so the session stays usable.
fn guarded<T>(game_id: &str, what: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            warn!(game_id, what, "rules computation failed; using safe default");
            fallback
        }
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::PieceKind;

    fn sq(row: i32, col: i32) -> Square {
        Square::new(row, col)
    }

    fn click(g: &mut GameEngine, from: (i32, i32), to: (i32, i32)) -> bool {
        assert!(g.select_square(from.0, from.1), "select {from:?}");
        g.select_square(to.0, to.1)
    }

    // -----------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------

    #[test]
    fn new_game_is_active() {
        let g = GameEngine::new();
        assert_eq!(g.side_to_move(), Side::Red);
        assert!(!g.is_game_over());
        assert!(!g.can_undo());
        assert!(!g.can_redo());
        assert_eq!(g.board(), &Board::starting());
        assert_eq!(g.status(), StatusReport::default());
    }

    #[test]
    fn engines_get_distinct_ids() {
        assert_ne!(GameEngine::new().id, GameEngine::new().id);
    }

    #[test]
    fn from_invalid_fen_errors() {
        assert!(GameEngine::from_fen("invalid").is_err());
    }

    // -----------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------

    #[test]
    fn select_own_piece() {
        let mut g = GameEngine::new();
        assert!(g.select_square(6, 4));
        assert_eq!(g.selected(), Some(sq(6, 4)));
        assert_eq!(g.legal_moves_of_selection(), vec![sq(5, 4)]);
    }

    #[test]
    fn select_empty_or_enemy_is_noop() {
        let mut g = GameEngine::new();
        assert!(!g.select_square(5, 4));
        assert!(!g.select_square(3, 4));
        assert!(!g.select_square(-1, 20));
        assert_eq!(g.selected(), None);
        assert!(g.legal_moves_of_selection().is_empty());
    }

    #[test]
    fn illegal_destination_keeps_selection() {
        let mut g = GameEngine::new();
        assert!(g.select_square(9, 0));
        assert!(!g.select_square(9, 1), "own horse");
        assert!(!g.select_square(3, 3), "not reachable");
        assert!(!g.select_square(42, 0), "off board");
        assert_eq!(g.selected(), Some(sq(9, 0)));
        assert_eq!(g.side_to_move(), Side::Red);
        g.deselect();
        assert_eq!(g.selected(), None);
    }

    // -----------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------

    #[test]
    fn move_soldier_flips_turn() {
        let mut g = GameEngine::new();
        assert!(click(&mut g, (6, 4), (5, 4)));
        assert_eq!(
            g.board().get_piece(5, 4),
            Some(Piece::new(PieceKind::Soldier, Side::Red))
        );
        assert_eq!(g.board().get_piece(6, 4), None);
        assert_eq!(g.side_to_move(), Side::Black);
        assert_eq!(g.selected(), None);
        assert_eq!(g.move_history(), vec![Move::new(sq(6, 4), sq(5, 4))]);
        assert_eq!(g.history()[0].side, Side::Red);
        assert_eq!(g.history()[0].before, Board::starting());
    }

    #[test]
    fn capture_is_recorded() {
        let mut g = GameEngine::new();
        assert!(click(&mut g, (7, 1), (0, 1)));
        assert_eq!(
            g.captured_pieces(),
            vec![Piece::new(PieceKind::Horse, Side::Black)]
        );
        assert_eq!(g.history()[0].captured, g.captured_pieces().first().copied());
    }

    #[test]
    fn play_rejects_illegal_and_wrong_side() {
        let mut g = GameEngine::new();
        let black_move = Move::new(sq(3, 4), sq(4, 4));
        assert!(matches!(g.play(black_move), Err(XiangqiError::IllegalMove { .. })));
        g.play(Move::new(sq(6, 4), sq(5, 4))).unwrap();
        g.play(black_move).unwrap();
        assert_eq!(g.side_to_move(), Side::Red);
    }

    #[test]
    fn history_snapshots_are_independent() {
        let mut g = GameEngine::new();
        g.play(Move::new(sq(6, 4), sq(5, 4))).unwrap();
        let after = g.history()[0].after.clone();
        g.play(Move::new(sq(3, 4), sq(4, 4))).unwrap();
        assert_eq!(g.history()[0].after, after);
        assert_ne!(g.history()[0].after, *g.board());
    }

    // -----------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------

    #[test]
    fn undo_restores_board_and_turn() {
        let mut g = GameEngine::new();
        g.play(Move::new(sq(6, 4), sq(5, 4))).unwrap();
        assert!(g.undo());
        assert_eq!(g.board(), &Board::starting());
        assert_eq!(g.side_to_move(), Side::Red);
        assert!(g.can_redo());
        assert!(!g.undo(), "nothing left");
    }

    #[test]
    fn redo_inverts_undo() {
        let mut g = GameEngine::new();
        g.play(Move::new(sq(7, 7), sq(7, 4))).unwrap();
        let board_before_undo = g.board().clone();
        let side_before_undo = g.side_to_move();
        assert!(g.undo());
        assert!(g.redo());
        assert_eq!(g.board(), &board_before_undo);
        assert_eq!(g.side_to_move(), side_before_undo);
        assert_eq!(g.history().len(), 1);
        assert!(!g.redo(), "redo stack empty");
    }

    #[test]
    fn new_move_clears_redo() {
        let mut g = GameEngine::new();
        g.play(Move::new(sq(6, 4), sq(5, 4))).unwrap();
        g.undo();
        assert!(g.can_redo());
        g.play(Move::new(sq(6, 0), sq(5, 0))).unwrap();
        assert!(!g.can_redo());
        assert!(!g.redo());
    }

    #[test]
    fn undo_clears_selection() {
        let mut g = GameEngine::new();
        g.play(Move::new(sq(6, 4), sq(5, 4))).unwrap();
        assert!(g.select_square(3, 4));
        g.undo();
        assert_eq!(g.selected(), None);
    }

    // -----------------------------------------------------------------
    // Game over
    // -----------------------------------------------------------------

    /// Red to move with a one-move mate: the rook swings onto the Black
    /// General's file while two horses cover its side steps.
    fn mate_in_one() -> GameEngine {
        GameEngine::from_fen("4k4/9/2N3N2/9/9/9/9/9/R8/3K5 w").unwrap()
    }

    #[test]
    fn checkmate_ends_game() {
        let mut g = mate_in_one();
        assert!(click(&mut g, (8, 0), (8, 4)));
        let status = g.status();
        assert!(status.in_check);
        assert!(status.checkmate);
        assert!(!status.stalemate);
        assert!(status.game_over);
        assert!(status.game_over_reason.contains("红方"));
        assert_eq!(g.outcome(), Some(Outcome::Checkmate { winner: Side::Red }));
        assert!(!g.select_square(0, 4), "no input after game over");
        assert!(matches!(
            g.play(Move::new(sq(0, 4), sq(0, 3))),
            Err(XiangqiError::GameOver(_))
        ));
    }

    #[test]
    fn undo_after_mate_reopens_game() {
        let mut g = mate_in_one();
        g.play(Move::new(sq(8, 0), sq(8, 4))).unwrap();
        assert!(g.is_game_over());
        assert!(g.undo());
        assert!(!g.is_game_over());
        assert_eq!(g.side_to_move(), Side::Red);

        // Redo does not re-flag the game, but status still sees the mate.
        assert!(g.redo());
        assert!(!g.is_game_over());
        let status = g.status();
        assert!(status.checkmate);
        assert!(!status.game_over);
    }

    #[test]
    fn stalemate_ends_game_as_draw() {
        // Red soldier steps to (1,4), covering both of the General's moves.
        let mut g = GameEngine::from_fen("3k5/9/4P4/9/9/9/9/9/9/5K3 w").unwrap();
        g.play(Move::new(sq(2, 4), sq(1, 4))).unwrap();
        assert_eq!(g.outcome(), Some(Outcome::Stalemate));
        let status = g.status();
        assert!(status.stalemate);
        assert!(!status.in_check);
        assert!(status.game_over_reason.contains("和棋"));
    }

    #[test]
    fn check_does_not_end_game() {
        let mut g = GameEngine::from_fen("4k4/9/9/9/9/9/9/9/R8/3K5 w").unwrap();
        g.play(Move::new(sq(8, 0), sq(8, 4))).unwrap();
        let status = g.status();
        assert!(status.in_check);
        assert!(!status.checkmate);
        assert!(!status.game_over);
        assert!(!g.is_game_over());
    }

    // -----------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------

    #[test]
    fn new_game_resets_everything() {
        let mut g = GameEngine::new();
        g.play(Move::new(sq(6, 4), sq(5, 4))).unwrap();
        g.play(Move::new(sq(3, 4), sq(4, 4))).unwrap();
        g.undo();
        assert!(g.select_square(6, 0));
        g.new_game();
        assert_eq!(g.board(), &Board::starting());
        assert_eq!(g.side_to_move(), Side::Red);
        assert_eq!(g.selected(), None);
        assert!(!g.can_undo());
        assert!(!g.can_redo());
    }

    #[test]
    fn load_fen_checks_board_size() {
        let mut g = GameEngine::with_size(BoardSize::new(12, 11).unwrap());
        assert!(g.load_fen(fen::START_FEN).is_err());
        assert_eq!(g.board().size(), BoardSize::new(12, 11).unwrap());

        let mut g = GameEngine::new();
        g.load_fen("4k4/9/9/9/9/9/9/9/9/3K5 b").unwrap();
        assert_eq!(g.side_to_move(), Side::Black);
        assert_eq!(g.board().piece_count(), 2);
        assert_eq!(g.to_fen(), "4k4/9/9/9/9/9/9/9/9/3K5 b - - 0 1");
    }

    // -----------------------------------------------------------------
    // Failure isolation
    // -----------------------------------------------------------------

    #[test]
    fn guarded_returns_value_on_success() {
        assert_eq!(guarded("test-game", "sum", 0, || 2 + 2), 4);
    }

    #[test]
    fn guarded_swallows_panic_and_returns_fallback() {
        let legal = guarded("test-game", "legality check", false, || -> bool {
            panic!("corrupt board")
        });
        assert!(!legal);

        let moves = guarded("test-game", "move generation", Vec::new(), || -> Vec<Move> {
            panic!("corrupt board")
        });
        assert!(moves.is_empty());
    }

    #[test]
    fn engine_keeps_working_after_a_guarded_failure() {
        let mut g = GameEngine::new();
        let report = guarded(&g.id, "status", None, || -> Option<StatusReport> {
            panic!("corrupt board")
        });
        assert_eq!(report, None);
        assert!(g.select_square(6, 4));
        assert!(g.select_square(5, 4));
        assert_eq!(g.status(), StatusReport::default());
    }
}
