pub mod board;
pub mod fen;
pub mod game;
pub mod rules;
pub mod snapshot;
pub mod types;

pub use board::Board;
pub use game::{GameEngine, HistoryEntry, StatusReport};
pub use snapshot::{Snapshot, SnapshotError};
pub use types::*;
