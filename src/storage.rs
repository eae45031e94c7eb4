//! JSON file persistence for a single saved game.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::engine::{GameEngine, SnapshotError, XiangqiError};

/// Saves and restores one game snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the engine's current snapshot, replacing any previous save.
    pub fn save(&self, engine: &GameEngine) -> Result<(), XiangqiError> {
        let json = serde_json::to_string_pretty(&engine.snapshot())?;
        fs::write(&self.path, json)?;
        info!(path = %self.path.display(), game_id = %engine.id, "game saved");
        Ok(())
    }

    /// Read the raw saved document.
    ///
    /// A missing file is [`XiangqiError::NoSavedState`]; unparsable content
    /// is [`SnapshotError::Malformed`].
    pub fn load(&self) -> Result<Value, XiangqiError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(XiangqiError::NoSavedState(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map_err(|e| XiangqiError::Snapshot(SnapshotError::Malformed(e.to_string())))
    }

    /// Load the saved document and apply it to `engine`. The engine is left
    /// untouched on any error.
    pub fn restore_into(&self, engine: &mut GameEngine) -> Result<(), XiangqiError> {
        let value = self.load()?;
        engine.apply_snapshot(&value)?;
        info!(path = %self.path.display(), game_id = %engine.id, "game restored");
        Ok(())
    }

    /// Delete the save file. Succeeds when there is nothing to delete.
    pub fn clear(&self) -> Result<(), XiangqiError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "save cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
