use std::path::PathBuf;

use tracing::warn;

use crate::engine::BoardSize;

/// Default location of the save file.
pub const DEFAULT_SAVE_PATH: &str = "xiangqi-save.json";

/// Runtime configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Board dimensions for new games.
    pub board_size: BoardSize,
    /// JSON file used by `save` / `load`.
    pub save_path: PathBuf,
    /// Render pieces as Chinese glyphs instead of FEN letters.
    pub chinese: bool,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AppConfig::default();
        let rows = lookup("XIANGQI_ROWS").and_then(|v| v.parse().ok());
        let cols = lookup("XIANGQI_COLS").and_then(|v| v.parse().ok());

        let board_size = match (rows, cols) {
            (None, None) => defaults.board_size,
            (rows, cols) => {
                let rows = rows.unwrap_or(defaults.board_size.rows());
                let cols = cols.unwrap_or(defaults.board_size.cols());
                BoardSize::new(rows, cols).unwrap_or_else(|e| {
                    warn!(error = %e, "ignoring board size, using {}", defaults.board_size);
                    defaults.board_size
                })
            }
        };

        AppConfig {
            board_size,
            save_path: lookup("XIANGQI_SAVE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.save_path),
            chinese: lookup("XIANGQI_CHINESE")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"))
                .unwrap_or(defaults.chinese),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            board_size: BoardSize::STANDARD,
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            chinese: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.board_size, BoardSize::STANDARD);
        assert_eq!(config.save_path, PathBuf::from("xiangqi-save.json"));
        assert!(config.chinese);
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.board_size, BoardSize::STANDARD);
        assert_eq!(config.save_path, PathBuf::from(DEFAULT_SAVE_PATH));
        assert!(config.chinese);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("XIANGQI_ROWS", "12"),
            ("XIANGQI_COLS", "11"),
            ("XIANGQI_SAVE_PATH", "/tmp/game.json"),
            ("XIANGQI_CHINESE", "off"),
        ]));
        assert_eq!(config.board_size.rows(), 12);
        assert_eq!(config.board_size.cols(), 11);
        assert_eq!(config.save_path, PathBuf::from("/tmp/game.json"));
        assert!(!config.chinese);
    }

    #[test]
    fn invalid_size_falls_back() {
        let config = AppConfig::from_lookup(lookup(&[("XIANGQI_ROWS", "11")]));
        assert_eq!(config.board_size, BoardSize::STANDARD);
        let config = AppConfig::from_lookup(lookup(&[("XIANGQI_COLS", "abc")]));
        assert_eq!(config.board_size, BoardSize::STANDARD);
    }
}
