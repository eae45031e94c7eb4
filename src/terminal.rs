//! Line-oriented terminal front end over [`GameEngine`].
//!
//! Commands:
//!
//! | input        | effect                                        |
//! |--------------|-----------------------------------------------|
//! | `h2e2`       | play a move in ICCS notation                  |
//! | `select r c` | click square (row, col), 0-based from the top |
//! | `deselect`   | drop the current selection                    |
//! | `moves`      | legal moves of the selection (or all moves)   |
//! | `undo`/`redo`| step through history                          |
//! | `status`     | check / mate / stalemate report               |
//! | `board`      | redraw the board                              |
//! | `new`        | start over                                    |
//! | `save`/`load`| persist to / restore from the save file       |
//! | `fen [FEN]`  | print the position, or load one               |
//! | `help`       | list commands                                 |
//! | `quit`       | leave                                         |

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::engine::{BoardSize, GameEngine, Move};
use crate::storage::FileStore;

const HELP: &str = "\
commands: <move e.g. h2e2> | select <row> <col> | deselect | moves | undo | redo
          status | board | new | save | load | fen [FEN] | help | quit";

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(Move),
    Select { row: i32, col: i32 },
    Deselect,
    Moves,
    Undo,
    Redo,
    Status,
    Board,
    New,
    Save,
    Load,
    ShowFen,
    LoadFen(String),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0} (try 'select <row> <col>')")]
    BadMove(String),
}

impl Command {
    /// Parse one input line for a board of `size`.
    pub fn parse(line: &str, size: BoardSize) -> Result<Command, CommandError> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let rest: Vec<&str> = words.collect();

        let bare = |cmd: Command| {
            if rest.is_empty() {
                Ok(cmd)
            } else {
                Err(CommandError::Unknown(line.to_string()))
            }
        };

        match head.to_ascii_lowercase().as_str() {
            "select" | "s" => match rest.as_slice() {
                [row, col] => match (row.parse(), col.parse()) {
                    (Ok(row), Ok(col)) => Ok(Command::Select { row, col }),
                    _ => Err(CommandError::Usage("select <row> <col>")),
                },
                _ => Err(CommandError::Usage("select <row> <col>")),
            },
            "deselect" => bare(Command::Deselect),
            "moves" => bare(Command::Moves),
            "undo" | "u" => bare(Command::Undo),
            "redo" => bare(Command::Redo),
            "status" => bare(Command::Status),
            "board" | "b" => bare(Command::Board),
            "new" => bare(Command::New),
            "save" => bare(Command::Save),
            "load" => bare(Command::Load),
            "fen" if rest.is_empty() => Ok(Command::ShowFen),
            "fen" => Ok(Command::LoadFen(rest.join(" "))),
            "help" | "?" => bare(Command::Help),
            "quit" | "exit" | "q" => bare(Command::Quit),
            _ if rest.is_empty() && looks_like_move(head) => Move::from_iccs(head, size)
                .map(Command::Play)
                .map_err(|e| CommandError::BadMove(e.to_string())),
            _ => Err(CommandError::Unknown(line.to_string())),
        }
    }
}

/// Letter-digit-letter-digit, e.g. `h2e2`.
fn looks_like_move(word: &str) -> bool {
    let b = word.as_bytes();
    b.len() == 4
        && b[0].is_ascii_alphabetic()
        && b[1].is_ascii_digit()
        && b[2].is_ascii_alphabetic()
        && b[3].is_ascii_digit()
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

/// Terminal session state.
pub struct Session {
    pub engine: GameEngine,
    pub store: FileStore,
    pub chinese: bool,
}

impl Session {
    pub fn new(engine: GameEngine, store: FileStore, chinese: bool) -> Self {
        Self {
            engine,
            store,
            chinese,
        }
    }

    /// Read commands from `input` until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self.engine.board().board_string(self.chinese))?;
        writeln!(out, "{HELP}")?;
        self.prompt(out)?;

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                self.prompt(out)?;
                continue;
            }
            match Command::parse(&line, self.engine.board().size()) {
                Ok(Command::Quit) => break,
                Ok(cmd) => {
                    debug!(?cmd, "terminal command");
                    self.execute(cmd, out)?;
                }
                Err(e) => writeln!(out, "{e}")?,
            }
            self.prompt(out)?;
        }
        Ok(())
    }

    fn prompt(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "{} > ", self.engine.side_to_move().name_zh())?;
        out.flush()
    }

    /// Apply one command, writing feedback to `out`.
    pub fn execute(&mut self, cmd: Command, out: &mut impl Write) -> io::Result<()> {
        match cmd {
            Command::Play(mv) => match self.engine.play(mv) {
                Ok(()) => self.show_position(out)?,
                Err(e) => writeln!(out, "{e}")?,
            },
            Command::Select { row, col } => {
                let had_selection = self.engine.selected().is_some();
                if !self.engine.select_square(row, col) {
                    writeln!(out, "nothing to do at ({row},{col})")?;
                } else if had_selection {
                    self.show_position(out)?;
                } else {
                    let targets = self.engine.legal_moves_of_selection();
                    let size = self.engine.board().size();
                    let list: Vec<String> = targets
                        .iter()
                        .map(|sq| sq.to_iccs(size).unwrap_or_else(|| sq.to_string()))
                        .collect();
                    writeln!(out, "selected ({row},{col}); targets: {}", list.join(" "))?;
                }
            }
            Command::Deselect => {
                self.engine.deselect();
                writeln!(out, "selection cleared")?;
            }
            Command::Moves => {
                let size = self.engine.board().size();
                let list: Vec<String> = match self.engine.selected() {
                    Some(from) => self
                        .engine
                        .legal_moves_of_selection()
                        .into_iter()
                        .map(|to| move_label(Move::new(from, to), size))
                        .collect(),
                    None => self
                        .engine
                        .legal_moves()
                        .into_iter()
                        .map(|mv| move_label(mv, size))
                        .collect(),
                };
                writeln!(out, "{} moves: {}", list.len(), list.join(" "))?;
            }
            Command::Undo => {
                if self.engine.undo() {
                    self.show_position(out)?;
                } else {
                    writeln!(out, "nothing to undo")?;
                }
            }
            Command::Redo => {
                if self.engine.redo() {
                    self.show_position(out)?;
                } else {
                    writeln!(out, "nothing to redo")?;
                }
            }
            Command::Status => {
                let status = self.engine.status();
                writeln!(
                    out,
                    "to move: {}  check: {}  checkmate: {}  stalemate: {}  over: {}",
                    self.engine.side_to_move().name_zh(),
                    status.in_check,
                    status.checkmate,
                    status.stalemate,
                    status.game_over,
                )?;
                if status.game_over {
                    writeln!(out, "{}", status.game_over_reason)?;
                }
            }
            Command::Board => self.show_position(out)?,
            Command::New => {
                self.engine.new_game();
                self.show_position(out)?;
            }
            Command::Save => match self.store.save(&self.engine) {
                Ok(()) => writeln!(out, "saved to {}", self.store.path().display())?,
                Err(e) => writeln!(out, "save failed: {e}")?,
            },
            Command::Load => match self.store.restore_into(&mut self.engine) {
                Ok(()) => self.show_position(out)?,
                Err(e) => writeln!(out, "load failed: {e}")?,
            },
            Command::ShowFen => writeln!(out, "{}", self.engine.to_fen())?,
            Command::LoadFen(fen) => match self.engine.load_fen(&fen) {
                Ok(()) => self.show_position(out)?,
                Err(e) => writeln!(out, "{e}")?,
            },
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn show_position(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self.engine.board().board_string(self.chinese))?;
        let status = self.engine.status();
        if status.game_over {
            writeln!(out, "{}", status.game_over_reason)?;
        } else if status.in_check {
            writeln!(out, "将军！")?;
        }
        Ok(())
    }
}

/// ICCS where the board has names for every square, `(r,c)->(r,c)` otherwise.
fn move_label(mv: Move, size: BoardSize) -> String {
    mv.to_iccs(size).unwrap_or_else(|| mv.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
