// Error taxonomy for the game engine
// None of these are fatal: the shell logs them and carries on

use std::io;
use thiserror::Error;

/// Board construction errors
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Too many mines: {mines} requested for {cells} cells")]
    TooManyMines { mines: usize, cells: usize },
    #[error("Board must have at least one row and one column")]
    EmptyBoard,
}

/// Reasons the single-use hint can't be given
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum HintError {
    #[error("Hint already used this game")]
    AlreadyUsed,
    #[error("No safe cell left to hint")]
    NoSafeCell,
}

/// Rejected player actions; these never change any state
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Coordinates out of bounds")]
    OutOfBounds,
    #[error("Game is paused")]
    Paused,
    #[error("Game already ended, no new moves are accepted")]
    Finished,
    #[error("Cell already revealed")]
    AlreadyRevealed,
    #[error("Cell is marked")]
    Marked,
    #[error("Flag count does not match the cell's number")]
    ChordMismatch,
    #[error("Game has not started yet")]
    NotStarted,
    #[error(transparent)]
    Hint(#[from] HintError),
    #[error(transparent)]
    Board(#[from] BoardError),
}

pub type Result<T> = core::result::Result<T, ActionError>;

/// Best-time and config persistence failures
/// Callers recover by treating the stored data as absent
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Cannot serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("No configuration directory available")]
    NoConfigDir,
}
