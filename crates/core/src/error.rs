//! Error types for Quarto Core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Expected {expected} move values, got {got}")]
    MoveShape { expected: usize, got: usize },

    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

pub type Result<T> = std::result::Result<T, Error>;
