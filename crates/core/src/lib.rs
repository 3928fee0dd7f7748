//! Quarto Core Library
//!
//! The game contract consumed by the session server, a static factory for
//! the games it can host, and the Quarto rules behind that contract.

pub mod error;
pub mod game;
pub mod quarto;

pub use error::{Error, Result};
pub use game::{Game, GameKind, Move, Seat};
pub use quarto::{Piece, QuartoGame};
