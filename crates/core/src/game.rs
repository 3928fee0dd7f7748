//! The game contract
//!
//! The session server never looks inside a game's rules. It only validates,
//! applies and inspects moves through the [`Game`] trait, and creates games
//! through the [`GameKind`] factory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::quarto::QuartoGame;

/// One of the two seats at a board. `First` moves on ply 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    /// The seat across the board
    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    /// Index into a two-element participant array
    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

/// A move as exchanged on the wire.
///
/// The opening ply only hands a piece to the opponent; every later ply
/// places the piece it was handed and then hands over the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Give { piece: u8 },
    Place { index: u8, piece: u8 },
}

impl Move {
    /// Build a move from raw wire values, checking only the argument shape
    /// expected for the current ply.
    pub fn from_wire(values: &[u8], first_ply: bool) -> Result<Self> {
        match (first_ply, values) {
            (true, [piece]) => Ok(Move::Give { piece: *piece }),
            (false, [index, piece]) => Ok(Move::Place {
                index: *index,
                piece: *piece,
            }),
            (true, _) => Err(Error::MoveShape {
                expected: 1,
                got: values.len(),
            }),
            (false, _) => Err(Error::MoveShape {
                expected: 2,
                got: values.len(),
            }),
        }
    }

    /// The raw wire values of this move
    pub fn to_wire(self) -> Vec<u8> {
        match self {
            Move::Give { piece } => vec![piece],
            Move::Place { index, piece } => vec![index, piece],
        }
    }

    pub fn piece(self) -> u8 {
        match self {
            Move::Give { piece } | Move::Place { piece, .. } => piece,
        }
    }
}

/// Contract between the session server and a set of game rules
pub trait Game: Send + fmt::Debug {
    /// Whether `mv` may be played right now by the active participant
    fn is_legal(&self, mv: &Move) -> bool;

    /// Apply a move for the active participant
    fn apply_move(&mut self, mv: Move) -> Result<()>;

    /// Whether the game has ended
    fn is_terminal(&self) -> bool;

    /// The decisive winner, if the game ended with one
    fn winner(&self) -> Option<Seat>;

    /// The seat whose turn it is
    fn active_participant(&self) -> Seat;

    /// Every move the active participant may play
    fn legal_moves(&self) -> Vec<Move>;

    /// Human-readable board rendering
    fn describe_board(&self) -> String;

    /// Current ply, starting at 1
    fn ply(&self) -> u32;

    fn is_first_ply(&self) -> bool {
        self.ply() == 1
    }
}

/// Games the server knows how to host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    #[default]
    Quarto,
}

impl GameKind {
    /// Create a fresh game of this kind
    pub fn create(self) -> Box<dyn Game> {
        match self {
            GameKind::Quarto => Box::new(QuartoGame::new()),
        }
    }

    /// Default server greeting sent during the handshake
    pub fn greeting(self) -> &'static str {
        match self {
            GameKind::Quarto => "Hello from Quarto server",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Quarto => f.write_str("quarto"),
        }
    }
}

impl FromStr for GameKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quarto" => Ok(GameKind::Quarto),
            _ => Err(Error::UnknownGame(s.to_string())),
        }
    }
}
