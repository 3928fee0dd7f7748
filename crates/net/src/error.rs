//! Network error types

use std::io;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Inconsistent server state: {0}")]
    InconsistentState(String),
}

/// A malformed or out-of-place line. The display text is sent back to the
/// peer verbatim in an `ERROR` message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty message")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("No {what} in {kind}")]
    MissingArgument {
        kind: &'static str,
        what: &'static str,
    },

    #[error("Too many arguments in {0}")]
    TooManyArguments(&'static str),

    #[error("Wrong argument type in {0}")]
    WrongArgumentType(&'static str),
}
