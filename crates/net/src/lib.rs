//! Quarto Network Library
//!
//! Line-based TCP session server for two-player turn-based games, plus a
//! matching protocol client.
//!
//! # Architecture
//!
//! - **Connection**: One socket, a read task and a write task
//! - **Protocol**: `~`-separated text lines with negotiated extensions
//! - **SessionHandler**: Per-connection protocol state machine
//! - **ServerState**: Sessions, matchmaking queues, live games and ranks
//! - **Server**: Accepts connections and wires the pieces together
//! - **Client**: Connects to a server and performs the handshake
//!
//! # Usage
//!
//! ```ignore
//! // Start a server on an ephemeral port
//! let server = Server::start(ServerConfig::default().with_port(0)).await?;
//!
//! // Client connects and plays
//! let mut client = Client::connect(server.addr(), "my client", Extensions::all()).await?;
//! client.login("alice")?;
//! client.queue(None)?;
//! while let Some(message) = client.next_event().await {
//!     match message {
//!         ServerMessage::NewGame { first, second } => { /* handle */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
mod invariants;
pub mod protocol;
pub mod server;
pub mod session;
pub mod state;

pub use client::Client;
pub use config::ServerConfig;
pub use connection::{Connection, LineHandler};
pub use error::{Error, ProtocolError, Result};
pub use protocol::{ClientMessage, Extension, Extensions, GameOutcome, ServerMessage};
pub use server::Server;
pub use session::{Session, SessionId};
pub use state::{DisconnectOutcome, ServerState};

/// Default port for Quarto servers
pub const DEFAULT_PORT: u16 = 7331;
