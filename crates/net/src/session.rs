//! Per-connection session record

use std::net::SocketAddr;
use std::sync::OnceLock;

use tracing::debug;
use uuid::Uuid;

use crate::connection::Connection;
use crate::protocol::{Extension, Extensions, ServerMessage};

pub type SessionId = Uuid;

/// Name shown for a session that has not logged in yet
pub const ANONYMOUS: &str = "ANONYMOUS";

/// Result of the HELLO exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    /// Extensions the client declared
    pub declared: Extensions,
    /// Extensions both sides support
    pub negotiated: Extensions,
}

/// One connected client
pub struct Session {
    id: SessionId,
    connection: Connection,
    handshake: OnceLock<Handshake>,
    username: OnceLock<String>,
}

impl Session {
    pub fn new(connection: Connection) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection,
            handshake: OnceLock::new(),
            username: OnceLock::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.connection.peer_addr()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn username(&self) -> Option<&str> {
        self.username.get().map(String::as_str)
    }

    /// Username, or a placeholder before login
    pub fn display_name(&self) -> &str {
        self.username().unwrap_or(ANONYMOUS)
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.get().is_some()
    }

    /// Bind the username. Only the server state calls this, under its
    /// session registry lock, so uniqueness holds.
    pub(crate) fn bind_username(&self, username: &str) -> bool {
        self.username.set(username.to_string()).is_ok()
    }

    /// Record the HELLO exchange. Returns false if already recorded.
    pub fn complete_handshake(&self, handshake: Handshake) -> bool {
        self.handshake.set(handshake).is_ok()
    }

    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.get().copied()
    }

    pub fn negotiated(&self) -> Extensions {
        self.handshake()
            .map(|h| h.negotiated)
            .unwrap_or_default()
    }

    /// Whether this session may send and receive chat
    pub fn can_chat(&self) -> bool {
        self.is_authenticated() && self.negotiated().contains(Extension::Chat)
    }

    pub fn send(&self, message: &ServerMessage) {
        let line = message.encode();
        debug!(session_id = %self.id, user = %self.display_name(), line = %line, "Send");
        self.connection.write(line);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer_addr())
            .field("username", &self.username())
            .finish()
    }
}
