//! TCP client for connecting to a game server
//!
//! Performs the HELLO handshake on connect and then exposes the server's
//! messages as a stream of decoded events.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{Connection, LineHandler};
use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, Extension, Extensions, ServerMessage};

/// Event received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
enum ServerEvent {
    Message(ServerMessage),
    Disconnected,
}

/// Decodes server lines onto the event channel
struct EventForwarder {
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl LineHandler for EventForwarder {
    fn on_line(&self, line: &str) {
        match ServerMessage::decode(line) {
            Ok(message) => {
                let _ = self.tx.send(ServerEvent::Message(message));
            }
            Err(e) => warn!(line = %line, error = %e, "Skipping undecodable server line"),
        }
    }

    fn on_disconnect(&self) {
        let _ = self.tx.send(ServerEvent::Disconnected);
    }
}

/// Client handle for network operations
pub struct Client {
    connection: Connection,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
    server_description: String,
    negotiated: Extensions,
    connected: bool,
}

impl Client {
    /// Connect to a server and complete the HELLO handshake
    pub async fn connect(
        addr: SocketAddr,
        description: &str,
        extensions: Extensions,
    ) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");

        let connection = Connection::connect(addr).await?;
        let (tx, mut event_rx) = mpsc::unbounded_channel();
        connection.start(std::sync::Arc::new(EventForwarder { tx }));

        connection.write(
            ClientMessage::Hello {
                description: description.to_string(),
                extensions,
            }
            .encode(),
        );

        let (server_description, offered) = match event_rx.recv().await {
            Some(ServerEvent::Message(ServerMessage::Hello {
                description,
                extensions,
            })) => (description, extensions),
            Some(ServerEvent::Message(ServerMessage::Error { description })) => {
                connection.close();
                return Err(Error::Handshake(description));
            }
            Some(ServerEvent::Message(other)) => {
                connection.close();
                return Err(Error::Handshake(format!(
                    "expected HELLO, got {}",
                    other.kind()
                )));
            }
            Some(ServerEvent::Disconnected) | None => return Err(Error::ConnectionClosed),
        };

        let negotiated = extensions.intersection(offered);
        let agreed: Vec<Extension> = negotiated.iter().collect();
        info!(server = %server_description, negotiated = ?agreed, "Handshake complete");

        Ok(Self {
            connection,
            event_rx,
            server_description,
            negotiated,
            connected: true,
        })
    }

    /// Next message from the server, or `None` once disconnected
    pub async fn next_event(&mut self) -> Option<ServerMessage> {
        if !self.connected {
            return None;
        }
        match self.event_rx.recv().await {
            Some(ServerEvent::Message(message)) => Some(message),
            Some(ServerEvent::Disconnected) | None => {
                debug!("Connection to server lost");
                self.connected = false;
                None
            }
        }
    }

    pub fn server_description(&self) -> &str {
        &self.server_description
    }

    /// Extensions both sides agreed on
    pub fn negotiated(&self) -> Extensions {
        self.negotiated
    }

    pub fn supports(&self, ext: Extension) -> bool {
        self.negotiated.contains(ext)
    }

    pub fn is_connected(&self) -> bool {
        self.connected && !self.connection.is_closed()
    }

    pub fn send(&self, message: &ClientMessage) -> Result<()> {
        if self.connection.is_closed() {
            return Err(Error::NotConnected);
        }
        self.connection.write(message.encode());
        Ok(())
    }

    pub fn login(&self, username: &str) -> Result<()> {
        self.send(&ClientMessage::Login {
            username: username.to_string(),
        })
    }

    pub fn list(&self) -> Result<()> {
        self.send(&ClientMessage::List)
    }

    /// Join the default queue, or a named one
    pub fn queue(&self, name: Option<&str>) -> Result<()> {
        self.send(&ClientMessage::Queue {
            name: name.map(str::to_string),
        })
    }

    pub fn play(&self, values: &[u8]) -> Result<()> {
        self.send(&ClientMessage::Move {
            values: values.to_vec(),
        })
    }

    pub fn rank(&self) -> Result<()> {
        self.send(&ClientMessage::Rank)
    }

    pub fn chat(&self, message: &str) -> Result<()> {
        self.send(&ClientMessage::Chat {
            message: message.to_string(),
        })
    }

    pub fn whisper(&self, receiver: &str, message: &str) -> Result<()> {
        self.send(&ClientMessage::Whisper {
            receiver: receiver.to_string(),
            message: message.to_string(),
        })
    }

    pub fn disconnect(&self) {
        self.connection.close();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.connection.close();
    }
}
