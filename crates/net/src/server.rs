//! TCP game server
//!
//! Accepts connections and gives each one a session and a protocol handler.
//! All shared bookkeeping lives in [`ServerState`].

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::handler::SessionHandler;
use crate::session::Session;
use crate::state::ServerState;

/// Game server handle
pub struct Server {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start accepting. Port 0 picks an ephemeral port.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.socket_addr()).await?;
        let bound_addr = listener.local_addr()?;

        let state = Arc::new(ServerState::new(&config));
        info!(
            addr = %bound_addr,
            game = %config.game,
            extensions = ?config.extensions,
            "Server started"
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, state.clone(), shutdown_rx));

        Ok(Server {
            addr: bound_addr,
            state,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Stop accepting connections. Sessions already connected keep running.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    state: Arc<ServerState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        if let Err(e) = handle_connection(stream, &state) {
                            warn!(addr = %addr, error = %e, "Could not set up connection");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Register a session for the stream and start reading from it
fn handle_connection(stream: TcpStream, state: &Arc<ServerState>) -> Result<()> {
    let connection = Connection::open(stream)?;
    let session = Arc::new(Session::new(connection));
    state.register(session.clone());

    let handler = Arc::new(SessionHandler::new(&session, state.clone()));
    session.connection().start(handler);
    Ok(())
}
