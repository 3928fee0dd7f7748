//! Per-connection protocol state machine
//!
//! Decodes each inbound line, checks it against the session's phase and
//! negotiated extensions, and hands accepted requests to [`ServerState`].
//! Whether a session is queued or playing is read from the server state
//! rather than tracked here.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, error, info};

use crate::connection::LineHandler;
use crate::protocol::{ClientMessage, Extension, Extensions, ServerMessage};
use crate::session::{Handshake, Session};
use crate::state::{LoginOutcome, MoveOutcome, QueueOutcome, QueueRejection, ServerState};

/// Handshake progress of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for HELLO
    Connected,
    /// HELLO exchanged, waiting for LOGIN
    Greeted,
    Authenticated,
    Closed,
}

pub struct SessionHandler {
    session: Weak<Session>,
    state: Arc<ServerState>,
    phase: Mutex<Phase>,
}

impl SessionHandler {
    pub fn new(session: &Arc<Session>, state: Arc<ServerState>) -> Self {
        Self {
            session: Arc::downgrade(session),
            state,
            phase: Mutex::new(Phase::Connected),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `phase` unless the connection has already closed. The
    /// disconnect callback may run while a line is still being handled.
    fn advance(&self, phase: Phase) {
        let mut current = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != Phase::Closed {
            *current = phase;
        }
    }

    /// Enter the final phase, returning the one it replaced
    fn mark_closed(&self) -> Phase {
        let mut current = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, Phase::Closed)
    }

    fn dispatch(&self, session: &Arc<Session>, message: ClientMessage) {
        let kind = message.kind();
        match (self.phase(), message) {
            (Phase::Closed, _) => {}
            (Phase::Connected, ClientMessage::Hello { extensions, .. }) => {
                self.handle_hello(session, extensions)
            }
            (Phase::Connected, _) => session.send(&ServerMessage::error(format!(
                "Must HELLO before {kind}"
            ))),
            (_, ClientMessage::Hello { .. }) => {
                session.send(&ServerMessage::error("Already completed HELLO"))
            }
            (_, ClientMessage::Login { username }) => self.handle_login(session, &username),
            (_, ClientMessage::List) => {
                if self.require_login(session, kind) {
                    session.send(&ServerMessage::List {
                        usernames: self.state.usernames(),
                    });
                }
            }
            (_, ClientMessage::Queue { name }) => self.handle_queue(session, name),
            (_, ClientMessage::Move { values }) => {
                if self.require_login(session, kind) {
                    self.handle_move(session, &values);
                }
            }
            (_, ClientMessage::Rank) => {
                if self.require_extension(session, Extension::Rank)
                    && self.require_login(session, kind)
                {
                    session.send(&ServerMessage::Rank {
                        entries: self.state.ranks(),
                    });
                }
            }
            (_, ClientMessage::Chat { message }) => {
                if self.require_extension(session, Extension::Chat)
                    && self.require_login(session, kind)
                {
                    self.state.broadcast_chat(session, &message);
                }
            }
            (_, ClientMessage::Whisper { receiver, message }) => {
                if self.require_extension(session, Extension::Chat)
                    && self.require_login(session, kind)
                {
                    self.state.whisper(session, &receiver, &message);
                }
            }
        }
    }

    fn handle_hello(&self, session: &Session, declared: Extensions) {
        let negotiated = declared.intersection(self.state.extensions());
        session.complete_handshake(Handshake {
            declared,
            negotiated,
        });
        self.advance(Phase::Greeted);
        session.send(&ServerMessage::Hello {
            description: self.state.greeting().to_string(),
            extensions: negotiated,
        });
        debug!(session_id = %session.id(), ?negotiated, "Handshake complete");
    }

    fn handle_login(&self, session: &Session, username: &str) {
        match self.state.login(session, username) {
            LoginOutcome::Accepted => {
                self.advance(Phase::Authenticated);
                session.send(&ServerMessage::LoginAccepted);
            }
            LoginOutcome::AlreadyAuthenticated => {
                session.send(&ServerMessage::error("Already completed LOGIN"))
            }
            LoginOutcome::NameTaken => {
                debug!(session_id = %session.id(), username = %username, "Name taken");
                session.send(&ServerMessage::AlreadyLoggedIn);
            }
        }
    }

    fn handle_queue(&self, session: &Arc<Session>, name: Option<String>) {
        if name.is_some() && !self.require_extension(session, Extension::NamedQueues) {
            return;
        }
        if !self.require_login(session, crate::protocol::QUEUE) {
            return;
        }

        let name = name.unwrap_or_else(|| self.state.default_queue().to_string());
        match self.state.request_queue(session, &name) {
            Ok(QueueOutcome::Joined { queue }) => {
                debug!(username = %session.display_name(), queue = %queue, "Queued")
            }
            Ok(QueueOutcome::Left { queue }) => {
                debug!(username = %session.display_name(), queue = %queue, "Left queue")
            }
            Ok(QueueOutcome::Switched { from, to }) => {
                debug!(username = %session.display_name(), from = %from, to = %to, "Switched queue")
            }
            Err(QueueRejection::Disconnected) => {}
            Err(rejection) => session.send(&ServerMessage::error(rejection.to_string())),
        }
    }

    fn handle_move(&self, session: &Session, values: &[u8]) {
        match self.state.play_move(session, values) {
            Ok(MoveOutcome::Continue) => {}
            Ok(MoveOutcome::Finished(outcome)) => {
                debug!(username = %session.display_name(), ?outcome, "Final move")
            }
            Err(rejection) => session.send(&ServerMessage::error(rejection.to_string())),
        }
    }

    fn require_login(&self, session: &Session, kind: &str) -> bool {
        if session.is_authenticated() {
            return true;
        }
        session.send(&ServerMessage::error(format!("Must LOGIN before {kind}")));
        false
    }

    /// Both sides must have declared `ext`. The client hears which side is
    /// missing it.
    fn require_extension(&self, session: &Session, ext: Extension) -> bool {
        let declared = session
            .handshake()
            .map(|h| h.declared)
            .unwrap_or_default();
        if !declared.contains(ext) {
            session.send(&ServerMessage::error(format!(
                "Please add {ext} to your extensions and try again"
            )));
            return false;
        }
        if !self.state.extensions().contains(ext) {
            session.send(&ServerMessage::error(format!(
                "Server does not support {ext}"
            )));
            return false;
        }
        true
    }
}

impl LineHandler for SessionHandler {
    fn on_line(&self, line: &str) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        debug!(session_id = %session.id(), user = %session.display_name(), line = %line, "Received");

        match ClientMessage::decode(line) {
            Ok(message) => self.dispatch(&session, message),
            Err(e) => session.send(&ServerMessage::error(e.to_string())),
        }
    }

    fn on_disconnect(&self) {
        if self.mark_closed() == Phase::Closed {
            return;
        }
        let Some(session) = self.session.upgrade() else {
            return;
        };

        match self.state.disconnect(&session) {
            Ok(outcome) => info!(
                session_id = %session.id(),
                username = %session.display_name(),
                ?outcome,
                "Disconnected"
            ),
            Err(e) => error!(
                session_id = %session.id(),
                username = %session.display_name(),
                error = %e,
                "Disconnect left inconsistent state"
            ),
        }
    }
}
