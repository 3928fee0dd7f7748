//! Shared server state
//!
//! Three registries, each behind its own lock:
//!
//! - `queues`: named FIFO queues of sessions waiting for an opponent
//! - `sessions`: every registered session and the game it is bound to
//! - `ranks`: wins per username
//!
//! Each live game additionally carries its own lock around the game rules.
//! Locks are always taken in the order `queues -> game -> sessions -> ranks`
//! and never held across an await. Outbound messages are only queued on the
//! connection's write channel, so sending under a lock never blocks.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quarto_core::{Game, GameKind, Move, Seat};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::invariants;
use crate::protocol::{Extensions, GameOutcome, ServerMessage};
use crate::session::{Session, SessionId, ANONYMOUS};

pub type GameId = Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A registered session and the game it is playing, if any
pub(crate) struct Binding {
    pub(crate) session: Arc<Session>,
    pub(crate) game: Option<Arc<GameSession>>,
}

impl Binding {
    fn is_bound_to(&self, game: &Arc<GameSession>) -> bool {
        self.game.as_ref().is_some_and(|g| Arc::ptr_eq(g, game))
    }
}

/// Waiting sessions per named queue
#[derive(Default)]
pub(crate) struct Queues {
    pub(crate) waiting: HashMap<String, VecDeque<Arc<Session>>>,
    pub(crate) membership: HashMap<SessionId, String>,
}

impl Queues {
    fn join(&mut self, session: &Arc<Session>, name: &str) {
        self.waiting
            .entry(name.to_string())
            .or_default()
            .push_back(session.clone());
        self.membership.insert(session.id(), name.to_string());
    }

    /// Remove a session from whichever queue holds it
    fn leave(&mut self, id: SessionId) -> Option<String> {
        let name = self.membership.remove(&id)?;
        if let Some(queue) = self.waiting.get_mut(&name) {
            queue.retain(|s| s.id() != id);
            if queue.is_empty() {
                self.waiting.remove(&name);
            }
        }
        Some(name)
    }

    /// Take the two longest-waiting sessions off a queue
    fn pop_pair(&mut self, name: &str) -> Option<(Arc<Session>, Arc<Session>)> {
        let queue = self.waiting.get_mut(name)?;
        if queue.len() < 2 {
            return None;
        }
        let first = queue.pop_front()?;
        let second = queue.pop_front()?;
        if queue.is_empty() {
            self.waiting.remove(name);
        }
        self.membership.remove(&first.id());
        self.membership.remove(&second.id());
        Some((first, second))
    }
}

/// How a game stopped being live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conclusion {
    /// Reached a terminal position
    Finished,
    /// One participant left and the other was awarded the win
    Forfeited,
    /// Both participants left
    Abandoned,
}

struct GameTable {
    game: Box<dyn Game>,
    conclusion: Option<Conclusion>,
}

/// A game between two sessions
pub struct GameSession {
    id: GameId,
    players: [Arc<Session>; 2],
    /// Set under the sessions lock when a participant deregisters
    departed: [AtomicBool; 2],
    table: Mutex<GameTable>,
}

impl GameSession {
    fn new(game: Box<dyn Game>, first: Arc<Session>, second: Arc<Session>) -> Self {
        Self {
            id: Uuid::new_v4(),
            players: [first, second],
            departed: [AtomicBool::new(false), AtomicBool::new(false)],
            table: Mutex::new(GameTable {
                game,
                conclusion: None,
            }),
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn player(&self, seat: Seat) -> &Arc<Session> {
        &self.players[seat.index()]
    }

    pub fn seat_of(&self, id: SessionId) -> Option<Seat> {
        [Seat::First, Seat::Second]
            .into_iter()
            .find(|seat| self.player(*seat).id() == id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.seat_of(id).is_some()
    }

    pub fn is_live(&self) -> bool {
        lock(&self.table).conclusion.is_none()
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("first", &self.players[0].display_name())
            .field("second", &self.players[1].display_name())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    AlreadyAuthenticated,
    NameTaken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    Joined { queue: String },
    Left { queue: String },
    Switched { from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueRejection {
    #[error("Must finish game before QUEUE")]
    InGame,
    #[error("Session is no longer registered")]
    Disconnected,
}

/// Why a move was refused. The display text goes back to the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error("You are not in a game, please join a queue and wait")]
    NotInGame,
    #[error("Please wait for your turn")]
    NotYourTurn,
    #[error("Wrong number of arguments in MOVE")]
    WrongArity,
    #[error("Invalid move")]
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Continue,
    Finished(GameOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Neither queued nor playing
    Idle,
    LeftQueue { queue: String },
    /// The opponent was awarded the game
    Forfeit { winner: String },
    /// The opponent left at the same time
    Simultaneous,
    /// The game ended while the disconnect was being processed
    AlreadyConcluded,
}

/// What a departing session was doing when it deregistered
struct Departure {
    queue: Option<String>,
    game: Option<Arc<GameSession>>,
}

/// How an opponent looked when a departure was resolved
#[derive(Clone, Copy)]
enum Opponent {
    /// Still registered and bound to the game; now unbound
    Released,
    /// Deregistered through its own departure
    Departed,
    /// Registered but bound elsewhere
    Detached,
    /// Deregistered without departing
    Vanished,
}

/// Registries shared by every connection
pub struct ServerState {
    greeting: String,
    extensions: Extensions,
    default_queue: String,
    game_kind: GameKind,
    queues: Mutex<Queues>,
    sessions: Mutex<HashMap<SessionId, Binding>>,
    ranks: Mutex<BTreeMap<String, u32>>,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            greeting: config.greeting(),
            extensions: config.extension_set(),
            default_queue: config.default_queue.clone(),
            game_kind: config.game,
            queues: Mutex::new(Queues::default()),
            sessions: Mutex::new(HashMap::new()),
            ranks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Extensions this server offers
    pub fn extensions(&self) -> Extensions {
        self.extensions
    }

    pub fn default_queue(&self) -> &str {
        &self.default_queue
    }

    pub fn register(&self, session: Arc<Session>) {
        debug!(session_id = %session.id(), peer = %session.peer_addr(), "Session registered");
        lock(&self.sessions).insert(
            session.id(),
            Binding {
                session,
                game: None,
            },
        );
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Bind a username, unless the session already has one or another
    /// registered session holds it
    pub fn login(&self, session: &Session, username: &str) -> LoginOutcome {
        let sessions = lock(&self.sessions);
        if session.is_authenticated() {
            return LoginOutcome::AlreadyAuthenticated;
        }
        let taken = username == ANONYMOUS
            || sessions
                .values()
                .any(|b| b.session.username() == Some(username));
        if taken || !session.bind_username(username) {
            return LoginOutcome::NameTaken;
        }
        info!(session_id = %session.id(), username = %username, "Logged in");
        LoginOutcome::Accepted
    }

    /// Authenticated usernames, sorted
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.sessions)
            .values()
            .filter_map(|b| b.session.username().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    /// Snapshot of the rank table, ordered by username
    pub fn ranks(&self) -> Vec<(String, u32)> {
        lock(&self.ranks)
            .iter()
            .map(|(name, wins)| (name.clone(), *wins))
            .collect()
    }

    pub fn is_in_game(&self, id: SessionId) -> bool {
        lock(&self.sessions)
            .get(&id)
            .is_some_and(|b| b.game.is_some())
    }

    pub fn game_of(&self, id: SessionId) -> Option<Arc<GameSession>> {
        lock(&self.sessions).get(&id).and_then(|b| b.game.clone())
    }

    pub fn queue_of(&self, id: SessionId) -> Option<String> {
        lock(&self.queues).membership.get(&id).cloned()
    }

    /// Join, leave or switch queues. Requesting the queue a session is
    /// already waiting in leaves it. Any queue that holds two sessions
    /// afterwards starts a game.
    pub fn request_queue(
        &self,
        session: &Arc<Session>,
        name: &str,
    ) -> std::result::Result<QueueOutcome, QueueRejection> {
        let id = session.id();
        let mut queues = lock(&self.queues);
        let mut sessions = lock(&self.sessions);

        match sessions.get(&id) {
            None => return Err(QueueRejection::Disconnected),
            Some(binding) if binding.game.is_some() => return Err(QueueRejection::InGame),
            Some(_) => {}
        }

        let outcome = match queues.leave(id) {
            Some(current) if current == name => {
                debug!(session_id = %id, queue = %name, "Left queue");
                invariants::assert_registry_invariants(&queues, &sessions);
                return Ok(QueueOutcome::Left { queue: current });
            }
            Some(from) => QueueOutcome::Switched {
                from,
                to: name.to_string(),
            },
            None => QueueOutcome::Joined {
                queue: name.to_string(),
            },
        };

        queues.join(session, name);
        debug!(session_id = %id, queue = %name, "Joined queue");

        while let Some((first, second)) = queues.pop_pair(name) {
            self.start_game(&mut sessions, first, second);
        }

        invariants::assert_registry_invariants(&queues, &sessions);
        Ok(outcome)
    }

    /// Bind two sessions to a fresh game. NEWGAME goes out while the
    /// sessions lock is held so neither player can see a move first.
    fn start_game(
        &self,
        sessions: &mut HashMap<SessionId, Binding>,
        first: Arc<Session>,
        second: Arc<Session>,
    ) {
        let game = Arc::new(GameSession::new(self.game_kind.create(), first, second));
        for player in &game.players {
            if let Some(binding) = sessions.get_mut(&player.id()) {
                binding.game = Some(game.clone());
            }
        }

        info!(
            game_id = %game.id,
            first = %game.players[0].display_name(),
            second = %game.players[1].display_name(),
            "Game started"
        );

        let announcement = ServerMessage::NewGame {
            first: game.players[0].display_name().to_string(),
            second: game.players[1].display_name().to_string(),
        };
        for player in &game.players {
            player.send(&announcement);
        }
    }

    /// Validate and apply a move for `session`. The move is relayed to both
    /// participants, mover first; a terminal move also ends the game.
    pub fn play_move(
        &self,
        session: &Session,
        values: &[u8],
    ) -> std::result::Result<MoveOutcome, MoveRejection> {
        let id = session.id();
        let game = self.game_of(id).ok_or(MoveRejection::NotInGame)?;
        let seat = game.seat_of(id).ok_or(MoveRejection::NotInGame)?;

        let mut table = lock(&game.table);
        if table.conclusion.is_some() {
            return Err(MoveRejection::NotInGame);
        }
        if table.game.active_participant() != seat {
            return Err(MoveRejection::NotYourTurn);
        }
        let mv = Move::from_wire(values, table.game.is_first_ply())
            .map_err(|_| MoveRejection::WrongArity)?;
        if !table.game.is_legal(&mv) {
            return Err(MoveRejection::Invalid);
        }
        table
            .game
            .apply_move(mv)
            .map_err(|_| MoveRejection::Invalid)?;

        debug!(game_id = %game.id, player = %session.display_name(), ?mv, "Move applied");
        let relay = ServerMessage::Move {
            values: mv.to_wire(),
        };
        game.player(seat).send(&relay);
        game.player(seat.other()).send(&relay);

        if !table.game.is_terminal() {
            return Ok(MoveOutcome::Continue);
        }

        table.conclusion = Some(Conclusion::Finished);
        let outcome = match table.game.winner() {
            Some(winner) => GameOutcome::Victory(game.player(winner).display_name().to_string()),
            None => GameOutcome::Draw,
        };

        {
            let mut sessions = lock(&self.sessions);
            for player in &game.players {
                if let Some(binding) = sessions.get_mut(&player.id()) {
                    if binding.is_bound_to(&game) {
                        binding.game = None;
                    }
                }
            }
        }
        if let Some(winner) = outcome.winner() {
            self.award_win(winner);
        }

        info!(game_id = %game.id, outcome = ?outcome, "Game over");
        debug!(game_id = %game.id, board = %table.game.describe_board(), "Final position");
        let over = ServerMessage::GameOver(outcome.clone());
        for player in &game.players {
            player.send(&over);
        }
        Ok(MoveOutcome::Finished(outcome))
    }

    fn award_win(&self, username: &str) {
        *lock(&self.ranks).entry(username.to_string()).or_insert(0) += 1;
    }

    /// Deregister a session and settle whatever it was doing. A live game
    /// is forfeited to the opponent unless the opponent left as well.
    pub fn disconnect(&self, session: &Session) -> Result<DisconnectOutcome> {
        let departure = self.depart(session.id());
        match departure.game {
            Some(game) => self.resolve(session, &game),
            None => Ok(match departure.queue {
                Some(queue) => DisconnectOutcome::LeftQueue { queue },
                None => DisconnectOutcome::Idle,
            }),
        }
    }

    /// Remove the session from every registry. The departed flag is raised
    /// under the same lock that removes the registration.
    fn depart(&self, id: SessionId) -> Departure {
        let mut queues = lock(&self.queues);
        let mut sessions = lock(&self.sessions);

        let game = sessions.remove(&id).and_then(|binding| binding.game);
        let queue = queues.leave(id);
        if let Some(game) = &game {
            if let Some(seat) = game.seat_of(id) {
                game.departed[seat.index()].store(true, Ordering::Release);
            }
        }

        invariants::assert_registry_invariants(&queues, &sessions);
        Departure { queue, game }
    }

    /// Settle a departed participant's game under the game lock
    fn resolve(&self, session: &Session, game: &Arc<GameSession>) -> Result<DisconnectOutcome> {
        let seat = game.seat_of(session.id()).ok_or_else(|| {
            Error::InconsistentState(format!(
                "session {} bound to game {} it is not part of",
                session.id(),
                game.id
            ))
        })?;
        let opponent = game.player(seat.other()).clone();

        let mut table = lock(&game.table);
        match table.conclusion {
            Some(Conclusion::Abandoned) => return Ok(DisconnectOutcome::Simultaneous),
            Some(_) => return Ok(DisconnectOutcome::AlreadyConcluded),
            None => {}
        }

        let state = {
            let mut sessions = lock(&self.sessions);
            match sessions.get_mut(&opponent.id()) {
                Some(binding) if binding.is_bound_to(game) => {
                    binding.game = None;
                    Opponent::Released
                }
                Some(_) => Opponent::Detached,
                None if game.departed[seat.other().index()].load(Ordering::Acquire) => {
                    Opponent::Departed
                }
                None => Opponent::Vanished,
            }
        };

        match state {
            Opponent::Released => {
                table.conclusion = Some(Conclusion::Forfeited);
                let winner = opponent.display_name().to_string();
                self.award_win(&winner);
                opponent.send(&ServerMessage::GameOver(GameOutcome::Disconnect(
                    winner.clone(),
                )));
                info!(
                    game_id = %game.id,
                    winner = %winner,
                    loser = %session.display_name(),
                    "Game won by disconnect"
                );
                Ok(DisconnectOutcome::Forfeit { winner })
            }
            Opponent::Departed => {
                table.conclusion = Some(Conclusion::Abandoned);
                warn!(
                    game_id = %game.id,
                    username = %session.display_name(),
                    opponent = %opponent.display_name(),
                    "Both players disconnected at the same time"
                );
                Ok(DisconnectOutcome::Simultaneous)
            }
            Opponent::Detached | Opponent::Vanished => {
                table.conclusion = Some(Conclusion::Abandoned);
                let detail = match state {
                    Opponent::Detached => "registered but not bound to the game",
                    _ => "deregistered without departing",
                };
                error!(
                    game_id = %game.id,
                    username = %session.display_name(),
                    opponent = %opponent.display_name(),
                    detail,
                    "Inconsistent game state on disconnect"
                );
                Err(Error::InconsistentState(format!(
                    "opponent {} of game {} was {detail}",
                    opponent.display_name(),
                    game.id
                )))
            }
        }
    }

    /// Relay a chat line to every other session that can chat
    pub fn broadcast_chat(&self, sender: &Session, message: &str) {
        let chat = ServerMessage::Chat {
            sender: sender.display_name().to_string(),
            message: message.to_string(),
        };
        let sessions = lock(&self.sessions);
        for binding in sessions.values() {
            if binding.session.id() != sender.id() && binding.session.can_chat() {
                binding.session.send(&chat);
            }
        }
    }

    /// Deliver a private line. Returns false, after telling the sender,
    /// when nobody who can chat goes by `receiver`.
    pub fn whisper(&self, sender: &Session, receiver: &str, message: &str) -> bool {
        let sessions = lock(&self.sessions);
        let target = sessions
            .values()
            .map(|b| &b.session)
            .find(|s| s.username() == Some(receiver) && s.can_chat());

        match target {
            Some(target) => {
                target.send(&ServerMessage::Whisper {
                    sender: sender.display_name().to_string(),
                    message: message.to_string(),
                });
                true
            }
            None => {
                sender.send(&ServerMessage::CannotWhisper {
                    receiver: receiver.to_string(),
                });
                false
            }
        }
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("greeting", &self.greeting)
            .field("extensions", &self.extensions)
            .field("default_queue", &self.default_queue)
            .field("game_kind", &self.game_kind)
            .finish_non_exhaustive()
    }
}
