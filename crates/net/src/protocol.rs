//! Wire protocol
//!
//! Every message is a single line of `~`-separated tokens; the first token
//! names the message kind. Trailing empty tokens are ignored, so
//! `HELLO~desc~` and `HELLO~desc` decode identically. Chat payloads are
//! taken as the rest of the line and may themselves contain `~`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

pub const SEPARATOR: char = '~';
const SEPARATOR_STR: &str = "~";

pub const HELLO: &str = "HELLO";
pub const LOGIN: &str = "LOGIN";
pub const LIST: &str = "LIST";
pub const MOVE: &str = "MOVE";
pub const ERROR: &str = "ERROR";
pub const ALREADY_LOGGED_IN: &str = "ALREADYLOGGEDIN";
pub const NEW_GAME: &str = "NEWGAME";
pub const GAME_OVER: &str = "GAMEOVER";
pub const QUEUE: &str = "QUEUE";
pub const RANK: &str = "RANK";
pub const CHAT: &str = "CHAT";
pub const WHISPER: &str = "WHISPER";
pub const CANNOT_WHISPER: &str = "CANNOTWHISPER";

/// Optional protocol capability, negotiated during HELLO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Extension {
    NamedQueues,
    Rank,
    Chat,
}

impl Extension {
    pub const ALL: [Extension; 3] = [Extension::NamedQueues, Extension::Rank, Extension::Chat];

    pub fn token(self) -> &'static str {
        match self {
            Extension::NamedQueues => "NAMEDQUEUES",
            Extension::Rank => "RANK",
            Extension::Chat => "CHAT",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ext| ext.token() == token)
    }

    fn bit(self) -> u8 {
        match self {
            Extension::NamedQueues => 0b001,
            Extension::Rank => 0b010,
            Extension::Chat => 0b100,
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Set of extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extensions(u8);

impl Extensions {
    pub const fn none() -> Self {
        Extensions(0)
    }

    pub fn all() -> Self {
        Extension::ALL.into_iter().collect()
    }

    pub fn contains(self, ext: Extension) -> bool {
        self.0 & ext.bit() != 0
    }

    pub fn insert(&mut self, ext: Extension) {
        self.0 |= ext.bit();
    }

    /// Extensions supported by both sides
    pub fn intersection(self, other: Self) -> Self {
        Extensions(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Extension> {
        Extension::ALL
            .into_iter()
            .filter(move |ext| self.contains(*ext))
    }
}

impl FromIterator<Extension> for Extensions {
    fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
        let mut set = Extensions::none();
        for ext in iter {
            set.insert(ext);
        }
        set
    }
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    Victory,
    Draw,
    Disconnect,
}

impl GameOverReason {
    pub const ALL: [GameOverReason; 3] = [
        GameOverReason::Victory,
        GameOverReason::Draw,
        GameOverReason::Disconnect,
    ];

    pub fn token(self) -> &'static str {
        match self {
            GameOverReason::Victory => "VICTORY",
            GameOverReason::Draw => "DRAW",
            GameOverReason::Disconnect => "DISCONNECT",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.token() == token)
    }

    /// Whether the reason is followed by the winner's name
    pub fn has_winner(self) -> bool {
        !matches!(self, GameOverReason::Draw)
    }
}

/// How a game ended, with the winner where there is one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    Victory(String),
    Draw,
    Disconnect(String),
}

impl GameOutcome {
    pub fn reason(&self) -> GameOverReason {
        match self {
            GameOutcome::Victory(_) => GameOverReason::Victory,
            GameOutcome::Draw => GameOverReason::Draw,
            GameOutcome::Disconnect(_) => GameOverReason::Disconnect,
        }
    }

    pub fn winner(&self) -> Option<&str> {
        match self {
            GameOutcome::Victory(name) | GameOutcome::Disconnect(name) => Some(name),
            GameOutcome::Draw => None,
        }
    }
}

/// Messages sent by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Hello {
        description: String,
        extensions: Extensions,
    },
    Login {
        username: String,
    },
    List,
    Queue {
        name: Option<String>,
    },
    Move {
        values: Vec<u8>,
    },
    Rank,
    Chat {
        message: String,
    },
    Whisper {
        receiver: String,
        message: String,
    },
}

impl ClientMessage {
    /// Wire name of this message kind
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Hello { .. } => HELLO,
            ClientMessage::Login { .. } => LOGIN,
            ClientMessage::List => LIST,
            ClientMessage::Queue { .. } => QUEUE,
            ClientMessage::Move { .. } => MOVE,
            ClientMessage::Rank => RANK,
            ClientMessage::Chat { .. } => CHAT,
            ClientMessage::Whisper { .. } => WHISPER,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ClientMessage::Hello {
                description,
                extensions,
            } => encode_hello(description, *extensions),
            ClientMessage::Login { username } => join(LOGIN, [username.as_str()]),
            ClientMessage::List => LIST.to_string(),
            ClientMessage::Queue { name: None } => QUEUE.to_string(),
            ClientMessage::Queue { name: Some(name) } => join(QUEUE, [name.as_str()]),
            ClientMessage::Move { values } => encode_values(MOVE, values),
            ClientMessage::Rank => RANK.to_string(),
            ClientMessage::Chat { message } => join(CHAT, [message.as_str()]),
            ClientMessage::Whisper { receiver, message } => {
                join(WHISPER, [receiver.as_str(), message.as_str()])
            }
        }
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let tokens = split_tokens(line);
        match tokens[0] {
            "" => Err(ProtocolError::Empty),
            HELLO => {
                let (description, extensions) = decode_hello(&tokens, "client description")?;
                Ok(ClientMessage::Hello {
                    description,
                    extensions,
                })
            }
            LOGIN => match tokens.len() {
                1 => Err(ProtocolError::MissingArgument {
                    kind: LOGIN,
                    what: "username",
                }),
                2 => Ok(ClientMessage::Login {
                    username: tokens[1].to_string(),
                }),
                _ => Err(ProtocolError::TooManyArguments(LOGIN)),
            },
            LIST => expect_bare(&tokens, LIST).map(|_| ClientMessage::List),
            QUEUE => match tokens.len() {
                1 => Ok(ClientMessage::Queue { name: None }),
                2 => Ok(ClientMessage::Queue {
                    name: Some(tokens[1].to_string()),
                }),
                _ => Err(ProtocolError::TooManyArguments(QUEUE)),
            },
            MOVE => Ok(ClientMessage::Move {
                values: decode_values(&tokens[1..], MOVE)?,
            }),
            RANK => expect_bare(&tokens, RANK).map(|_| ClientMessage::Rank),
            CHAT => Ok(ClientMessage::Chat {
                message: rest_of_line(line).ok_or(ProtocolError::MissingArgument {
                    kind: CHAT,
                    what: "message",
                })?,
            }),
            WHISPER => {
                let (receiver, message) = addressed_payload(line, WHISPER, "receiver")?;
                Ok(ClientMessage::Whisper { receiver, message })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello {
        description: String,
        extensions: Extensions,
    },
    LoginAccepted,
    AlreadyLoggedIn,
    List {
        usernames: Vec<String>,
    },
    NewGame {
        first: String,
        second: String,
    },
    Move {
        values: Vec<u8>,
    },
    GameOver(GameOutcome),
    Error {
        description: String,
    },
    Rank {
        entries: Vec<(String, u32)>,
    },
    Chat {
        sender: String,
        message: String,
    },
    Whisper {
        sender: String,
        message: String,
    },
    CannotWhisper {
        receiver: String,
    },
}

impl ServerMessage {
    pub fn error(description: impl Into<String>) -> Self {
        ServerMessage::Error {
            description: description.into(),
        }
    }

    /// Wire name of this message kind
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Hello { .. } => HELLO,
            ServerMessage::LoginAccepted => LOGIN,
            ServerMessage::AlreadyLoggedIn => ALREADY_LOGGED_IN,
            ServerMessage::List { .. } => LIST,
            ServerMessage::NewGame { .. } => NEW_GAME,
            ServerMessage::Move { .. } => MOVE,
            ServerMessage::GameOver(_) => GAME_OVER,
            ServerMessage::Error { .. } => ERROR,
            ServerMessage::Rank { .. } => RANK,
            ServerMessage::Chat { .. } => CHAT,
            ServerMessage::Whisper { .. } => WHISPER,
            ServerMessage::CannotWhisper { .. } => CANNOT_WHISPER,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ServerMessage::Hello {
                description,
                extensions,
            } => encode_hello(description, *extensions),
            ServerMessage::LoginAccepted => LOGIN.to_string(),
            ServerMessage::AlreadyLoggedIn => ALREADY_LOGGED_IN.to_string(),
            ServerMessage::List { usernames } => {
                format!("{LIST}{SEPARATOR}{}", usernames.join(SEPARATOR_STR))
            }
            ServerMessage::NewGame { first, second } => {
                join(NEW_GAME, [first.as_str(), second.as_str()])
            }
            ServerMessage::Move { values } => encode_values(MOVE, values),
            ServerMessage::GameOver(outcome) => match outcome.winner() {
                Some(winner) => join(GAME_OVER, [outcome.reason().token(), winner]),
                None => join(GAME_OVER, [outcome.reason().token()]),
            },
            ServerMessage::Error { description } => join(ERROR, [description.as_str()]),
            ServerMessage::Rank { entries } => {
                let pairs: Vec<String> = entries
                    .iter()
                    .map(|(name, wins)| format!("{name}{SEPARATOR}{wins}"))
                    .collect();
                format!("{RANK}{SEPARATOR}{}", pairs.join(SEPARATOR_STR))
            }
            ServerMessage::Chat { sender, message } => {
                join(CHAT, [sender.as_str(), message.as_str()])
            }
            ServerMessage::Whisper { sender, message } => {
                join(WHISPER, [sender.as_str(), message.as_str()])
            }
            ServerMessage::CannotWhisper { receiver } => join(CANNOT_WHISPER, [receiver.as_str()]),
        }
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let tokens = split_tokens(line);
        match tokens[0] {
            "" => Err(ProtocolError::Empty),
            HELLO => {
                let (description, extensions) = decode_hello(&tokens, "server description")?;
                Ok(ServerMessage::Hello {
                    description,
                    extensions,
                })
            }
            LOGIN => expect_bare(&tokens, LOGIN).map(|_| ServerMessage::LoginAccepted),
            ALREADY_LOGGED_IN => {
                expect_bare(&tokens, ALREADY_LOGGED_IN).map(|_| ServerMessage::AlreadyLoggedIn)
            }
            LIST => Ok(ServerMessage::List {
                usernames: tokens[1..].iter().map(|s| s.to_string()).collect(),
            }),
            NEW_GAME => match tokens.len() {
                3 => Ok(ServerMessage::NewGame {
                    first: tokens[1].to_string(),
                    second: tokens[2].to_string(),
                }),
                n if n < 3 => Err(ProtocolError::MissingArgument {
                    kind: NEW_GAME,
                    what: "player",
                }),
                _ => Err(ProtocolError::TooManyArguments(NEW_GAME)),
            },
            MOVE => Ok(ServerMessage::Move {
                values: decode_values(&tokens[1..], MOVE)?,
            }),
            GAME_OVER => decode_game_over(&tokens).map(ServerMessage::GameOver),
            ERROR => Ok(ServerMessage::Error {
                description: rest_of_line(line).ok_or(ProtocolError::MissingArgument {
                    kind: ERROR,
                    what: "description",
                })?,
            }),
            RANK => {
                let pairs = &tokens[1..];
                if pairs.len() % 2 != 0 {
                    return Err(ProtocolError::WrongArgumentType(RANK));
                }
                let entries = pairs
                    .chunks(2)
                    .map(|pair| {
                        pair[1]
                            .parse::<u32>()
                            .map(|wins| (pair[0].to_string(), wins))
                            .map_err(|_| ProtocolError::WrongArgumentType(RANK))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ServerMessage::Rank { entries })
            }
            CHAT => {
                let (sender, message) = addressed_payload(line, CHAT, "sender")?;
                Ok(ServerMessage::Chat { sender, message })
            }
            WHISPER => {
                let (sender, message) = addressed_payload(line, WHISPER, "sender")?;
                Ok(ServerMessage::Whisper { sender, message })
            }
            CANNOT_WHISPER => match tokens.len() {
                1 => Err(ProtocolError::MissingArgument {
                    kind: CANNOT_WHISPER,
                    what: "receiver",
                }),
                2 => Ok(ServerMessage::CannotWhisper {
                    receiver: tokens[1].to_string(),
                }),
                _ => Err(ProtocolError::TooManyArguments(CANNOT_WHISPER)),
            },
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Split a line into tokens, dropping trailing empty ones. Always yields at
/// least one token.
fn split_tokens(line: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = line.split(SEPARATOR).collect();
    while tokens.len() > 1 && tokens.last() == Some(&"") {
        tokens.pop();
    }
    tokens
}

/// Everything after the first separator
fn rest_of_line(line: &str) -> Option<String> {
    line.split_once(SEPARATOR).map(|(_, rest)| rest.to_string())
}

/// `KIND~name~message`, where the message runs to the end of the line
fn addressed_payload(
    line: &str,
    kind: &'static str,
    who: &'static str,
) -> Result<(String, String), ProtocolError> {
    let rest = rest_of_line(line)
        .filter(|rest| !rest.is_empty())
        .ok_or(ProtocolError::MissingArgument { kind, what: who })?;
    let (name, message) = rest
        .split_once(SEPARATOR)
        .ok_or(ProtocolError::MissingArgument {
            kind,
            what: "message",
        })?;
    Ok((name.to_string(), message.to_string()))
}

fn join<'a>(kind: &str, args: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = kind.to_string();
    for arg in args {
        line.push(SEPARATOR);
        line.push_str(arg);
    }
    line
}

fn expect_bare(tokens: &[&str], kind: &'static str) -> Result<(), ProtocolError> {
    if tokens.len() == 1 {
        Ok(())
    } else {
        Err(ProtocolError::TooManyArguments(kind))
    }
}

fn encode_hello(description: &str, extensions: Extensions) -> String {
    let tokens: Vec<&str> = extensions.iter().map(Extension::token).collect();
    format!(
        "{HELLO}{SEPARATOR}{description}{SEPARATOR}{}",
        tokens.join(SEPARATOR_STR)
    )
}

/// Unknown extension tokens are dropped rather than rejected
fn decode_hello(
    tokens: &[&str],
    what: &'static str,
) -> Result<(String, Extensions), ProtocolError> {
    if tokens.len() < 2 {
        return Err(ProtocolError::MissingArgument { kind: HELLO, what });
    }
    let extensions = tokens[2..]
        .iter()
        .filter_map(|token| Extension::from_token(token))
        .collect();
    Ok((tokens[1].to_string(), extensions))
}

fn encode_values(kind: &str, values: &[u8]) -> String {
    let values: Vec<String> = values.iter().map(u8::to_string).collect();
    join(kind, values.iter().map(String::as_str))
}

fn decode_values(tokens: &[&str], kind: &'static str) -> Result<Vec<u8>, ProtocolError> {
    tokens
        .iter()
        .map(|token| {
            token
                .parse::<u8>()
                .map_err(|_| ProtocolError::WrongArgumentType(kind))
        })
        .collect()
}

fn decode_game_over(tokens: &[&str]) -> Result<GameOutcome, ProtocolError> {
    let Some(token) = tokens.get(1) else {
        return Err(ProtocolError::MissingArgument {
            kind: GAME_OVER,
            what: "reason",
        });
    };
    let reason =
        GameOverReason::from_token(token).ok_or(ProtocolError::WrongArgumentType(GAME_OVER))?;

    let expected = if reason.has_winner() { 3 } else { 2 };
    if tokens.len() > expected {
        return Err(ProtocolError::TooManyArguments(GAME_OVER));
    }
    if tokens.len() < expected {
        return Err(ProtocolError::MissingArgument {
            kind: GAME_OVER,
            what: "winner",
        });
    }

    Ok(match reason {
        GameOverReason::Draw => GameOutcome::Draw,
        GameOverReason::Victory => GameOutcome::Victory(tokens[2].to_string()),
        GameOverReason::Disconnect => GameOutcome::Disconnect(tokens[2].to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_without_extensions_keeps_separator() {
        let msg = ServerMessage::Hello {
            description: "Hello from Quarto server".to_string(),
            extensions: Extensions::none(),
        };
        assert_eq!(msg.encode(), "HELLO~Hello from Quarto server~");
        assert_eq!(ServerMessage::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_hello_drops_unknown_extensions() {
        let decoded = ClientMessage::decode("HELLO~desc~RANK~ENCRYPTION~CHAT").unwrap();
        let expected: Extensions = [Extension::Rank, Extension::Chat].into_iter().collect();
        assert_eq!(
            decoded,
            ClientMessage::Hello {
                description: "desc".to_string(),
                extensions: expected,
            }
        );
    }

    #[test]
    fn test_hello_requires_description() {
        assert_eq!(
            ClientMessage::decode("HELLO").unwrap_err().to_string(),
            "No client description in HELLO"
        );
    }

    #[test]
    fn test_extension_intersection() {
        let client: Extensions = [Extension::Rank, Extension::Chat].into_iter().collect();
        let server: Extensions = [Extension::NamedQueues, Extension::Chat]
            .into_iter()
            .collect();
        let negotiated = client.intersection(server);
        assert_eq!(negotiated.iter().collect::<Vec<_>>(), vec![Extension::Chat]);
        assert_eq!(negotiated, server.intersection(client));
        assert!(Extensions::none().intersection(Extensions::all()).is_empty());
    }

    #[test]
    fn test_client_messages_roundtrip() {
        let messages = vec![
            ClientMessage::Hello {
                description: "client".to_string(),
                extensions: Extensions::all(),
            },
            ClientMessage::Login {
                username: "alice".to_string(),
            },
            ClientMessage::List,
            ClientMessage::Queue { name: None },
            ClientMessage::Queue {
                name: Some("ranked".to_string()),
            },
            ClientMessage::Move { values: vec![3] },
            ClientMessage::Move { values: vec![12, 7] },
            ClientMessage::Rank,
            ClientMessage::Chat {
                message: "gg~wp".to_string(),
            },
            ClientMessage::Whisper {
                receiver: "bob".to_string(),
                message: "psst ~ over here".to_string(),
            },
        ];
        for msg in messages {
            assert_eq!(ClientMessage::decode(&msg.encode()).unwrap(), msg);
        }
    }

    #[test]
    fn test_server_messages_roundtrip() {
        let messages = vec![
            ServerMessage::LoginAccepted,
            ServerMessage::AlreadyLoggedIn,
            ServerMessage::List {
                usernames: vec!["alice".to_string(), "bob".to_string()],
            },
            ServerMessage::List { usernames: vec![] },
            ServerMessage::NewGame {
                first: "alice".to_string(),
                second: "bob".to_string(),
            },
            ServerMessage::GameOver(GameOutcome::Draw),
            ServerMessage::GameOver(GameOutcome::Victory("alice".to_string())),
            ServerMessage::GameOver(GameOutcome::Disconnect("bob".to_string())),
            ServerMessage::error("Unknown command: FOO"),
            ServerMessage::Rank {
                entries: vec![("alice".to_string(), 2), ("bob".to_string(), 0)],
            },
            ServerMessage::Rank { entries: vec![] },
            ServerMessage::Chat {
                sender: "alice".to_string(),
                message: "a~b~c".to_string(),
            },
            ServerMessage::Whisper {
                sender: "bob".to_string(),
                message: "hi".to_string(),
            },
            ServerMessage::CannotWhisper {
                receiver: "carol".to_string(),
            },
        ];
        for msg in messages {
            assert_eq!(ServerMessage::decode(&msg.encode()).unwrap(), msg);
        }
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(
            ServerMessage::NewGame {
                first: "alice".to_string(),
                second: "bob".to_string()
            }
            .encode(),
            "NEWGAME~alice~bob"
        );
        assert_eq!(ServerMessage::Move { values: vec![3] }.encode(), "MOVE~3");
        assert_eq!(
            ServerMessage::GameOver(GameOutcome::Disconnect("bob".to_string())).encode(),
            "GAMEOVER~DISCONNECT~bob"
        );
        assert_eq!(
            ServerMessage::GameOver(GameOutcome::Draw).encode(),
            "GAMEOVER~DRAW"
        );
        assert_eq!(ServerMessage::List { usernames: vec![] }.encode(), "LIST~");
    }

    #[test]
    fn test_token_count_errors() {
        assert_eq!(
            ClientMessage::decode("LOGIN").unwrap_err().to_string(),
            "No username in LOGIN"
        );
        assert_eq!(
            ClientMessage::decode("LOGIN~a~b").unwrap_err().to_string(),
            "Too many arguments in LOGIN"
        );
        assert_eq!(
            ClientMessage::decode("LIST~x").unwrap_err(),
            ProtocolError::TooManyArguments(LIST)
        );
        assert_eq!(
            ClientMessage::decode("QUEUE~a~b").unwrap_err(),
            ProtocolError::TooManyArguments(QUEUE)
        );
        assert_eq!(
            ClientMessage::decode("MOVE~x").unwrap_err().to_string(),
            "Wrong argument type in MOVE"
        );
        assert_eq!(
            ClientMessage::decode("WHISPER~bob").unwrap_err(),
            ProtocolError::MissingArgument {
                kind: WHISPER,
                what: "message"
            }
        );
        assert_eq!(
            ClientMessage::decode("DANCE~now").unwrap_err().to_string(),
            "Unknown command: DANCE"
        );
        assert_eq!(ClientMessage::decode("").unwrap_err(), ProtocolError::Empty);
    }

    #[test]
    fn test_game_over_decoding() {
        assert!(ServerMessage::decode("GAMEOVER~VICTORY").is_err());
        assert!(ServerMessage::decode("GAMEOVER~DRAW~alice").is_err());
        assert_eq!(
            ServerMessage::decode("GAMEOVER~SURRENDER~alice").unwrap_err(),
            ProtocolError::WrongArgumentType(GAME_OVER)
        );
    }

    #[test]
    fn test_extension_tokens() {
        for ext in Extension::ALL {
            assert_eq!(Extension::from_token(ext.token()), Some(ext));
        }
        assert_eq!(Extension::NamedQueues.to_string(), "NAMEDQUEUES");
    }

    #[test]
    fn test_game_over_reason_tokens() {
        for reason in GameOverReason::ALL {
            assert_eq!(GameOverReason::from_token(reason.token()), Some(reason));
        }
        assert_eq!(GameOverReason::from_token("FORFEIT"), None);
        assert_eq!(
            ServerMessage::decode("GAMEOVER~FORFEIT~bob").unwrap_err(),
            ProtocolError::WrongArgumentType(GAME_OVER)
        );
        assert_eq!(
            ServerMessage::decode("GAMEOVER~DISCONNECT").unwrap_err(),
            ProtocolError::MissingArgument {
                kind: GAME_OVER,
                what: "winner"
            }
        );
    }
}
