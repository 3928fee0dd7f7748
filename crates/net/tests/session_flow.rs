//! End-to-end sessions over real sockets

use std::time::Duration;

use quarto_net::{
    Client, ClientMessage, Extension, Extensions, GameOutcome, Server, ServerConfig,
    ServerMessage,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> Server {
    let config = ServerConfig {
        bind: "127.0.0.1".parse().unwrap(),
        ..ServerConfig::default()
    }
    .with_port(0);
    Server::start(config).await.unwrap()
}

/// A client speaking raw protocol lines
struct RawPeer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl RawPeer {
    async fn connect(server: &Server) -> Self {
        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn send_bytes(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    async fn recv(&mut self) -> String {
        tokio::time::timeout(TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for server")
            .unwrap()
            .expect("server closed connection")
    }
}

async fn next(client: &mut Client) -> ServerMessage {
    tokio::time::timeout(TIMEOUT, client.next_event())
        .await
        .expect("timed out waiting for server")
        .expect("server closed connection")
}

#[tokio::test]
async fn test_handshake_login_queue_and_move() {
    let server = start_server().await;
    let mut alice = RawPeer::connect(&server).await;
    let mut bob = RawPeer::connect(&server).await;
    let mut imposter = RawPeer::connect(&server).await;

    alice.send("HELLO~desc").await;
    assert_eq!(alice.recv().await, "HELLO~Hello from Quarto server~");
    alice.send("LOGIN~alice").await;
    assert_eq!(alice.recv().await, "LOGIN");

    imposter.send("HELLO~desc").await;
    imposter.recv().await;
    imposter.send("LOGIN~alice").await;
    assert_eq!(imposter.recv().await, "ALREADYLOGGEDIN");

    bob.send("HELLO~desc").await;
    bob.recv().await;
    bob.send("LOGIN~bob").await;
    assert_eq!(bob.recv().await, "LOGIN");

    alice.send("QUEUE").await;
    bob.send("QUEUE").await;
    assert_eq!(alice.recv().await, "NEWGAME~alice~bob");
    assert_eq!(bob.recv().await, "NEWGAME~alice~bob");

    alice.send("MOVE~3").await;
    assert_eq!(alice.recv().await, "MOVE~3");
    assert_eq!(bob.recv().await, "MOVE~3");
}

#[tokio::test]
async fn test_protocol_errors_keep_connection_open() {
    let server = start_server().await;
    let mut peer = RawPeer::connect(&server).await;

    peer.send("LIST").await;
    assert_eq!(peer.recv().await, "ERROR~Must HELLO before LIST");
    peer.send("HELLO").await;
    assert_eq!(peer.recv().await, "ERROR~No client description in HELLO");
    peer.send("HELLO~desc~RANK").await;
    assert_eq!(peer.recv().await, "HELLO~Hello from Quarto server~RANK");
    peer.send("RANK").await;
    assert_eq!(peer.recv().await, "ERROR~Must LOGIN before RANK");
    peer.send("LOGIN~a~b").await;
    assert_eq!(peer.recv().await, "ERROR~Too many arguments in LOGIN");
    peer.send("LOGIN~carol").await;
    assert_eq!(peer.recv().await, "LOGIN");
    peer.send("RANK").await;
    assert_eq!(peer.recv().await, "RANK~");
}

#[tokio::test]
async fn test_invalid_utf8_is_not_a_disconnect() {
    let server = start_server().await;
    let mut carol = RawPeer::connect(&server).await;
    let mut dave = RawPeer::connect(&server).await;

    for (peer, name) in [(&mut carol, "carol"), (&mut dave, "dave")] {
        peer.send("HELLO~desc~CHAT").await;
        peer.recv().await;
        peer.send(&format!("LOGIN~{name}")).await;
        assert_eq!(peer.recv().await, "LOGIN");
    }

    carol.send_bytes(b"CHAT~caf\xe9\n").await;
    assert_eq!(dave.recv().await, "CHAT~carol~caf\u{FFFD}");

    carol.send("LIST").await;
    assert_eq!(carol.recv().await, "LIST~carol~dave");
    assert_eq!(server.state().session_count(), 2);
}

#[tokio::test]
async fn test_disconnect_awards_win() {
    let server = start_server().await;
    let mut alice = Client::connect(server.addr(), "alice's client", Extensions::all())
        .await
        .unwrap();
    let mut bob = Client::connect(server.addr(), "bob's client", Extensions::all())
        .await
        .unwrap();

    alice.login("alice").unwrap();
    assert_eq!(next(&mut alice).await, ServerMessage::LoginAccepted);
    bob.login("bob").unwrap();
    assert_eq!(next(&mut bob).await, ServerMessage::LoginAccepted);

    alice.queue(Some("ranked")).unwrap();
    bob.queue(Some("ranked")).unwrap();
    let new_game = ServerMessage::NewGame {
        first: "alice".to_string(),
        second: "bob".to_string(),
    };
    assert_eq!(next(&mut alice).await, new_game);
    assert_eq!(next(&mut bob).await, new_game);

    drop(bob);
    assert_eq!(
        next(&mut alice).await,
        ServerMessage::GameOver(GameOutcome::Disconnect("alice".to_string()))
    );

    alice.rank().unwrap();
    assert_eq!(
        next(&mut alice).await,
        ServerMessage::Rank {
            entries: vec![("alice".to_string(), 1)]
        }
    );

    // Free to queue again
    alice.queue(None).unwrap();
    alice.list().unwrap();
    assert_eq!(
        next(&mut alice).await,
        ServerMessage::List {
            usernames: vec!["alice".to_string()]
        }
    );
}

#[tokio::test]
async fn test_chat_and_whisper() {
    let server = start_server().await;
    let chat: Extensions = [Extension::Chat].into_iter().collect();
    let mut alice = Client::connect(server.addr(), "a", chat).await.unwrap();
    let mut bob = Client::connect(server.addr(), "b", chat).await.unwrap();

    alice.login("alice").unwrap();
    next(&mut alice).await;
    bob.login("bob").unwrap();
    next(&mut bob).await;

    alice.chat("good luck ~ have fun").unwrap();
    assert_eq!(
        next(&mut bob).await,
        ServerMessage::Chat {
            sender: "alice".to_string(),
            message: "good luck ~ have fun".to_string()
        }
    );

    bob.whisper("alice", "psst").unwrap();
    assert_eq!(
        next(&mut alice).await,
        ServerMessage::Whisper {
            sender: "bob".to_string(),
            message: "psst".to_string()
        }
    );

    bob.send(&ClientMessage::Whisper {
        receiver: "nobody".to_string(),
        message: "hello?".to_string(),
    })
    .unwrap();
    assert_eq!(
        next(&mut bob).await,
        ServerMessage::CannotWhisper {
            receiver: "nobody".to_string()
        }
    );
}

#[tokio::test]
async fn test_full_game_to_draw() {
    let server = start_server().await;
    let mut alice = Client::connect(server.addr(), "a", Extensions::none())
        .await
        .unwrap();
    let mut bob = Client::connect(server.addr(), "b", Extensions::none())
        .await
        .unwrap();
    alice.login("alice").unwrap();
    next(&mut alice).await;
    bob.login("bob").unwrap();
    next(&mut bob).await;
    alice.queue(None).unwrap();
    bob.queue(None).unwrap();
    next(&mut alice).await;
    next(&mut bob).await;

    // Piece n goes to field n. Every move is echoed to both players.
    let mut moves = vec![vec![0u8]];
    moves.extend((0..15u8).map(|n| vec![n, n + 1]));
    // The last piece goes down and nothing is left to hand over
    moves.push(vec![15, 17]);

    let mut players = [alice, bob];
    for (ply, values) in moves.into_iter().enumerate() {
        players[ply % 2].play(&values).unwrap();
        for player in players.iter_mut() {
            assert_eq!(
                next(player).await,
                ServerMessage::Move {
                    values: values.clone()
                }
            );
        }
    }

    for player in players.iter_mut() {
        assert_eq!(next(player).await, ServerMessage::GameOver(GameOutcome::Draw));
    }
}
