//! Line-oriented TCP transport
//!
//! Wire format: UTF-8 text, one message per `\n`-terminated line. Bytes that
//! are not valid UTF-8 are replaced rather than treated as a transport fault.
//!
//! Each connection runs one read task and one write task. Reads are handed
//! to a [`LineHandler`] in arrival order; writes are queued to the write
//! task so callers never wait on the socket and lines go out in the order
//! they were written. A peer that sends a line longer than
//! [`MAX_LINE_LENGTH`] or stops draining its outbound queue is dropped.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::error::Result;

/// Maximum inbound line length in bytes, excluding the terminator
pub const MAX_LINE_LENGTH: usize = 16 * 1024;

/// Lines that may wait for the write task before the peer is dropped
pub const OUTBOUND_CAPACITY: usize = 256;

/// Receives the lines read from a connection
pub trait LineHandler: Send + Sync + 'static {
    /// Called once per received line, without the terminator
    fn on_line(&self, line: &str);

    /// Called exactly once, after the connection has closed
    fn on_disconnect(&self);
}

/// State shared by the connection handle and its tasks
struct Shared {
    peer: SocketAddr,
    closed: AtomicBool,
    notified: AtomicBool,
    close_tx: watch::Sender<bool>,
    handler: OnceLock<Arc<dyn LineHandler>>,
}

impl Shared {
    fn new(peer: SocketAddr) -> Self {
        let (close_tx, _) = watch::channel(false);
        Self {
            peer,
            closed: AtomicBool::new(false),
            notified: AtomicBool::new(false),
            close_tx,
            handler: OnceLock::new(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.abort();
        self.notify_disconnect();
    }

    /// Mark the connection closed and stop both tasks, leaving the
    /// disconnect callback to the read task. Safe to call under locks.
    fn abort(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(peer = %self.peer, "Closing connection");
        self.close_tx.send_replace(true);
    }

    /// Resolves once the connection has been closed
    async fn wait_closed(&self) {
        let mut close_rx = self.close_tx.subscribe();
        let _ = close_rx.wait_for(|closed| *closed).await;
    }

    fn notify_disconnect(&self) {
        if let Some(handler) = self.handler.get() {
            if !self.notified.swap(true, Ordering::AcqRel) {
                handler.on_disconnect();
            }
        }
    }
}

/// One end of a line-oriented TCP connection
pub struct Connection {
    shared: Arc<Shared>,
    outbound: mpsc::Sender<String>,
    reader: Mutex<Option<OwnedReadHalf>>,
}

impl Connection {
    /// Wrap an established stream. Writing is possible immediately; reading
    /// begins once [`Connection::start`] registers a handler.
    pub fn open(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(Shared::new(peer));
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        tokio::spawn(write_task(write_half, outbound_rx, shared.clone()));

        Ok(Self {
            shared,
            outbound,
            reader: Mutex::new(Some(read_half)),
        })
    }

    /// Connect to a remote address
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Self::open(stream)
    }

    /// Register the line handler and start reading. Subsequent calls are
    /// ignored.
    pub fn start(&self, handler: Arc<dyn LineHandler>) {
        let read_half = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(read_half) = read_half else {
            debug!(peer = %self.shared.peer, "Connection already started");
            return;
        };

        let _ = self.shared.handler.set(handler);
        tokio::spawn(read_task(read_half, self.shared.clone()));

        // Closed before the handler existed: deliver the missed notification
        if self.shared.is_closed() {
            self.shared.notify_disconnect();
        }
    }

    /// Queue a line for sending. The terminator is appended by the writer.
    /// Lines written after close are dropped. Never waits, so it may be
    /// called under locks; a full queue closes the connection.
    pub fn write(&self, line: impl Into<String>) {
        if self.shared.is_closed() {
            return;
        }
        match self.outbound.try_send(line.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(peer = %self.shared.peer, "Outbound queue full, dropping peer");
                self.shared.abort();
            }
            // The write task has already shut down
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Close the connection. Idempotent.
    ///
    /// Runs the handler's disconnect callback synchronously, so it must not
    /// be called while holding locks that callback takes.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer
    }

    /// A connection without a socket whose written lines arrive on the
    /// returned receiver
    #[cfg(test)]
    pub(crate) fn loopback(peer: SocketAddr) -> (Self, mpsc::Receiver<String>) {
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let connection = Self {
            shared: Arc::new(Shared::new(peer)),
            outbound,
            reader: Mutex::new(None),
        };
        (connection, outbound_rx)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.shared.peer)
            .field("closed", &self.shared.is_closed())
            .finish()
    }
}

/// One read from the peer
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Line(String),
    TooLong,
    Eof,
}

/// Read one line of at most [`MAX_LINE_LENGTH`] bytes. A trailing `\r` is
/// stripped and a final unterminated line is still delivered.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<Inbound> {
    let limit = MAX_LINE_LENGTH as u64 + 1;
    let mut buf = Vec::new();
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if read == 0 {
        return Ok(Inbound::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if read as u64 == limit {
        return Ok(Inbound::TooLong);
    }
    Ok(Inbound::Line(String::from_utf8_lossy(&buf).into_owned()))
}

/// Read task - forwards lines to the handler until EOF, error or close
async fn read_task(read_half: OwnedReadHalf, shared: Arc<Shared>) {
    let mut reader = BufReader::new(read_half);

    loop {
        tokio::select! {
            result = read_line(&mut reader) => match result {
                Ok(Inbound::Line(line)) => {
                    if let Some(handler) = shared.handler.get() {
                        handler.on_line(&line);
                    }
                }
                Ok(Inbound::TooLong) => {
                    warn!(peer = %shared.peer, max = MAX_LINE_LENGTH, "Line too long, dropping peer");
                    break;
                }
                Ok(Inbound::Eof) => {
                    debug!(peer = %shared.peer, "Peer closed connection");
                    break;
                }
                Err(e) => {
                    debug!(peer = %shared.peer, error = %e, "Read failed");
                    break;
                }
            },
            _ = shared.wait_closed() => break,
        }
    }

    shared.close();
}

/// Write task - sole owner of the write half
async fn write_task(
    write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<String>,
    shared: Arc<Shared>,
) {
    let mut writer = BufWriter::new(write_half);

    loop {
        tokio::select! {
            line = outbound.recv() => {
                let Some(line) = line else { break };
                if let Err(e) = write_line(&mut writer, &line).await {
                    debug!(peer = %shared.peer, error = %e, "Write failed");
                    shared.close();
                    break;
                }
            }
            _ = shared.wait_closed() => break,
        }
    }

    let _ = writer.shutdown().await;
}

async fn write_line(writer: &mut BufWriter<OwnedWriteHalf>, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
