//! Connection Handler Implementation
//!
//! This module handles the lifecycle of a single client connection.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. Handler created; stream split into read and write halves
//!        │
//!        ▼
//! 3. Main loop:
//!    ┌──────────────────────────────────────────────┐
//!    │  a. Read bytes into buffer                   │
//!    │  b. Decode complete frames                   │
//!    │  c. Reserve a reply slot per frame           │
//!    │  d. Route the frame to its class queue       │
//!    │  e. Writer task writes replies in slot order │
//!    └──────────────────────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / protocol error / server stopping
//!        │
//!        ▼
//! 5. Writer finishes the replies already produced, then the socket closes
//! ```
//!
//! ## Buffer Management
//!
//! We use a BytesMut buffer to accumulate incoming data. This is important
//! because TCP is a stream protocol - we might receive partial commands,
//! or multiple commands in a single read.

use crate::commands::{CommandFormatError, RouteError, Router};
use crate::connection::reply::{reply_slot, PendingReply, ReplyWriter};
use crate::protocol::{ParseError, RespParser, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Largest unparsed input a connection may buffer before it is closed
    pub max_buffer_size: usize,
    /// How many requests may wait for their reply at once
    pub reply_queue_depth: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            max_buffer_size: 64 * 1024 * 1024,
            reply_queue_depth: 1024,
        }
    }
}

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests decoded
    pub requests_received: AtomicU64,
    /// Total replies written
    pub replies_written: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

/// A point-in-time copy of [`ConnectionStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub connections_accepted: u64,
    pub active_connections: u64,
    pub requests_received: u64,
    pub replies_written: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn reply_written(&self, count: usize) {
        self.replies_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            requests_received: self.requests_received.load(Ordering::Relaxed),
            replies_written: self.replies_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Handles a single client connection.
///
/// The read half decodes and routes requests; the write half is owned by a
/// [`ReplyWriter`] task that answers them in order.
pub struct ConnectionHandler<S> {
    reader: RequestReader<ReadHalf<S>>,
    writer: ReplyWriter<WriteHalf<S>>,
    addr: SocketAddr,
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `router` - Routes requests to the class queues
    /// * `stats` - Shared connection statistics
    /// * `settings` - Per-connection limits
    pub fn new(
        stream: S,
        addr: SocketAddr,
        router: Router,
        stats: Arc<ConnectionStats>,
        settings: ConnectionSettings,
    ) -> Self {
        stats.connection_opened();

        let (read_half, write_half) = tokio::io::split(stream);
        let (replies_tx, replies_rx) = mpsc::channel(settings.reply_queue_depth.max(1));

        Self {
            reader: RequestReader {
                stream: read_half,
                addr,
                buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
                parser: RespParser::new(),
                router,
                replies: replies_tx,
                stats: Arc::clone(&stats),
                max_buffer_size: settings.max_buffer_size,
            },
            writer: ReplyWriter::new(write_half, replies_rx, addr, Arc::clone(&stats)),
            addr,
            stats,
        }
    }

    /// Runs the connection until the client leaves or misbehaves.
    pub async fn run(self) -> Result<(), ConnectionError> {
        let Self {
            mut reader,
            writer,
            addr,
            stats,
        } = self;

        info!(client = %addr, "Client connected");

        let writer = tokio::spawn(writer.run());
        let result = reader.main_loop().await;

        // Hanging up the pending FIFO lets the writer flush what is left and close
        drop(reader);
        if let Err(e) = writer.await {
            error!(client = %addr, error = %e, "Reply writer task failed");
        }

        match &result {
            Ok(()) => info!(client = %addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    info!(client = %addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %addr, "Connection reset by client")
                }
                ConnectionError::ServerStopping => {
                    debug!(client = %addr, "Server stopping, closing connection")
                }
                _ => warn!(client = %addr, error = %e, "Closing connection"),
            },
        }

        stats.connection_closed();
        result
    }
}

/// The read side of a connection.
struct RequestReader<R> {
    stream: R,
    addr: SocketAddr,
    buffer: BytesMut,
    parser: RespParser,
    router: Router,
    replies: mpsc::Sender<PendingReply>,
    stats: Arc<ConnectionStats>,
    max_buffer_size: usize,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    /// The main read-decode-route loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(frame) = self.try_parse_frame()? {
                self.submit(frame).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Attempts to decode one frame from the buffer.
    fn try_parse_frame(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((value, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed frame"
                );
                Ok(Some(value))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete frame, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Protocol error");
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    /// Reserves a reply slot for the frame and hands the frame to the router.
    async fn submit(&mut self, frame: RespValue) -> Result<(), ConnectionError> {
        let (origin, pending) = reply_slot();
        self.replies
            .send(pending)
            .await
            .map_err(|_| ConnectionError::WriterClosed)?;
        self.stats.request_received();

        match self.router.route(frame, origin).await {
            Ok(class) => {
                trace!(client = %self.addr, class = %class, "Request queued");
                Ok(())
            }
            Err(RouteError::UnknownCommand(name)) => {
                debug!(client = %self.addr, command = %name, "Unknown command");
                Ok(())
            }
            Err(RouteError::Malformed(e)) => {
                warn!(client = %self.addr, error = %e, "Malformed request");
                Err(ConnectionError::InvalidCommand(e))
            }
            Err(RouteError::Stopped) => Err(ConnectionError::ServerStopping),
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= self.max_buffer_size {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial frame in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }
}

/// Errors that can occur while handling a connection.
///
/// All of them end the connection; none of them affect other connections.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// RESP parse error
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// A well-formed frame that is not a command
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] CommandFormatError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial command)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,

    /// The class workers have stopped
    #[error("Server stopping")]
    ServerStopping,

    /// The reply writer stopped (usually a failed write)
    #[error("Reply writer closed")]
    WriterClosed,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    router: Router,
    stats: Arc<ConnectionStats>,
    settings: ConnectionSettings,
) {
    let handler = ConnectionHandler::new(stream, addr, router, stats, settings);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
