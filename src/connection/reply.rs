//! Ordered Reply Delivery
//!
//! Requests on one connection may be answered by different class workers, so
//! replies can be produced out of order. Each request therefore reserves a
//! reply slot before it is routed:
//!
//! ```text
//!   reader ──reply_slot()──> ReplyHandle ──travels with the Command──> worker
//!      │                                                                 │
//!      └──> PendingReply ──> pending FIFO ──> ReplyWriter <──oneshot─────┘
//! ```
//!
//! The writer awaits slots strictly in FIFO order, so the client sees replies
//! in the order it sent requests. A slot whose handle is dropped without a
//! reply (malformed request, server stopping) is skipped.

use crate::connection::handler::ConnectionStats;
use crate::protocol::RespValue;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// Errors when delivering a reply to its connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// The connection went away before the reply could be queued for writing
    #[error("connection closed before the reply was written")]
    ConnectionClosed,
}

/// The write side of a reply slot. Owned by the command it answers.
#[derive(Debug)]
pub struct ReplyHandle {
    tx: oneshot::Sender<Bytes>,
}

/// The read side of a reply slot, queued in the connection's pending FIFO.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Bytes>,
}

/// Reserves a reply slot.
pub fn reply_slot() -> (ReplyHandle, PendingReply) {
    let (tx, rx) = oneshot::channel();
    (ReplyHandle { tx }, PendingReply { rx })
}

impl ReplyHandle {
    /// Encodes `value` and hands it to the connection's writer.
    pub fn send(self, value: &RespValue) -> Result<(), ReplyError> {
        self.tx
            .send(Bytes::from(value.serialize()))
            .map_err(|_| ReplyError::ConnectionClosed)
    }
}

impl PendingReply {
    /// Waits for the encoded reply. `None` means the slot was abandoned.
    pub async fn wait(self) -> Option<Bytes> {
        self.rx.await.ok()
    }
}

/// Writes the replies of one connection in request order.
pub struct ReplyWriter<W> {
    sink: BufWriter<W>,
    pending: mpsc::Receiver<PendingReply>,
    addr: SocketAddr,
    stats: Arc<ConnectionStats>,
}

impl<W: AsyncWrite + Unpin> ReplyWriter<W> {
    pub fn new(
        sink: W,
        pending: mpsc::Receiver<PendingReply>,
        addr: SocketAddr,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        Self {
            sink: BufWriter::new(sink),
            pending,
            addr,
            stats,
        }
    }

    /// Drains the pending FIFO until the reader side hangs up.
    ///
    /// A failed write drops that reply and stops the writer; there is no retry.
    pub async fn run(mut self) {
        while let Some(slot) = self.pending.recv().await {
            let Some(bytes) = slot.wait().await else {
                trace!(client = %self.addr, "Reply slot abandoned");
                continue;
            };

            if let Err(e) = self.write_reply(&bytes).await {
                warn!(client = %self.addr, error = %e, "Failed to write reply, dropping it");
                break;
            }
        }

        if let Err(e) = self.sink.shutdown().await {
            debug!(client = %self.addr, error = %e, "Failed to shut down connection");
        }
    }

    async fn write_reply(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.sink.write_all(bytes).await?;
        self.sink.flush().await?;
        self.stats.reply_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent reply");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:6379".parse().unwrap()
    }

    #[tokio::test]
    async fn test_slot_delivers_encoded_value() {
        let (handle, pending) = reply_slot();
        handle.send(&RespValue::pong()).unwrap();
        assert_eq!(pending.wait().await, Some(Bytes::from_static(b"+PONG\r\n")));
    }

    #[tokio::test]
    async fn test_abandoned_slot() {
        let (handle, pending) = reply_slot();
        drop(handle);
        assert_eq!(pending.wait().await, None);

        let (handle, pending) = reply_slot();
        drop(pending);
        assert_eq!(
            handle.send(&RespValue::ok()),
            Err(ReplyError::ConnectionClosed)
        );
    }

    /// Accepts every write but refuses to shut down.
    struct StubbornSink;

    impl AsyncWrite for StubbornSink {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::NotConnected.into()))
        }
    }

    #[tokio::test]
    async fn test_writer_finishes_when_shutdown_fails() {
        let stats = Arc::new(ConnectionStats::new());
        let (tx, rx) = mpsc::channel(8);
        let writer = tokio::spawn(
            ReplyWriter::new(StubbornSink, rx, test_addr(), Arc::clone(&stats)).run(),
        );

        let (handle, pending) = reply_slot();
        tx.send(pending).await.unwrap();
        drop(tx);
        handle.send(&RespValue::pong()).unwrap();

        writer.await.unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.replies_written, 1);
        assert_eq!(snapshot.bytes_written, 7);
    }

    #[tokio::test]
    async fn test_writer_preserves_slot_order() {
        let mock = tokio_test::io::Builder::new()
            .write(b"+OK\r\n")
            .write(b"$3\r\nbar\r\n")
            .build();
        let stats = Arc::new(ConnectionStats::new());
        let (tx, rx) = mpsc::channel(8);
        let writer = tokio::spawn(ReplyWriter::new(mock, rx, test_addr(), Arc::clone(&stats)).run());

        let (first, first_pending) = reply_slot();
        let (skipped, skipped_pending) = reply_slot();
        let (second, second_pending) = reply_slot();
        tx.send(first_pending).await.unwrap();
        tx.send(skipped_pending).await.unwrap();
        tx.send(second_pending).await.unwrap();
        drop(tx);

        // Answer out of order; the writer must still emit slot order.
        second.send(&RespValue::bulk_string("bar")).unwrap();
        drop(skipped);
        first.send(&RespValue::ok()).unwrap();

        writer.await.unwrap();
        assert_eq!(stats.snapshot().replies_written, 2);
    }
}
