//! Class Workers
//!
//! One long-lived task per [`CommandClass`]. A worker waits for either the
//! next queued command or the stop signal, runs the class handler, and hands
//! the encoded reply back to the originating connection.
//!
//! Because exactly one worker drains each queue, commands of a class are
//! executed one at a time in queue order. For the Store class this is what
//! serializes every store access across all connections.

use crate::commands::command::{Command, CommandClass};
use crate::commands::handler::ClassHandler;
use crate::server::{StopMode, StopSignal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// The consumer of one class queue.
pub struct ClassWorker<H> {
    class: CommandClass,
    handler: H,
    queue: mpsc::Receiver<Command>,
    shutdown: StopSignal,
}

impl<H: ClassHandler> ClassWorker<H> {
    pub fn new(handler: H, queue: mpsc::Receiver<Command>, shutdown: StopSignal) -> Self {
        Self {
            class: handler.class(),
            handler,
            queue,
            shutdown,
        }
    }

    /// Runs the worker as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Processes commands until stopped or until every router is dropped.
    ///
    /// On [`StopMode::Immediate`] queued commands are abandoned; their
    /// connections see the reply slot dropped. On [`StopMode::Drain`] the
    /// queue is closed to new commands and everything already queued is
    /// answered first.
    pub async fn run(mut self) {
        debug!(class = %self.class, "Class worker started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    let mode = match changed {
                        Ok(()) => *self.shutdown.borrow(),
                        // The server handle is gone
                        Err(_) => Some(StopMode::Immediate),
                    };
                    match mode {
                        Some(StopMode::Immediate) => break,
                        Some(StopMode::Drain) => {
                            self.drain().await;
                            break;
                        }
                        None => continue,
                    }
                }

                command = self.queue.recv() => match command {
                    Some(command) => self.process(command),
                    None => break,
                },
            }
        }

        debug!(class = %self.class, "Class worker stopped");
    }

    async fn drain(&mut self) {
        self.queue.close();

        let mut drained = 0usize;
        while let Some(command) = self.queue.recv().await {
            self.process(command);
            drained += 1;
        }

        debug!(class = %self.class, drained, "Class queue drained");
    }

    /// Runs one command and delivers its reply.
    fn process(&mut self, command: Command) {
        trace!(
            class = %self.class,
            command = %command.name,
            args = command.args.len(),
            "Handling command"
        );

        let response = match self.handler.handle(&command) {
            Ok(response) => response,
            Err(e) => {
                debug!(class = %self.class, command = %command.name, error = %e, "Command failed");
                e.to_resp()
            }
        };

        if let Err(e) = command.origin.send(&response) {
            warn!(
                class = %self.class,
                command = %command.name,
                error = %e,
                "Dropping reply"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::command::CommandTable;
    use crate::commands::handler::{GeneralHandler, StoreHandler};
    use crate::commands::router::Router;
    use crate::connection::reply::{reply_slot, PendingReply};
    use crate::protocol::RespValue;
    use crate::storage::MemoryStore;
    use bytes::Bytes;
    use std::sync::Arc;
    use tokio::sync::watch;

    fn frame(parts: &[&'static str]) -> RespValue {
        RespValue::array(parts.iter().map(|p| RespValue::bulk_string(*p)).collect())
    }

    async fn send(router: &Router, parts: &[&'static str]) -> PendingReply {
        let (origin, pending) = reply_slot();
        router.route(frame(parts), origin).await.unwrap();
        pending
    }

    #[tokio::test]
    async fn test_worker_answers_commands() {
        let (router, queues) = Router::new(Arc::new(CommandTable::default()), 8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(None);
        ClassWorker::new(StoreHandler::new(MemoryStore::new()), queues.store, shutdown_rx.clone())
            .spawn();
        ClassWorker::new(GeneralHandler::new(), queues.general, shutdown_rx).spawn();

        let set = send(&router, &["SET", "foo", "bar"]).await;
        let get = send(&router, &["GET", "foo"]).await;
        let ping = send(&router, &["PING"]).await;
        let bad = send(&router, &["GET"]).await;

        assert_eq!(set.wait().await, Some(Bytes::from_static(b"+OK\r\n")));
        assert_eq!(get.wait().await, Some(Bytes::from_static(b"$3\r\nbar\r\n")));
        assert_eq!(ping.wait().await, Some(Bytes::from_static(b"+PONG\r\n")));
        assert_eq!(
            bad.wait().await,
            Some(Bytes::from_static(
                b"-ERR wrong number of arguments for 'get' command\r\n"
            ))
        );
    }

    #[tokio::test]
    async fn test_worker_survives_closed_connection() {
        let (router, queues) = Router::new(Arc::new(CommandTable::default()), 8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(None);
        ClassWorker::new(GeneralHandler::new(), queues.general, shutdown_rx).spawn();

        let gone = send(&router, &["PING"]).await;
        drop(gone);
        let alive = send(&router, &["PING"]).await;

        assert_eq!(alive.wait().await, Some(Bytes::from_static(b"+PONG\r\n")));
    }

    #[tokio::test]
    async fn test_immediate_stop_abandons_queue() {
        let (router, queues) = Router::new(Arc::new(CommandTable::default()), 8);
        let (shutdown_tx, shutdown_rx) = watch::channel(None);

        // Queue work before the worker exists so it is still queued at stop time
        let first = send(&router, &["SET", "a", "1"]).await;
        let second = send(&router, &["SET", "b", "2"]).await;
        shutdown_tx.send(Some(StopMode::Immediate)).unwrap();

        let worker =
            ClassWorker::new(StoreHandler::new(MemoryStore::new()), queues.store, shutdown_rx);
        worker.run().await;

        assert_eq!(first.wait().await, None);
        assert_eq!(second.wait().await, None);
    }

    #[tokio::test]
    async fn test_drain_stop_answers_queue() {
        let (router, queues) = Router::new(Arc::new(CommandTable::default()), 8);
        let (shutdown_tx, shutdown_rx) = watch::channel(None);

        let first = send(&router, &["SET", "a", "1"]).await;
        let second = send(&router, &["GET", "a"]).await;
        shutdown_tx.send(Some(StopMode::Drain)).unwrap();

        let worker =
            ClassWorker::new(StoreHandler::new(MemoryStore::new()), queues.store, shutdown_rx);
        worker.run().await;

        assert_eq!(first.wait().await, Some(Bytes::from_static(b"+OK\r\n")));
        assert_eq!(second.wait().await, Some(Bytes::from_static(b"$1\r\n1\r\n")));

        // Closed to new work
        let (origin, _pending) = reply_slot();
        assert!(router.route(frame(&["GET", "a"]), origin).await.is_err());
    }
}
