//! Command Router
//!
//! Classifies each request by name and forwards it to the bounded queue of
//! its class.
//!
//! ```text
//!                         ┌──> Store queue   (bounded) ──> Store worker
//!   frame ──> Router ─────┤
//!              │          └──> General queue (bounded) ──> General worker
//!              └──> unknown name: "-ERR unknown command" straight to the reply slot
//! ```
//!
//! The enqueue in [`Router::route`] waits while the destination queue is full.
//! That wait is the server's only backpressure: every connection sending
//! commands of a class stalls in its read loop until that class's worker
//! catches up.

use crate::commands::command::{Command, CommandClass, CommandFormatError, CommandTable};
use crate::commands::handler::CommandError;
use crate::connection::reply::ReplyHandle;
use crate::protocol::RespValue;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// Errors returned by [`Router::route`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The frame is not a command. Fatal to the connection.
    #[error("malformed request: {0}")]
    Malformed(#[from] CommandFormatError),

    /// No class for this name. The error reply has already been sent.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The class worker is gone.
    #[error("server is stopping")]
    Stopped,
}

/// Receiving ends of the class queues, one per [`CommandClass`].
#[derive(Debug)]
pub struct ClassQueues {
    pub store: mpsc::Receiver<Command>,
    pub general: mpsc::Receiver<Command>,
}

/// Cloneable front door to the class queues. Each connection holds a clone.
#[derive(Debug, Clone)]
pub struct Router {
    table: Arc<CommandTable>,
    store: mpsc::Sender<Command>,
    general: mpsc::Sender<Command>,
}

impl Router {
    /// Creates the router and the queues it feeds, each holding up to
    /// `capacity` commands.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(table: Arc<CommandTable>, capacity: usize) -> (Self, ClassQueues) {
        let (store_tx, store_rx) = mpsc::channel(capacity);
        let (general_tx, general_rx) = mpsc::channel(capacity);

        let router = Self {
            table,
            store: store_tx,
            general: general_tx,
        };
        let queues = ClassQueues {
            store: store_rx,
            general: general_rx,
        };

        (router, queues)
    }

    /// The class this command would be routed to.
    pub fn classify(&self, command: &Command) -> Option<CommandClass> {
        self.table.class_of(&command.name)
    }

    /// Turns a decoded frame into a command and queues it for its class.
    ///
    /// Unknown names are answered here with `-ERR unknown command` so the
    /// connection stays usable. Malformed frames drop `origin` unanswered.
    pub async fn route(
        &self,
        frame: RespValue,
        origin: ReplyHandle,
    ) -> Result<CommandClass, RouteError> {
        let command = Command::from_frame(frame, origin)?;

        let Some(class) = self.classify(&command) else {
            let Command { name, origin, .. } = command;
            let reply = CommandError::UnknownCommand(name.clone()).to_resp();
            if origin.send(&reply).is_err() {
                trace!(command = %name, "Connection gone before unknown-command reply");
            }
            return Err(RouteError::UnknownCommand(name));
        };

        self.queue(class)
            .send(command)
            .await
            .map_err(|_| RouteError::Stopped)?;

        Ok(class)
    }

    fn queue(&self, class: CommandClass) -> &mpsc::Sender<Command> {
        match class {
            CommandClass::Store => &self.store,
            CommandClass::General => &self.general,
        }
    }
}
