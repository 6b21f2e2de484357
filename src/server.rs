//! Server Lifecycle
//!
//! [`Server::start`] binds the listener, spawns one [`ClassWorker`] per
//! [`CommandClass`](crate::commands::CommandClass), and spawns the accept loop.
//! It returns a [`ServerHandle`] that reports the bound address and stops
//! everything again.
//!
//! ```text
//!   start ──> bind ──> spawn Store worker ──> spawn General worker ──> spawn accept loop
//!
//!   stop(Immediate) ──> signal ──> accept loop exits, listener closes
//!                              └─> workers exit, queued commands are abandoned
//!
//!   stop(Drain)     ──> signal ──> accept loop exits, listener closes
//!                              └─> workers close their queues, answer what is
//!                                  queued, then exit; stop waits for them
//! ```
//!
//! Neither mode waits for connection tasks. A connection notices the stop the
//! next time it routes a request, or when its client hangs up.

use crate::commands::{ClassWorker, CommandTable, GeneralHandler, Router, StoreHandler};
use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionSettings, ConnectionStats};
use crate::storage::{MemoryStore, Store};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How a running server should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Stop accepting and abandon queued commands
    Immediate,
    /// Stop accepting, but answer every command already queued
    Drain,
}

/// The receiving side of the stop signal. `None` means keep running.
pub type StopSignal = watch::Receiver<Option<StopMode>>;

/// Errors starting a server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read the bound address: {0}")]
    LocalAddr(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A server that has not been started yet.
pub struct Server {
    config: ServerConfig,
    table: CommandTable,
    store: Box<dyn Store>,
}

impl Server {
    /// Creates a server with the default command table and an empty
    /// [`MemoryStore`].
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            table: CommandTable::default(),
            store: Box::new(MemoryStore::new()),
        }
    }

    /// Replaces the command table.
    pub fn with_command_table(mut self, table: CommandTable) -> Self {
        self.table = table;
        self
    }

    /// Replaces the store. The Store worker takes sole ownership of it.
    pub fn with_store(mut self, store: impl Store) -> Self {
        self.store = Box::new(store);
        self
    }

    /// Binds the listener and starts the workers and the accept loop.
    ///
    /// Bind failures (for example, address already in use) are returned
    /// here; nothing is spawned in that case.
    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let Self {
            config,
            table,
            store,
        } = self;

        config.validate()?;

        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let (router, queues) = Router::new(Arc::new(table), config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(None);

        let workers = vec![
            ClassWorker::new(
                StoreHandler::from_boxed(store),
                queues.store,
                shutdown_rx.clone(),
            )
            .spawn(),
            ClassWorker::new(GeneralHandler::new(), queues.general, shutdown_rx.clone()).spawn(),
        ];

        let stats = Arc::new(ConnectionStats::new());
        let acceptor = Acceptor {
            listener,
            router,
            stats: Arc::clone(&stats),
            settings: config.connection_settings(),
            tcp_nodelay: config.tcp_nodelay,
            shutdown: shutdown_rx,
        };
        let accept_task = tokio::spawn(acceptor.run());

        info!(addr = %local_addr, queue_capacity = config.queue_capacity, "Listening");

        Ok(ServerHandle {
            local_addr,
            shutdown: shutdown_tx,
            accept_task: Some(accept_task),
            workers,
            stats,
        })
    }
}

/// The accept loop and everything it hands to new connections.
struct Acceptor {
    listener: TcpListener,
    router: Router,
    stats: Arc<ConnectionStats>,
    settings: ConnectionSettings,
    tcp_nodelay: bool,
    shutdown: StopSignal,
}

impl Acceptor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if self.tcp_nodelay {
                            if let Err(e) = stream.set_nodelay(true) {
                                warn!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                            }
                        }

                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            self.router.clone(),
                            Arc::clone(&self.stats),
                            self.settings,
                        ));
                    }
                    Err(e) => {
                        if self.shutdown.borrow().is_some() {
                            break;
                        }
                        error!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }

        debug!("Accept loop stopped, closing listener");
    }
}

/// Controls a running server.
///
/// Dropping the handle performs an immediate stop without waiting.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<Option<StopMode>>,
    accept_task: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<ConnectionStats>,
}

impl ServerHandle {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Stops the server.
    ///
    /// Returns once the listener is closed. With [`StopMode::Drain`] it also
    /// waits until both workers have answered everything that was queued.
    pub async fn stop(mut self, mode: StopMode) {
        info!(mode = ?mode, "Stopping server");
        self.signal(mode);

        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Accept loop task failed");
            }
        }

        if mode == StopMode::Drain {
            for worker in self.workers.drain(..) {
                if let Err(e) = worker.await {
                    error!(error = %e, "Class worker task failed");
                }
            }
        }

        info!("Server stopped");
    }

    /// Publishes `mode` unless a stop is already under way.
    fn signal(&self, mode: StopMode) {
        self.shutdown.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(mode);
                true
            } else {
                false
            }
        });
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.signal(StopMode::Immediate);
    }
}
