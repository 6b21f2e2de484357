//! # respkv - A RESP Server with Per-Class Command Workers
//!
//! respkv speaks a subset of the Redis serialization protocol over TCP. Each
//! connection gets its own task; commands are routed by name to a small set of
//! command classes, and every class is served by exactly one worker task.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               respkv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│   Router    │                  │
//! │  │ (Listener)  │    │  Handler    │    │ name->class │                  │
//! │  └─────────────┘    └──────▲──────┘    └──┬───────┬──┘                  │
//! │                            │              │       │  bounded queues     │
//! │                            │              ▼       ▼                     │
//! │  ┌─────────────┐           │      ┌──────────┐ ┌──────────┐             │
//! │  │   RESP      │           │      │  Store   │ │ General  │             │
//! │  │   Parser    │           │      │  worker  │ │  worker  │             │
//! │  └─────────────┘           │      └────┬─────┘ └────┬─────┘             │
//! │                            │           │ owns       │                   │
//! │                            │           ▼            │                   │
//! │                            │      ┌──────────┐      │                   │
//! │                            │      │  Store   │      │                   │
//! │                            │      └──────────┘      │                   │
//! │                            └────── replies ─────────┘                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use respkv::{Server, ServerConfig, StopMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::new(ServerConfig::default()).start().await?;
//!     println!("listening on {}", server.local_addr());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop(StopMode::Immediate).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING` → `+PONG`
//! - `HELLO` → server identity map
//! - `SET key value` → `+OK`
//! - `GET key` → bulk string, or null if absent
//!
//! Anything else is answered with `-ERR unknown command` and the connection
//! stays open. Malformed requests close the connection without a reply.
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP values, decoder and encoder
//! - [`commands`]: Command model, router, class handlers and workers
//! - [`connection`]: Client connection management and ordered replies
//! - [`storage`]: The store contract and its in-memory implementation
//! - [`server`]: Listener, lifecycle and shutdown
//! - [`config`]: Server configuration
//!
//! ## Design Highlights
//!
//! ### Single-Owner Store
//!
//! The store is moved into the Store worker and never shared. All `GET` and
//! `SET` commands from all connections are applied in one global order, with
//! no lock anywhere.
//!
//! ### Backpressure
//!
//! Class queues are bounded. A connection whose request targets a full queue
//! stops reading until the worker catches up.
//!
//! ### Zero-Copy Parsing
//!
//! The RESP parser uses `bytes::Bytes` to avoid copying data when possible.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandClass, CommandTable};
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, RespParser, RespValue};
pub use server::{Server, ServerError, ServerHandle, StopMode};
pub use storage::{MemoryStore, Store, StoreError};

/// The default port respkv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host respkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
