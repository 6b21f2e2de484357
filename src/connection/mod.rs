//! Connection Handler Module
//!
//! This module manages individual client connections.
//! Each client connection is handled by its own async task, allowing
//! the server to handle thousands of concurrent clients efficiently.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Parse RESP  │───>│ Route cmd   │──────┼──> class workers
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │        │
//! │                                               │ reply slot  │        │
//! │                                               ▼             │        │
//! │                                      ┌─────────────┐        │        │
//! │                                      │ ReplyWriter │<───────┼────────┘
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Buffer Management**: Efficient BytesMut buffer for incoming data
//! - **Pipelining**: Replies come back in request order, even across classes
//! - **Statistics**: Tracks connection and request metrics

pub mod handler;
pub mod reply;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionSettings, ConnectionStats,
    StatsSnapshot,
};
pub use reply::{reply_slot, PendingReply, ReplyError, ReplyHandle, ReplyWriter};
