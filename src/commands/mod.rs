//! Command Processing Module
//!
//! This module turns decoded frames into commands, routes them to the class
//! that owns them, and runs one worker per class.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Router      │  command.rs / router.rs
//! │  name -> class  │
//! └───┬─────────┬───┘
//!     │         │  bounded queues
//!     ▼         ▼
//! ┌───────┐ ┌─────────┐
//! │ Store │ │ General │  worker.rs, one task each
//! │worker │ │ worker  │
//! └───┬───┘ └────┬────┘
//!     │          │
//!     ▼          ▼
//!  StoreHandler  GeneralHandler  (handler.rs)
//! ```
//!
//! ## Supported Commands
//!
//! - Store class: `GET`, `SET`
//! - General class: `PING`, `HELLO`
//!
//! Names are matched case-insensitively.

pub mod command;
pub mod handler;
pub mod router;
pub mod worker;

pub use command::{Command, CommandClass, CommandFormatError, CommandTable};
pub use handler::{ClassHandler, CommandError, GeneralHandler, StoreHandler};
pub use router::{ClassQueues, RouteError, Router};
pub use worker::ClassWorker;
