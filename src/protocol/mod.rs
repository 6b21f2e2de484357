//! RESP Protocol Implementation
//!
//! This module implements the subset of the Redis Serialization Protocol the
//! server speaks: arrays, bulk strings, simple strings, simple errors,
//! integers, maps, and null.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and its encoder
//! - `parser`: Incremental decoder for incoming RESP data
//!
//! ## Example
//!
//! ```
//! use respkv::protocol::{parse_message, RespValue};
//!
//! // Parsing incoming data
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! // Creating responses
//! let response = RespValue::bulk_string("alice");
//! assert_eq!(response.serialize(), b"$5\r\nalice\r\n");
//! # let _ = value;
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
