//! RESP Data Types and Encoding
//!
//! This module defines the closed set of values that can travel over the wire
//! and the encoder that turns them into bytes.
//!
//! ## Protocol Format
//!
//! Each RESP type starts with a type prefix byte:
//! - `*` Array
//! - `$` Bulk String
//! - `:` Integer
//! - `%` Map
//! - `+` Simple String
//! - `-` Simple Error
//! - `_` Null
//!
//! All types are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Map: `%1\r\n$6\r\nserver\r\n$5\r\nredis\r\n`
//! Null: `_\r\n`

use bytes::Bytes;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const ARRAY: u8 = b'*';
    pub const BULK_STRING: u8 = b'$';
    pub const INTEGER: u8 = b':';
    pub const MAP: u8 = b'%';
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const NULL: u8 = b'_';
}

/// Represents a value in the RESP protocol.
///
/// Values are immutable once built. Simple strings and errors are written
/// verbatim, so their payload must never contain a CRLF pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Arrays can contain any RESP type, including nested arrays.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),

    /// Binary-safe strings.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Short status replies.
    /// Format: `+<string>\r\n`
    SimpleString(Bytes),

    /// Errors are similar to simple strings but indicate an error condition.
    /// Format: `-<error message>\r\n`
    Error(Bytes),

    /// 64-bit signed integers.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Ordered key/value pairs, flattened on the wire.
    /// Format: `%<pairs>\r\n<key1><value1><key2><value2>...`
    Map(Vec<(RespValue, RespValue)>),

    /// Absent value.
    /// Format: `_\r\n`
    Null,
}

impl RespValue {
    /// Creates a new simple string response.
    ///
    /// # Example
    /// ```
    /// use respkv::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<Bytes>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error response.
    ///
    /// # Example
    /// ```
    /// use respkv::protocol::types::RespValue;
    /// let err = RespValue::error("ERR unknown command");
    /// assert_eq!(err.serialize(), b"-ERR unknown command\r\n");
    /// ```
    pub fn error(s: impl Into<Bytes>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new integer response.
    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new bulk string response.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a null response.
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Creates an array response.
    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Creates a map response from ordered pairs.
    pub fn map(pairs: Vec<(RespValue, RespValue)>) -> Self {
        RespValue::Map(pairs)
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::simple_string("OK")
    }

    /// Common response for PING
    pub fn pong() -> Self {
        RespValue::simple_string("PONG")
    }

    /// Encodes the value to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Encodes the value into an existing buffer.
    ///
    /// This is more efficient than `serialize()` when you want to reuse a buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::Array(values) => {
                write_header(buf, prefix::ARRAY, values.len());
                for value in values {
                    value.serialize_into(buf);
                }
            }
            RespValue::BulkString(data) => {
                write_header(buf, prefix::BULK_STRING, data.len());
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Map(pairs) => {
                write_header(buf, prefix::MAP, pairs.len());
                for (key, value) in pairs {
                    key.serialize_into(buf);
                    value.serialize_into(buf);
                }
            }
            RespValue::Null => {
                buf.push(prefix::NULL);
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Returns the payload of a bulk or simple string.
    ///
    /// These are the "string-like" values accepted as command names and
    /// command arguments.
    pub fn as_string_bytes(&self) -> Option<&Bytes> {
        match self {
            RespValue::BulkString(b) | RespValue::SimpleString(b) => Some(b),
            _ => None,
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

/// Writes `<prefix><len>\r\n`.
#[inline]
fn write_header(buf: &mut Vec<u8>, tag: u8, len: usize) {
    buf.push(tag);
    buf.extend_from_slice(len.to_string().as_bytes());
    buf.extend_from_slice(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = RespValue::simple_string("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR unknown command");
        assert_eq!(value.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        let value = RespValue::integer(1000);
        assert_eq!(value.serialize(), b":1000\r\n");

        let negative = RespValue::integer(-42);
        assert_eq!(negative.serialize(), b":-42\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string("hello");
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");

        let empty = RespValue::bulk_string("");
        assert_eq!(empty.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"_\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::bulk_string("GET"),
            RespValue::bulk_string("name"),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");

        assert_eq!(RespValue::array(vec![]).serialize(), b"*0\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::integer(1),
            RespValue::array(vec![RespValue::integer(2), RespValue::integer(3)]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn test_map_serialize_flattens_pairs() {
        let value = RespValue::map(vec![
            (RespValue::bulk_string("proto"), RespValue::integer(3)),
            (RespValue::bulk_string("modules"), RespValue::array(vec![])),
        ]);
        assert_eq!(
            value.serialize(),
            b"%2\r\n$5\r\nproto\r\n:3\r\n$7\r\nmodules\r\n*0\r\n"
        );
    }

    #[test]
    fn test_serialize_into_appends() {
        let mut buf = b"+OK\r\n".to_vec();
        RespValue::pong().serialize_into(&mut buf);
        assert_eq!(buf, b"+OK\r\n+PONG\r\n");
    }

    #[test]
    fn test_string_like_accessors() {
        assert_eq!(
            RespValue::simple_string("a").as_string_bytes(),
            Some(&Bytes::from_static(b"a"))
        );
        assert_eq!(
            RespValue::bulk_string(&b"\xff"[..]).as_string_bytes(),
            Some(&Bytes::from_static(b"\xff"))
        );
        assert!(RespValue::integer(1).as_string_bytes().is_none());
        assert!(RespValue::error("c").as_string_bytes().is_none());
        assert!(RespValue::null().as_string_bytes().is_none());
    }
}
