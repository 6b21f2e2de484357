//! Incremental RESP Decoder
//!
//! This module turns buffered socket bytes into one [`RespValue`] at a time.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((value, consumed)))` - Successfully parsed a value, `consumed` bytes were used
//! - `Ok(None)` - Need more data, the message is incomplete
//! - `Err(ParseError)` - Invalid protocol data
//!
//! This design allows the caller to:
//! 1. Append incoming network data to a buffer
//! 2. Call `parse()` to attempt parsing
//! 3. If successful, advance the buffer by `consumed` bytes
//! 4. If incomplete, wait for more data
//! 5. If error, disconnect the client
//!
//! The parser never looks past the bytes it was handed, so "incomplete" is the
//! only way it waits. Distinguishing a clean end of stream (nothing buffered)
//! from a truncated message is left to the connection, which owns the buffer.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
///
/// Every variant is fatal to the connection that produced the bytes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unhandled element type: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a length or integer line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Map length is negative
    #[error("invalid map length: {0}")]
    InvalidMapLength(i64),

    /// Bulk string payload is not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingTerminator,

    /// Null carried a payload
    #[error("null must not carry a payload")]
    NullWithPayload,

    /// An element of an array or map failed to decode
    #[error("failed to decode element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<ParseError>,
    },

    /// Aggregates nested beyond [`MAX_NESTING_DEPTH`]
    #[error("maximum nesting depth exceeded: {0}")]
    NestingTooDeep(usize),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// An incremental RESP parser.
///
/// # Example
///
/// ```
/// use respkv::protocol::{RespParser, RespValue};
///
/// let mut parser = RespParser::new();
/// let (value, consumed) = parser.parse(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
/// assert_eq!(consumed, 14);
/// assert_eq!(value, RespValue::array(vec![RespValue::bulk_string("PING")]));
/// ```
#[derive(Debug, Clone)]
pub struct RespParser {
    max_depth: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Attempts to parse one RESP value from the front of the buffer.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.parse_value(buf, 0)
    }

    fn parse_value(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if depth > self.max_depth {
            return Err(ParseError::NestingTooDeep(self.max_depth));
        }

        match buf[0] {
            prefix::ARRAY => self.parse_array(buf, depth),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::INTEGER => self.parse_integer(buf),
            prefix::MAP => self.parse_map(buf, depth),
            prefix::SIMPLE_STRING => Ok(parse_line(buf)
                .map(|(line, consumed)| (RespValue::SimpleString(line), consumed))),
            prefix::ERROR => {
                Ok(parse_line(buf).map(|(line, consumed)| (RespValue::Error(line), consumed)))
            }
            prefix::NULL => self.parse_null(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses an integer: `:<integer>\r\n`
    fn parse_integer(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        match parse_decimal(buf)? {
            Some((n, consumed)) => Ok(Some((RespValue::Integer(n), consumed))),
            None => Ok(None),
        }
    }

    /// Parses a null: `_\r\n`
    fn parse_null(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        match find_crlf(&buf[1..]) {
            Some(0) => Ok(Some((RespValue::Null, 3))),
            Some(_) => Err(ParseError::NullWithPayload),
            None => Ok(None),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let (length, header_len) = match parse_decimal(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;

        if length > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        // data + CRLF
        let total_needed = header_len + length + 2;
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[header_len + length..total_needed] != CRLF {
            return Err(ParseError::MissingTerminator);
        }

        let data = Bytes::copy_from_slice(&buf[header_len..header_len + length]);

        Ok(Some((RespValue::BulkString(data), total_needed)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        let (count, header_len) = match parse_decimal(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        match self.parse_elements(buf, header_len, count as usize, depth)? {
            Some((elements, consumed)) => Ok(Some((RespValue::Array(elements), consumed))),
            None => Ok(None),
        }
    }

    /// Parses a map: `%<pairs>\r\n<key><value>...`
    fn parse_map(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        let (count, header_len) = match parse_decimal(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count < 0 {
            return Err(ParseError::InvalidMapLength(count));
        }

        let flat_len = (count as usize).saturating_mul(2);
        let (elements, consumed) = match self.parse_elements(buf, header_len, flat_len, depth)? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };

        let mut pairs = Vec::with_capacity(elements.len() / 2);
        let mut elements = elements.into_iter();
        while let (Some(key), Some(value)) = (elements.next(), elements.next()) {
            pairs.push((key, value));
        }

        Ok(Some((RespValue::Map(pairs), consumed)))
    }

    /// Decodes `count` consecutive values starting at `offset`.
    ///
    /// A failure on element `i` aborts the whole aggregate and reports `i`.
    fn parse_elements(
        &self,
        buf: &[u8],
        offset: usize,
        count: usize,
        depth: usize,
    ) -> ParseResult<Option<(Vec<RespValue>, usize)>> {
        // Don't trust the declared count for the allocation
        let mut elements = Vec::with_capacity(count.min(1024));
        let mut consumed = offset;

        for index in 0..count {
            if consumed >= buf.len() {
                return Ok(None);
            }

            let parsed = self
                .parse_value(&buf[consumed..], depth + 1)
                .map_err(|e| ParseError::Element {
                    index,
                    source: Box::new(e),
                })?;

            match parsed {
                Some((value, element_consumed)) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((elements, consumed)))
    }
}

/// Splits `<prefix><line>\r\n` into the line payload and the bytes consumed.
fn parse_line(buf: &[u8]) -> Option<(Bytes, usize)> {
    find_crlf(&buf[1..]).map(|pos| {
        // +1 for prefix, +2 for CRLF
        (Bytes::copy_from_slice(&buf[1..1 + pos]), 1 + pos + 2)
    })
}

/// Parses `<prefix><decimal>\r\n`, returning the number and bytes consumed.
fn parse_decimal(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let end = match find_crlf(&buf[1..]) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let text =
        std::str::from_utf8(&buf[1..1 + end]).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let n = text
        .parse::<i64>()
        .map_err(|e| ParseError::InvalidInteger(format!("{:?}: {}", text, e)))?;

    Ok(Some((n, 1 + end + 2)))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Helper function to parse a single RESP message from bytes.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
