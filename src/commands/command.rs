//! Command Model
//!
//! A decoded top-level array reinterpreted as a command name plus arguments,
//! and the table that assigns each command name to a [`CommandClass`].

use crate::connection::reply::ReplyHandle;
use crate::protocol::RespValue;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub const CMD_GET: &str = "get";
pub const CMD_SET: &str = "set";
pub const CMD_HELLO: &str = "hello";
pub const CMD_PING: &str = "ping";

/// The routing bucket a command belongs to. Each class has exactly one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    /// Commands that read or write the store
    Store,
    /// Commands that never touch the store
    General,
}

impl CommandClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandClass::Store => "store",
            CommandClass::General => "general",
        }
    }
}

impl fmt::Display for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps command names to their class.
///
/// Lookups are case-insensitive: names are stored lower-cased and the
/// requested name is lower-cased before the lookup. The table is handed to the
/// server at construction, so independent servers can run different command
/// sets side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    classes: HashMap<String, CommandClass>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
            .with(CMD_GET, CommandClass::Store)
            .with(CMD_SET, CommandClass::Store)
            .with(CMD_HELLO, CommandClass::General)
            .with(CMD_PING, CommandClass::General)
    }
}

impl CommandTable {
    /// Creates an empty table. Every command is unknown until inserted.
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, name: &str, class: CommandClass) -> Option<CommandClass> {
        self.classes.insert(name.to_ascii_lowercase(), class)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: &str, class: CommandClass) -> Self {
        self.insert(name, class);
        self
    }

    pub fn class_of(&self, name: &str) -> Option<CommandClass> {
        self.classes.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Reasons a decoded frame cannot be read as a command.
///
/// These are protocol errors: the connection that sent the frame is closed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandFormatError {
    #[error("request must be an array")]
    NotAnArray,

    #[error("empty command")]
    EmptyArray,

    #[error("command name must be a string")]
    InvalidName,
}

/// A request waiting to be answered.
#[derive(Debug)]
pub struct Command {
    /// Command name exactly as received
    pub name: String,
    /// Everything after the name, in order
    pub args: Vec<RespValue>,
    /// Where the reply goes
    pub origin: ReplyHandle,
}

impl Command {
    /// Reinterprets a decoded frame as a command.
    ///
    /// The frame must be a non-empty array whose first element is a bulk or
    /// simple string. Invalid UTF-8 in the name is replaced lossily.
    pub fn from_frame(frame: RespValue, origin: ReplyHandle) -> Result<Self, CommandFormatError> {
        let mut elements = frame.into_array().ok_or(CommandFormatError::NotAnArray)?;

        if elements.is_empty() {
            return Err(CommandFormatError::EmptyArray);
        }

        // Non-UTF-8 names never match the table
        let name = elements[0]
            .as_string_bytes()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .ok_or(CommandFormatError::InvalidName)?;

        let args = elements.split_off(1);

        Ok(Self { name, args, origin })
    }

    /// The lower-cased name used for table and handler lookups.
    pub fn normalized_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::reply::reply_slot;

    fn frame(parts: &[&'static str]) -> RespValue {
        RespValue::array(parts.iter().map(|p| RespValue::bulk_string(*p)).collect())
    }

    #[test]
    fn test_default_table() {
        let table = CommandTable::default();
        assert_eq!(table.len(), 4);
        assert_eq!(table.class_of("get"), Some(CommandClass::Store));
        assert_eq!(table.class_of("set"), Some(CommandClass::Store));
        assert_eq!(table.class_of("hello"), Some(CommandClass::General));
        assert_eq!(table.class_of("ping"), Some(CommandClass::General));
        assert_eq!(table.class_of("del"), None);
    }

    #[test]
    fn test_table_lookup_ignores_case() {
        let table = CommandTable::new().with("Echo", CommandClass::General);
        assert_eq!(table.class_of("ECHO"), Some(CommandClass::General));
        assert_eq!(table.class_of("echo"), Some(CommandClass::General));
        assert_eq!(CommandTable::default().class_of("PiNg"), Some(CommandClass::General));
    }

    #[test]
    fn test_table_insert_replaces() {
        let mut table = CommandTable::default();
        assert_eq!(
            table.insert("PING", CommandClass::Store),
            Some(CommandClass::General)
        );
        assert_eq!(table.class_of("ping"), Some(CommandClass::Store));
    }

    #[test]
    fn test_from_frame() {
        let (origin, _pending) = reply_slot();
        let command = Command::from_frame(frame(&["SET", "k", "v"]), origin).unwrap();
        assert_eq!(command.name, "SET");
        assert_eq!(command.normalized_name(), "set");
        assert_eq!(
            command.args,
            vec![RespValue::bulk_string("k"), RespValue::bulk_string("v")]
        );
    }

    #[test]
    fn test_from_frame_simple_string_name() {
        let (origin, _pending) = reply_slot();
        let value = RespValue::array(vec![RespValue::simple_string("ping")]);
        let command = Command::from_frame(value, origin).unwrap();
        assert_eq!(command.name, "ping");
        assert!(command.args.is_empty());
    }

    #[test]
    fn test_from_frame_binary_name() {
        let (origin, _pending) = reply_slot();
        let value = RespValue::array(vec![
            RespValue::bulk_string(&b"\xff\xfe"[..]),
            RespValue::bulk_string("arg"),
        ]);
        let command = Command::from_frame(value, origin).unwrap();
        assert_eq!(command.name, "\u{FFFD}\u{FFFD}");
        assert_eq!(command.args.len(), 1);
        assert_eq!(CommandTable::default().class_of(&command.name), None);
    }

    #[test]
    fn test_from_frame_rejects_malformed() {
        let cases = vec![
            (RespValue::array(vec![]), CommandFormatError::EmptyArray),
            (
                RespValue::array(vec![RespValue::integer(123)]),
                CommandFormatError::InvalidName,
            ),
            (
                RespValue::array(vec![RespValue::null()]),
                CommandFormatError::InvalidName,
            ),
            (RespValue::simple_string("PING"), CommandFormatError::NotAnArray),
            (RespValue::null(), CommandFormatError::NotAnArray),
        ];

        for (value, expected) in cases {
            let (origin, _pending) = reply_slot();
            assert_eq!(Command::from_frame(value, origin).unwrap_err(), expected);
        }
    }
}
