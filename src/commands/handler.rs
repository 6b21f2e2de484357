//! Class Handlers
//!
//! One handler per [`CommandClass`], each dispatching on the command name.
//!
//! ## Supported Commands
//!
//! | Command | Class   | Reply                                       |
//! |---------|---------|---------------------------------------------|
//! | `PING`  | General | `+PONG`                                     |
//! | `HELLO` | General | map of seven fixed server-identity pairs    |
//! | `GET`   | Store   | bulk string, or null when the key is absent |
//! | `SET`   | Store   | `+OK`                                       |
//!
//! Handler failures (wrong argument count, non-string arguments) come back as
//! a [`CommandError`] which the worker turns into a simple error reply.

use crate::commands::command::{Command, CommandClass, CMD_GET, CMD_HELLO, CMD_PING, CMD_SET};
use crate::protocol::RespValue;
use crate::storage::{Store, StoreError};
use bytes::Bytes;
use thiserror::Error;

/// Server identity reported by `HELLO`.
pub const SERVER_NAME: &str = "redis";
pub const SERVER_VERSION: &str = "8.4.0";
pub const PROTOCOL_VERSION: i64 = 3;

/// Errors produced while executing a command.
///
/// The display text is exactly what goes on the wire after the `-` prefix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR value is not a string")]
    NotAString,

    #[error("ERR unknown command")]
    UnknownCommand(String),

    #[error("ERR {0}")]
    Store(#[from] StoreError),
}

impl CommandError {
    /// The simple error reply for this failure.
    pub fn to_resp(&self) -> RespValue {
        RespValue::error(self.to_string())
    }
}

/// Executes the commands of one class.
pub trait ClassHandler: Send + 'static {
    fn class(&self) -> CommandClass;

    fn handle(&mut self, command: &Command) -> Result<RespValue, CommandError>;
}

/// Commands that never touch the store.
#[derive(Debug, Default, Clone)]
pub struct GeneralHandler;

impl GeneralHandler {
    pub fn new() -> Self {
        Self
    }

    fn cmd_hello(&self) -> RespValue {
        RespValue::map(vec![
            (
                RespValue::bulk_string("server"),
                RespValue::bulk_string(SERVER_NAME),
            ),
            (
                RespValue::bulk_string("version"),
                RespValue::bulk_string(SERVER_VERSION),
            ),
            (
                RespValue::bulk_string("proto"),
                RespValue::integer(PROTOCOL_VERSION),
            ),
            (RespValue::bulk_string("id"), RespValue::integer(1)),
            (
                RespValue::bulk_string("mode"),
                RespValue::bulk_string("standalone"),
            ),
            (
                RespValue::bulk_string("role"),
                RespValue::bulk_string("master"),
            ),
            (
                RespValue::bulk_string("modules"),
                RespValue::array(vec![]),
            ),
        ])
    }
}

impl ClassHandler for GeneralHandler {
    fn class(&self) -> CommandClass {
        CommandClass::General
    }

    fn handle(&mut self, command: &Command) -> Result<RespValue, CommandError> {
        // Arguments to PING and HELLO are ignored.
        match command.normalized_name().as_str() {
            CMD_PING => Ok(RespValue::pong()),
            CMD_HELLO => Ok(self.cmd_hello()),
            _ => Err(CommandError::UnknownCommand(command.name.clone())),
        }
    }
}

/// Commands that read or write the store.
///
/// Owns the store outright; see [`crate::storage`] for why that matters.
pub struct StoreHandler {
    store: Box<dyn Store>,
}

impl StoreHandler {
    pub fn new(store: impl Store) -> Self {
        Self::from_boxed(Box::new(store))
    }

    pub fn from_boxed(store: Box<dyn Store>) -> Self {
        Self { store }
    }

    fn cmd_get(&self, args: &[RespValue]) -> Result<RespValue, CommandError> {
        let [key] = args else {
            return Err(CommandError::WrongArity(CMD_GET.to_string()));
        };
        let key = string_arg(key)?;

        match self.store.get(key)? {
            Some(value) => Ok(RespValue::BulkString(value)),
            None => Ok(RespValue::Null),
        }
    }

    fn cmd_set(&mut self, args: &[RespValue]) -> Result<RespValue, CommandError> {
        let [key, value] = args else {
            return Err(CommandError::WrongArity(CMD_SET.to_string()));
        };
        let key = string_arg(key)?.clone();
        let value = string_arg(value)?.clone();

        self.store.set(key, value)?;
        Ok(RespValue::ok())
    }
}

impl ClassHandler for StoreHandler {
    fn class(&self) -> CommandClass {
        CommandClass::Store
    }

    fn handle(&mut self, command: &Command) -> Result<RespValue, CommandError> {
        match command.normalized_name().as_str() {
            CMD_GET => self.cmd_get(&command.args),
            CMD_SET => self.cmd_set(&command.args),
            _ => Err(CommandError::UnknownCommand(command.name.clone())),
        }
    }
}

/// Extracts the payload of a string-like argument.
fn string_arg(value: &RespValue) -> Result<&Bytes, CommandError> {
    value.as_string_bytes().ok_or(CommandError::NotAString)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::reply::reply_slot;
    use crate::storage::MemoryStore;

    fn make_command(args: &[&'static str]) -> Command {
        let (origin, _pending) = reply_slot();
        let frame = RespValue::array(args.iter().map(|a| RespValue::bulk_string(*a)).collect());
        Command::from_frame(frame, origin).unwrap()
    }

    fn command_with_args(name: &'static str, args: Vec<RespValue>) -> Command {
        let mut command = make_command(&[name]);
        command.args = args;
        command
    }

    #[test]
    fn test_ping() {
        let mut handler = GeneralHandler::new();
        assert_eq!(
            handler.handle(&make_command(&["PING"])).unwrap(),
            RespValue::pong()
        );
        // Extra arguments are ignored
        assert_eq!(
            handler.handle(&make_command(&["ping", "hi"])).unwrap(),
            RespValue::pong()
        );
    }

    #[test]
    fn test_hello() {
        let mut handler = GeneralHandler::new();
        let reply = handler.handle(&make_command(&["hello", "3"])).unwrap();

        let RespValue::Map(pairs) = &reply else {
            panic!("expected a map, got {:?}", reply);
        };
        let keys: Vec<_> = pairs
            .iter()
            .filter_map(|(k, _)| k.as_string_bytes())
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect();
        assert_eq!(
            keys,
            vec!["server", "version", "proto", "id", "mode", "role", "modules"]
        );
        assert_eq!(pairs[0].1, RespValue::bulk_string("redis"));
        assert_eq!(pairs[1].1, RespValue::bulk_string("8.4.0"));
        assert_eq!(pairs[2].1, RespValue::integer(3));
        assert_eq!(pairs[3].1, RespValue::integer(1));
        assert_eq!(pairs[6].1, RespValue::array(vec![]));
    }

    #[test]
    fn test_general_rejects_store_commands() {
        let mut handler = GeneralHandler::new();
        let err = handler.handle(&make_command(&["GET", "k"])).unwrap_err();
        assert_eq!(err.to_resp().serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_set_get() {
        let mut handler = StoreHandler::new(MemoryStore::new());
        assert_eq!(
            handler.handle(&make_command(&["SET", "name", "alice"])).unwrap(),
            RespValue::ok()
        );
        assert_eq!(
            handler.handle(&make_command(&["GET", "name"])).unwrap(),
            RespValue::bulk_string("alice")
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let mut handler = StoreHandler::new(MemoryStore::new());
        assert_eq!(
            handler.handle(&make_command(&["get", "missing"])).unwrap(),
            RespValue::Null
        );
    }

    #[test]
    fn test_simple_string_arguments() {
        let mut handler = StoreHandler::new(MemoryStore::new());
        let set = command_with_args(
            "set",
            vec![RespValue::simple_string("k"), RespValue::simple_string("v")],
        );
        assert_eq!(handler.handle(&set).unwrap(), RespValue::ok());
        assert_eq!(
            handler.handle(&make_command(&["get", "k"])).unwrap(),
            RespValue::bulk_string("v")
        );
    }

    #[test]
    fn test_wrong_arity() {
        let mut handler = StoreHandler::new(MemoryStore::new());
        assert_eq!(
            handler.handle(&make_command(&["GET"])).unwrap_err(),
            CommandError::WrongArity("get".to_string())
        );
        let err = handler.handle(&make_command(&["SET", "k"])).unwrap_err();
        assert_eq!(
            err.to_resp().serialize(),
            b"-ERR wrong number of arguments for 'set' command\r\n"
        );
    }

    #[test]
    fn test_non_string_arguments() {
        let mut handler = StoreHandler::new(MemoryStore::new());
        let get = command_with_args("get", vec![RespValue::integer(7)]);
        assert_eq!(handler.handle(&get).unwrap_err(), CommandError::NotAString);

        let set = command_with_args(
            "set",
            vec![RespValue::bulk_string("k"), RespValue::array(vec![])],
        );
        assert_eq!(handler.handle(&set).unwrap_err(), CommandError::NotAString);
        // Nothing was written
        assert_eq!(
            handler.handle(&make_command(&["get", "k"])).unwrap(),
            RespValue::Null
        );
    }

    #[test]
    fn test_store_errors_become_replies() {
        struct FailingStore;

        impl Store for FailingStore {
            fn set(&mut self, _key: Bytes, _value: Bytes) -> Result<(), StoreError> {
                Err(StoreError::Backend("disk on fire".to_string()))
            }

            fn get(&self, _key: &[u8]) -> Result<Option<Bytes>, StoreError> {
                Err(StoreError::Backend("disk on fire".to_string()))
            }
        }

        let mut handler = StoreHandler::new(FailingStore);
        let err = handler
            .handle(&make_command(&["set", "k", "v"]))
            .unwrap_err();
        assert_eq!(
            err.to_resp(),
            RespValue::error("ERR store backend failure: disk on fire")
        );
    }
}
