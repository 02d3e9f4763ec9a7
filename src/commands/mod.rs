//! Command execution module
//!
//! Provides a unified interface for all commands through the Command trait.
//! Each family of commands lives in its own file.

mod registry;

// Command implementations
mod string;
mod hash;
mod admin;

pub use registry::CommandRegistry;

use crate::protocol::RespValue;
use crate::store::MemoryStore;
use bytes::Bytes;

/// Command execution trait
///
/// All commands implement this trait with a single execute method.
/// The same implementation serves live clients and AOF replay.
pub trait Command: Send + Sync {
    /// Execute the command against the store
    ///
    /// `args` excludes the command name itself. Expected failures, such as a
    /// bad argument, are returned as `RespValue::Error`.
    fn execute(&self, store: &MemoryStore, args: &[RespValue]) -> RespValue;

    /// Get the command name (for debugging/logging)
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited)
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// Whether the command mutates the store and must be logged to the AOF
    fn is_write(&self) -> bool {
        false
    }
}

/// Error reply for a call with the wrong number of arguments
pub(crate) fn wrong_arity(name: &str) -> RespValue {
    RespValue::error(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_lowercase()
    ))
}

/// Helper function to extract the bytes of a bulk or simple string argument
pub(crate) fn extract_bulk_string(value: &RespValue) -> Result<Bytes, &'static str> {
    match value {
        RespValue::BulkString(bytes) => Ok(bytes.clone()),
        RespValue::SimpleString(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
        _ => Err("invalid argument type"),
    }
}
