//! Admin commands (PING)

use super::{extract_bulk_string, wrong_arity, Command};
use crate::protocol::RespValue;
use crate::store::MemoryStore;

/// PING command - Test the connection
///
/// Syntax: PING [message]
pub struct PingCommand;

impl Command for PingCommand {
    fn execute(&self, _store: &MemoryStore, args: &[RespValue]) -> RespValue {
        match args {
            [] => RespValue::simple_string("PONG"),
            [message] => match extract_bulk_string(message) {
                Ok(m) => RespValue::bulk_string(m),
                Err(e) => RespValue::error(format!("ERR {}", e)),
            },
            _ => wrong_arity(self.name()),
        }
    }

    fn name(&self) -> &'static str {
        "PING"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
