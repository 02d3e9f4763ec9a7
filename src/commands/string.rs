//! String commands (SET, GET)

use super::{extract_bulk_string, wrong_arity, Command};
use crate::protocol::RespValue;
use crate::store::MemoryStore;

/// SET command - Set a key to a value
///
/// Syntax: SET key value
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, store: &MemoryStore, args: &[RespValue]) -> RespValue {
        if args.len() != 2 {
            return wrong_arity(self.name());
        }

        let key = match extract_bulk_string(&args[0]) {
            Ok(k) => k,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        let value = match extract_bulk_string(&args[1]) {
            Ok(v) => v,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        store.set(key, value);

        RespValue::simple_string("OK")
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, store: &MemoryStore, args: &[RespValue]) -> RespValue {
        if args.len() != 1 {
            return wrong_arity(self.name());
        }

        let key = match extract_bulk_string(&args[0]) {
            Ok(k) => k,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        match store.get(&key) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        }
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
