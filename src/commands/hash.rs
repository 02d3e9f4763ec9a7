//! Hash commands (HSET, HGET, HGETALL)

use super::{extract_bulk_string, wrong_arity, Command};
use crate::protocol::RespValue;
use crate::store::MemoryStore;

/// HSET command - Set field in the hash stored at key to value
///
/// Syntax: HSET key field value
pub struct HSetCommand;

impl Command for HSetCommand {
    fn execute(&self, store: &MemoryStore, args: &[RespValue]) -> RespValue {
        if args.len() != 3 {
            return wrong_arity(self.name());
        }

        let mut parts = Vec::with_capacity(3);
        for arg in args {
            match extract_bulk_string(arg) {
                Ok(b) => parts.push(b),
                Err(e) => return RespValue::error(format!("ERR {}", e)),
            }
        }

        let [key, field, value]: [_; 3] = match parts.try_into() {
            Ok(parts) => parts,
            Err(_) => return wrong_arity(self.name()),
        };

        store.hset(key, field, value);

        RespValue::simple_string("OK")
    }

    fn name(&self) -> &'static str {
        "HSET"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// HGET command - Get the value of a hash field
///
/// Syntax: HGET key field
pub struct HGetCommand;

impl Command for HGetCommand {
    fn execute(&self, store: &MemoryStore, args: &[RespValue]) -> RespValue {
        if args.len() != 2 {
            return wrong_arity(self.name());
        }

        let key = match extract_bulk_string(&args[0]) {
            Ok(k) => k,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        let field = match extract_bulk_string(&args[1]) {
            Ok(f) => f,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        match store.hget(&key, &field) {
            Some(v) => RespValue::bulk_string(v),
            None => RespValue::null(),
        }
    }

    fn name(&self) -> &'static str {
        "HGET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// HGETALL command - Get all fields and values in a hash
///
/// Syntax: HGETALL key
///
/// Replies with a flat array of field/value pairs, or null when the hash does
/// not exist.
pub struct HGetAllCommand;

impl Command for HGetAllCommand {
    fn execute(&self, store: &MemoryStore, args: &[RespValue]) -> RespValue {
        if args.len() != 1 {
            return wrong_arity(self.name());
        }

        let key = match extract_bulk_string(&args[0]) {
            Ok(k) => k,
            Err(e) => return RespValue::error(format!("ERR {}", e)),
        };

        match store.hgetall(&key) {
            Some(pairs) => {
                let mut result = Vec::with_capacity(pairs.len() * 2);
                for (field, value) in pairs {
                    result.push(RespValue::bulk_string(field));
                    result.push(RespValue::bulk_string(value));
                }
                RespValue::array(result)
            }
            None => RespValue::null(),
        }
    }

    fn name(&self) -> &'static str {
        "HGETALL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}
