//! RESP protocol implementation
//!
//! This module handles parsing and encoding of the Redis Serialization Protocol
//! subset used on the wire and in the AOF. It does not depend on the store,
//! the commands or the server.

mod types;
mod resp;

pub use types::{RespValue, RespError};
pub use resp::{RespParser, RespReader, RespEncoder, MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_DEPTH, MAX_LINE_LEN};
