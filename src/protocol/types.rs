//! RESP value types
//!
//! Defines the value model shared by the wire codec and the AOF.

use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// RESP value types
///
/// A value is built once, then moved to its consumer. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Simple strings: +OK\r\n
    SimpleString(String),

    /// Errors: -Error message\r\n
    Error(String),

    /// Bulk strings: $6\r\nfoobar\r\n
    BulkString(Bytes),

    /// Null bulk string: $-1\r\n
    Null,

    /// Null array: *-1\r\n
    NullArray,

    /// Arrays: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Create a simple string
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Create an error
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Create a bulk string from bytes
    pub fn bulk_string(b: impl Into<Bytes>) -> Self {
        RespValue::BulkString(b.into())
    }

    /// Create a null value (encoded as a null bulk string)
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Create an array
    pub fn array(v: Vec<RespValue>) -> Self {
        RespValue::Array(v)
    }

    /// True for both wire representations of null
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null | RespValue::NullArray)
    }

    /// Try to extract array elements
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to extract bulk string bytes
    pub fn as_bulk_string(&self) -> Option<&Bytes> {
        match self {
            RespValue::BulkString(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Raw bytes of a bulk or simple string.
    ///
    /// Clients usually send bulk strings, but inline tooling may send simple
    /// strings for command names and arguments.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::BulkString(bytes) => Some(bytes),
            RespValue::SimpleString(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "SimpleString({})", s),
            RespValue::Error(e) => write!(f, "Error({})", e),
            RespValue::BulkString(b) => write!(f, "BulkString({} bytes)", b.len()),
            RespValue::Null => write!(f, "Null"),
            RespValue::NullArray => write!(f, "NullArray"),
            RespValue::Array(arr) => write!(f, "Array({} elements)", arr.len()),
        }
    }
}

/// RESP parsing errors
///
/// Every variant carries the byte offset where the input went wrong. Offsets are
/// relative to the start of the stream once they leave [`super::RespReader`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RespError {
    /// Type tag byte is not one of `+ - $ *`
    #[error("unexpected type tag {tag:?} at byte {position}")]
    UnknownTag { position: u64, tag: char },

    /// Length or count line is not a valid decimal
    #[error("invalid {what} {line:?} at byte {position}")]
    InvalidLength {
        position: u64,
        what: &'static str,
        line: String,
    },

    /// Bulk payload is not followed by CRLF
    #[error("missing CRLF after bulk string payload at byte {position}")]
    MissingTerminator { position: u64 },

    /// Simple string or error line is not UTF-8
    #[error("invalid UTF-8 in text line at byte {position}")]
    InvalidUtf8 { position: u64 },

    /// Stream ended in the middle of a value
    #[error("unexpected end of stream at byte {position}")]
    Truncated { position: u64 },

    /// Arrays nested deeper than the parser accepts
    #[error("arrays nested too deeply at byte {position}")]
    NestingTooDeep { position: u64 },

    /// Text or length line exceeds the line cap
    #[error("line longer than {max} bytes at byte {position}")]
    LineTooLong { position: u64, max: usize },
}

impl RespError {
    /// Byte offset of the offending input
    pub fn position(&self) -> u64 {
        match self {
            RespError::UnknownTag { position, .. }
            | RespError::InvalidLength { position, .. }
            | RespError::MissingTerminator { position }
            | RespError::InvalidUtf8 { position }
            | RespError::Truncated { position }
            | RespError::NestingTooDeep { position }
            | RespError::LineTooLong { position, .. } => *position,
        }
    }

    /// Shift the position by `base` bytes
    pub(crate) fn offset_by(mut self, base: u64) -> Self {
        match &mut self {
            RespError::UnknownTag { position, .. }
            | RespError::InvalidLength { position, .. }
            | RespError::MissingTerminator { position }
            | RespError::InvalidUtf8 { position }
            | RespError::Truncated { position }
            | RespError::NestingTooDeep { position }
            | RespError::LineTooLong { position, .. } => *position += base,
        }
        self
    }
}
