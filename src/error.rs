//! Error types for FerrumKV

use crate::protocol::RespError;
use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
///
/// End of stream is not an error: readers report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed wire or log bytes
    #[error("Protocol error: {0}")]
    Protocol(#[from] RespError),

    /// Underlying read, write or fsync failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The AOF was used after being closed
    #[error("AOF is closed")]
    Closed,
}
