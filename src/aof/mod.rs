//! Append-Only File (AOF) persistence module
//!
//! Provides durability by logging every accepted write command to disk.
//! A record is the RESP encoding of the command array, nothing more, so the
//! file is a plain concatenation of commands in append order.

mod writer;
mod reader;

pub use writer::{Aof, SYNC_INTERVAL};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// AOF sync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Sync after every write (safest, slowest)
    Always,
    /// Sync every second from a background task (balanced)
    #[default]
    EverySecond,
    /// Let the OS decide when to sync (fastest, least safe)
    No,
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(SyncPolicy::Always),
            "everysec" => Ok(SyncPolicy::EverySecond),
            "no" => Ok(SyncPolicy::No),
            other => Err(format!(
                "unknown sync policy '{}' (expected always, everysec or no)",
                other
            )),
        }
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPolicy::Always => "always",
            SyncPolicy::EverySecond => "everysec",
            SyncPolicy::No => "no",
        };
        f.write_str(name)
    }
}

/// AOF configuration
#[derive(Debug, Clone)]
pub struct AofConfig {
    /// Path to the AOF file
    pub path: PathBuf,
    /// Sync policy
    pub sync_policy: SyncPolicy,
    /// Whether to enable AOF
    pub enabled: bool,
}

impl Default for AofConfig {
    fn default() -> Self {
        AofConfig {
            path: PathBuf::from("database.aof"),
            sync_policy: SyncPolicy::default(),
            enabled: true,
        }
    }
}
