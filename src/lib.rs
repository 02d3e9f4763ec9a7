//! FerrumKV - A lightweight in-memory key-value store with AOF persistence
//!
//! FerrumKV is designed with strong cohesion and loose coupling principles:
//! - Each module has a single, well-defined responsibility
//! - Modules communicate through clear, minimal interfaces
//! - No circular dependencies between modules

pub mod protocol;
pub mod store;
pub mod commands;
pub mod dispatch;
pub mod server;
pub mod aof;
pub mod config;
pub mod error;

/// Re-export commonly used types
pub use store::MemoryStore;
pub use protocol::{RespValue, RespError};
pub use commands::{Command, CommandRegistry};
pub use dispatch::Dispatcher;
pub use aof::{Aof, AofConfig, SyncPolicy};
pub use config::Config;
pub use error::{Error, Result};
