//! In-memory storage module
//!
//! Provides the maps behind the commands. Plain keys and hash keys live in
//! separate maps with separate locks, so traffic on one key space never waits
//! on the other. This module knows nothing about the protocol or the AOF.

mod memory;

pub use memory::MemoryStore;
