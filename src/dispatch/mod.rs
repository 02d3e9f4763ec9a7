//! Command dispatcher
//!
//! Routes incoming commands to the appropriate handler and logs write
//! commands to the AOF before applying them. Shared by every connection.

use crate::aof::{Aof, AofConfig};
use crate::commands::{Command, CommandRegistry};
use crate::error::Result;
use crate::protocol::RespValue;
use crate::store::MemoryStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Command dispatcher
///
/// Receives RESP commands, validates them, and routes to appropriate handlers
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    /// The memory store
    store: Arc<MemoryStore>,

    /// AOF, when persistence is enabled
    aof: Option<Arc<Aof>>,
}

impl Dispatcher {
    /// Create a dispatcher without persistence
    pub fn new() -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            store: Arc::new(MemoryStore::new()),
            aof: None,
        }
    }

    /// Create a dispatcher with AOF support
    ///
    /// Opens the log, replays it into a fresh store and only then returns, so
    /// no client can observe a partially rebuilt state. A corrupt log is an
    /// error: starting with half the data would silently lose the rest.
    pub fn with_aof(config: &AofConfig) -> Result<Self> {
        let mut dispatcher = Self::new();

        if !config.enabled {
            info!("AOF disabled, running in memory only");
            return Ok(dispatcher);
        }

        let aof = Aof::open(&config.path, config.sync_policy)?;
        let replayed = aof.replay(|command| {
            dispatcher.apply(command);
        })?;
        info!("Replayed {} commands from {:?}", replayed, config.path);

        dispatcher.aof = Some(Arc::new(aof));
        Ok(dispatcher)
    }

    /// Dispatch a command from a client
    ///
    /// Takes a RESP value (expected to be an array), extracts the command name
    /// and arguments, then routes to the appropriate handler. Write commands
    /// are appended to the AOF first; if that fails they are not applied.
    /// Logging and applying a write happen under the AOF lock, so concurrent
    /// writes reach the store in the same order they reach the file.
    pub fn dispatch(&self, value: RespValue) -> RespValue {
        let command = match self.resolve(&value) {
            Ok(command) => command,
            Err(reply) => return reply,
        };

        let aof = match &self.aof {
            Some(aof) if command.is_write() => aof,
            _ => return Self::execute(command.as_ref(), &self.store, &value),
        };

        match aof.append_then(&value, || Self::execute(command.as_ref(), &self.store, &value)) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to append {} to AOF: {}", command.name(), e);
                RespValue::error(format!("ERR failed to persist command: {}", e))
            }
        }
    }

    /// Apply a command without logging it
    ///
    /// Used for AOF replay. Commands the registry does not know are skipped
    /// with a warning, like any other rejected request.
    pub fn apply(&self, value: RespValue) -> RespValue {
        match self.resolve(&value) {
            Ok(command) => Self::execute(command.as_ref(), &self.store, &value),
            Err(reply) => {
                warn!("Skipping logged command: {:?}", reply);
                reply
            }
        }
    }

    /// Look up the handler for a request and check its arity
    fn resolve(&self, value: &RespValue) -> std::result::Result<Arc<dyn Command>, RespValue> {
        // Commands should be non-empty arrays
        let args = match value.as_array() {
            Some(arr) if !arr.is_empty() => arr,
            _ => return Err(RespValue::error("ERR invalid request")),
        };

        // First element is the command name
        let cmd_name = match args[0].as_bytes().map(std::str::from_utf8) {
            Some(Ok(s)) => s,
            Some(Err(_)) => return Err(RespValue::error("ERR invalid command name encoding")),
            None => return Err(RespValue::error("ERR command name must be a string")),
        };

        debug!("Dispatching command: {}", cmd_name);

        let command = match self.registry.get(cmd_name) {
            Some(cmd) => cmd,
            None => {
                warn!("Unknown command: {}", cmd_name);
                return Err(RespValue::error(format!("ERR unknown command '{}'", cmd_name)));
            }
        };

        // Validate argument count
        let argc = args.len() - 1;
        let too_many = command.max_args().is_some_and(|max| argc > max);
        if argc < command.min_args() || too_many {
            return Err(crate::commands::wrong_arity(command.name()));
        }

        Ok(command)
    }

    fn execute(command: &dyn Command, store: &MemoryStore, value: &RespValue) -> RespValue {
        let args = value.as_array().map(|arr| &arr[1..]).unwrap_or_default();
        command.execute(store, args)
    }

    /// The memory store (for testing/inspection)
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// The AOF, if persistence is enabled
    pub fn aof(&self) -> Option<&Arc<Aof>> {
        self.aof.as_ref()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
