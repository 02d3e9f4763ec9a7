//! Configuration for FerrumKV

use crate::aof::AofConfig;

/// Default listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:6379";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP listen address (host:port)
    pub listen_addr: String,

    /// AOF persistence settings
    pub aof: AofConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            aof: AofConfig::default(),
        }
    }
}
