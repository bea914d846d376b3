//! Server-level configuration.

use std::time::Duration;

use strikeball_room::RegistryConfig;

/// Everything the server needs to start, short of a codec.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to. Port `0` picks a free one.
    pub bind_addr: String,
    /// A connection that sends nothing for this long is closed.
    pub connection_timeout: Duration,
    /// How often the reaper sweeps the registry.
    pub reap_interval: Duration,
    /// Room and session thresholds.
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            connection_timeout: Duration::from_secs(5 * 60),
            reap_interval: Duration::from_secs(30),
            registry: RegistryConfig::default(),
        }
    }
}
