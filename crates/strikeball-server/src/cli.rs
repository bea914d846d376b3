//! Command-line arguments, with environment fallbacks.

use std::time::Duration;

use clap::Parser;
use strikeball::prelude::{RegistryConfig, ServerConfig};

/// Strikeball game server
#[derive(Parser, Debug)]
#[command(name = "strikeball-server")]
#[command(about = "Two-player Strike/Ball game server over WebSocket")]
#[command(version)]
pub struct Cli {
    /// Address to bind to
    #[arg(short, long, env = "STRIKEBALL_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Seconds a connection may stay silent before it is closed
    #[arg(long, env = "STRIKEBALL_CONNECTION_TIMEOUT", default_value_t = 300)]
    pub connection_timeout: u64,

    /// Seconds between reaper sweeps
    #[arg(long, env = "STRIKEBALL_REAP_INTERVAL", default_value_t = 30)]
    pub reap_interval: u64,

    /// Seconds without any intent before a room is expired
    #[arg(long, env = "STRIKEBALL_IDLE_TIMEOUT", default_value_t = 1800)]
    pub idle_timeout: u64,

    /// Seconds a finished room is kept for late status requests
    #[arg(long, env = "STRIKEBALL_FINISHED_TTL", default_value_t = 300)]
    pub finished_ttl: u64,

    /// Seconds a room may have no connected player before it is expired
    #[arg(long, env = "STRIKEBALL_ABSENT_TIMEOUT", default_value_t = 600)]
    pub absent_timeout: u64,

    /// Log filter (trace, debug, info, warn, error); RUST_LOG wins if set
    #[arg(long, env = "STRIKEBALL_LOG", default_value = "info")]
    pub log: String,
}

impl Cli {
    /// Maps the flags onto the server configuration.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind.clone(),
            connection_timeout: Duration::from_secs(self.connection_timeout),
            reap_interval: Duration::from_secs(self.reap_interval),
            registry: RegistryConfig {
                idle_timeout: Duration::from_secs(self.idle_timeout),
                finished_ttl: Duration::from_secs(self.finished_ttl),
                absent_timeout: Duration::from_secs(self.absent_timeout),
                ..RegistryConfig::default()
            },
        }
    }
}
