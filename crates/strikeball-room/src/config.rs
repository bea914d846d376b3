//! Registry configuration.

use std::time::Duration;

use strikeball_session::SessionConfig;

/// Configuration for the room registry and its reaper.
///
/// All three thresholds are checked by [`RoomRegistry::reap`]; a room
/// that trips any one of them is expired.
///
/// [`RoomRegistry::reap`]: crate::RoomRegistry::reap
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// A room with no intents for this long is expired, whatever its status.
    pub idle_timeout: Duration,

    /// A finished or abandoned room is removed once it has been quiet for
    /// this long, so players can still fetch the final status briefly.
    pub finished_ttl: Duration,

    /// A room none of whose players has been connected for this long is
    /// expired.
    pub absent_timeout: Duration,

    /// Capacity of each room actor's command channel. Senders wait when
    /// it is full.
    pub channel_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            finished_ttl: Duration::from_secs(5 * 60),
            absent_timeout: Duration::from_secs(10 * 60),
            channel_size: 64,
        }
    }
}

impl RegistryConfig {
    /// The slice of this config the session index needs.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            absent_timeout: self.absent_timeout,
        }
    }
}
