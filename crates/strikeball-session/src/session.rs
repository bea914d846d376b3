//! Session types: the records that describe one player's seat.

use std::time::{Duration, Instant};

use strikeball_protocol::{ConnectionStatus, ReconnectToken, RoomCode, SessionId};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long every seat of a room may go without a connection before
    /// the room counts as abandoned-looking and becomes reapable.
    ///
    /// Default: 10 minutes.
    pub absent_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            absent_timeout: Duration::from_secs(10 * 60),
        }
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which seat of a room a session occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Opened the room. Always takes the first turn.
    Creator,
    /// Joined with the room code.
    Joiner,
}

impl Role {
    /// Nickname used when the player did not pick one.
    pub fn default_nickname(self) -> &'static str {
        match self {
            Self::Creator => "Host",
            Self::Joiner => "Guest",
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Whether a connection currently speaks for a session.
///
/// ```text
///   Pending ──(attach)──→ Connected{g} ──(detach g)──→ Disconnected
///                            ↑   │                          │
///                            │   └──(attach)──→ Connected{g+1}
///                            └──────────(attach)────────────┘
///
///   any ──(leave)──→ Left
/// ```
///
/// Every attach hands out a fresh generation. A detach only lands when it
/// names the current generation, so closing a superseded connection can
/// never mark a player who already came back on a new one as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Issued but no connection has attached yet.
    Pending { since: Instant },

    /// A connection is bound, identified by its attach generation.
    Connected { generation: u64 },

    /// The bound connection went away.
    Disconnected { since: Instant },

    /// The player explicitly left the room.
    Left { since: Instant },
}

impl Presence {
    /// Returns `true` while a connection is bound.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// When the seat last lost (or never had) its connection.
    pub fn absent_since(&self) -> Option<Instant> {
        match self {
            Self::Connected { .. } => None,
            Self::Pending { since }
            | Self::Disconnected { since }
            | Self::Left { since } => Some(*since),
        }
    }
}

/// The result of attaching a connection to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// Pass back to [`SessionManager::detach`](crate::SessionManager::detach).
    pub generation: u64,
    /// `Connected` on the very first attach, `Reconnected` afterwards.
    pub status: ConnectionStatus,
}

// ---------------------------------------------------------------------------
// PlayerSession
// ---------------------------------------------------------------------------

/// One player's seat in one room.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub session_id: SessionId,
    /// Known only to the player it was issued to.
    pub reconnect_token: ReconnectToken,
    pub room_code: RoomCode,
    pub role: Role,
    pub nickname: String,
    pub presence: Presence,
}

impl PlayerSession {
    /// Returns `true` once the player left the room for good.
    pub fn has_left(&self) -> bool {
        matches!(self.presence, Presence::Left { .. })
    }
}
