//! Error types for the session layer.

use strikeball_protocol::SessionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with this identifier. Either it was never issued
    /// or its room has been removed.
    #[error("unknown session {0}")]
    NotFound(SessionId),

    /// The presented reconnect token is missing or belongs to another seat.
    #[error("unknown session {0}")]
    BadToken(SessionId),
}
