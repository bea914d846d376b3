//! Wire-level failures.
//!
//! A `ProtocolError` always means the bytes on the wire were wrong: they
//! failed to parse, or parsed into something the protocol forbids (such as
//! a malformed room code). Game-rule violations are not protocol errors.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An outgoing event could not be serialized.
    #[cfg(feature = "json")]
    #[error("cannot encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// An incoming frame is not a valid intent: malformed JSON, an unknown
    /// `type` tag, a missing payload field, or a room code outside
    /// `[A-Z0-9]{6}`.
    #[cfg(feature = "json")]
    #[error("cannot decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// Parsed, but the value is not allowed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
