//! The error every public server call returns.

use strikeball_protocol::ProtocolError;
use strikeball_transport::TransportError;

/// Failure that stops a listener or ends a connection.
///
/// Game and registry failures never surface here: the handler turns them
/// into `ERROR` events for the client. Variants are transparent, and `?`
/// lifts either layer error into this one.
#[derive(Debug, thiserror::Error)]
pub enum StrikeballError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
