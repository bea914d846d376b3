//! Errors raised by the transport layer.

use std::io;

/// Why a listener or a connection failed.
///
/// Socket-level failures keep their `io::Error`; WebSocket failures keep
/// the tungstenite error (boxed, it is large) so callers can tell a
/// protocol violation from a dropped peer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound to the requested address.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Accepting a TCP connection, or reading the listener address, failed.
    #[error("listener error: {0}")]
    Listener(#[source] io::Error),

    /// The client's WebSocket upgrade request was rejected.
    #[cfg(feature = "websocket")]
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    /// Reading or writing a frame failed on an open connection.
    #[cfg(feature = "websocket")]
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tokio_tungstenite::tungstenite::Error>),
}
