//! Transport abstraction layer for Strikeball.
//!
//! The game server never touches sockets directly. It accepts
//! [`Connection`]s from a [`Transport`] and exchanges whole frames with
//! them; the protocol layer above decides what the bytes mean.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique label for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next identifier. Never returns the same value twice.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that hands out upgraded connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client and completes its upgrade.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address actually bound; useful after binding port `0`.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// One client connection carrying whole frames.
///
/// Reads and writes are independent: a task parked in [`recv`](Self::recv)
/// never blocks another task calling [`send_text`](Self::send_text).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends a binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Sends a text frame. Browsers deliver these to `onmessage` as
    /// strings, which is what a JSON client expects.
    async fn send_text(&self, text: String) -> Result<(), Self::Error>;

    /// Waits for the next data frame, text or binary, as bytes.
    ///
    /// `Ok(None)` means the peer closed the connection.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts the closing handshake.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// The remote address of the client.
    fn peer_addr(&self) -> SocketAddr;
}
