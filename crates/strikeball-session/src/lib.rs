//! Player session index for Strikeball.
//!
//! A session is one player's seat in one room. This crate issues session
//! identifiers and remembers, for each of them:
//!
//! 1. **Where** the player sits ([`RoomCode`](strikeball_protocol::RoomCode)
//!    and [`Role`])
//! 2. **Who** they are (their nickname)
//! 3. **Whether** a connection currently speaks for them ([`Presence`])
//!
//! Presence never touches game state. A player who drops off keeps their
//! seat until they come back, explicitly leave, or the room is reaped.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← resolves session ids to rooms, reaps absent rooms
//!     ↕
//! Session Layer (this crate)  ← identity, role and presence per seat
//!     ↕
//! Protocol Layer (below)  ← SessionId, RoomCode, ConnectionStatus
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Attachment, PlayerSession, Presence, Role, SessionConfig};
