//! Rooms for Strikeball: the game rules and the tasks that run them.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`Game`]. All intents against a room go through its mailbox, so they
//! are applied strictly one after another.
//!
//! # Key types
//!
//! - [`judge::score`]: scores a guess against a secret
//! - [`RuleConfiguration`]: digit count, zero and duplicate policy
//! - [`Game`]: the per-room state machine
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomRegistry`]: creates rooms, seats players, reaps idle rooms
//! - [`RegistryConfig`]: reaper thresholds and channel sizing

mod config;
mod error;
pub mod game;
pub mod judge;
mod manager;
mod room;
pub mod rules;

pub use config::RegistryConfig;
pub use error::{GameError, RoomError};
pub use game::{Game, Outbound, Outcome};
pub use judge::{JudgeError, Score};
pub use manager::RoomRegistry;
pub use room::{PlayerIntent, RoomHandle, RoomInfo, RoomOutbound, SessionSender};
pub use rules::{RuleConfiguration, RuleViolation};
