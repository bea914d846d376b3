//! # Strikeball
//!
//! A server-authoritative Strike/Ball (bulls and cows) game server for
//! two players per room.
//!
//! The crate wires the layers together: WebSocket transport, the JSON
//! message protocol, player sessions and the per-room game actors. Clients
//! speak `CREATE_ROOM`, `JOIN_ROOM` and the in-game intents; every state
//! change is pushed back on a room channel or a session channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strikeball::prelude::*;
//!
//! # async fn start() -> Result<(), StrikeballError> {
//! let server = StrikeballServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::StrikeballError;
pub use server::{StrikeballServer, StrikeballServerBuilder};

pub mod prelude {
    pub use crate::{ServerConfig, StrikeballError, StrikeballServer, StrikeballServerBuilder};
    pub use strikeball_protocol::{
        Channel, ClientIntent, Codec, ConnectionStatus, CreateRoomRequest, Envelope, ErrorCode,
        FinishReason, GameSettings, GameStatus, JoinRoomRequest, JsonCodec, ReconnectToken,
        RoomCode, ServerEvent, SessionId, SessionRequest, SetAnswerRequest, SetReadyRequest,
        SubmitGuessRequest,
    };
    pub use strikeball_room::{RegistryConfig, RuleConfiguration, Score};
}
