//! Wire protocol for Strikeball.
//!
//! This crate defines the "language" that players and the server speak:
//!
//! - **Types** ([`RoomCode`], [`SessionId`], [`GameStatus`], [`Turn`],
//!   [`Channel`], [`Envelope`], ...): identities and records that travel
//!   on the wire.
//! - **Messages** ([`ClientIntent`], [`ServerEvent`]): what players ask
//!   for and what the server tells them.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer (game rules). It knows nothing about connections or game state.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope<ClientIntent>) → Room (Game)
//! Room (Game) → Protocol (Envelope<ServerEvent>) → Transport (frames)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    AnswerSet, ClientIntent, CreateRoomRequest, ErrorPayload, GameFinished,
    GameSettings, GameStateInfo, JoinRoomRequest, NewGuess, PlayerConnection,
    PlayerReady, RoomCreated, RoomJoined, ServerEvent, SessionRequest,
    SetAnswerRequest, SetReadyRequest, StateChange, SubmitGuessRequest,
};
pub use types::{
    Channel, ConnectionStatus, Envelope, ErrorCode, FinishReason, GameStatus,
    ReconnectToken, Recipient, RoomCode, SessionId, Turn, unix_millis,
};
