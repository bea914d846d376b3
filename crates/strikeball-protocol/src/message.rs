//! Player intents and server events.
//!
//! Both enums are adjacently tagged (`type` + `payload`) so that, once
//! flattened into an [`Envelope`](crate::Envelope), the JSON reads
//! `{"type": "SUBMIT_GUESS", "payload": {...}, "timestamp": ...}`.

use serde::{Deserialize, Serialize};

use crate::{
    ConnectionStatus, ErrorCode, FinishReason, GameStatus, ReconnectToken, RoomCode,
    SessionId, Turn,
};

// ---------------------------------------------------------------------------
// Shared payload pieces
// ---------------------------------------------------------------------------

/// The rule configuration of a room as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub digits: u8,
    pub allow_zero: bool,
    pub allow_duplicate: bool,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// `CREATE_ROOM` payload.
///
/// Rule fields are optional at the wire level so that a missing field
/// surfaces as `INVALID_CONFIGURATION` rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub digits: Option<u32>,
    #[serde(default)]
    pub allow_zero: Option<bool>,
    #[serde(default)]
    pub allow_duplicate: Option<bool>,
}

/// `JOIN_ROOM` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_code: RoomCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

fn ready_by_default() -> bool {
    true
}

/// `SET_READY` payload. `ready` defaults to `true` when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReadyRequest {
    pub session_id: SessionId,
    #[serde(default = "ready_by_default")]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_token: Option<ReconnectToken>,
}

/// `SET_ANSWER` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAnswerRequest {
    pub session_id: SessionId,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_token: Option<ReconnectToken>,
}

/// `SUBMIT_GUESS` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitGuessRequest {
    pub session_id: SessionId,
    pub guess: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_token: Option<ReconnectToken>,
}

/// Payload for intents that only name the caller's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: SessionId,
    /// Required unless this connection already speaks for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_token: Option<ReconnectToken>,
}

/// Everything a player can ask the server to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientIntent {
    CreateRoom(CreateRoomRequest),
    JoinRoom(JoinRoomRequest),
    SetReady(SetReadyRequest),
    SetAnswer(SetAnswerRequest),
    SubmitGuess(SubmitGuessRequest),
    Abandon(SessionRequest),
    /// Presence only: never changes the game status.
    LeaveRoom(SessionRequest),
    /// Point-in-time snapshot, used to resync after a reconnect.
    GetStatus(SessionRequest),
}

impl ClientIntent {
    /// The session the intent is addressed by, once one has been issued.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::CreateRoom(_) | Self::JoinRoom(_) => None,
            Self::SetReady(r) => Some(&r.session_id),
            Self::SetAnswer(r) => Some(&r.session_id),
            Self::SubmitGuess(r) => Some(&r.session_id),
            Self::Abandon(r) | Self::LeaveRoom(r) | Self::GetStatus(r) => {
                Some(&r.session_id)
            }
        }
    }

    /// The seat credential presented with the intent, if any.
    pub fn reconnect_token(&self) -> Option<&ReconnectToken> {
        match self {
            Self::CreateRoom(_) | Self::JoinRoom(_) => None,
            Self::SetReady(r) => r.reconnect_token.as_ref(),
            Self::SetAnswer(r) => r.reconnect_token.as_ref(),
            Self::SubmitGuess(r) => r.reconnect_token.as_ref(),
            Self::Abandon(r) | Self::LeaveRoom(r) | Self::GetStatus(r) => {
                r.reconnect_token.as_ref()
            }
        }
    }

    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "CREATE_ROOM",
            Self::JoinRoom(_) => "JOIN_ROOM",
            Self::SetReady(_) => "SET_READY",
            Self::SetAnswer(_) => "SET_ANSWER",
            Self::SubmitGuess(_) => "SUBMIT_GUESS",
            Self::Abandon(_) => "ABANDON",
            Self::LeaveRoom(_) => "LEAVE_ROOM",
            Self::GetStatus(_) => "GET_STATUS",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// `ROOM_CREATED`: reply to `CREATE_ROOM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_code: RoomCode,
    pub session_id: SessionId,
    pub reconnect_token: ReconnectToken,
    pub settings: GameSettings,
}

/// `ROOM_JOINED`: reply to `JOIN_ROOM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    pub room_code: RoomCode,
    pub session_id: SessionId,
    pub reconnect_token: ReconnectToken,
    pub settings: GameSettings,
    pub status: GameStatus,
}

/// `GAME_STATUS`: reply to `GET_STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateInfo {
    pub room_code: RoomCode,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<SessionId>,
    pub creator_ready: bool,
    pub joiner_ready: bool,
    pub turn_count: u32,
}

/// `STATE_CHANGE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<SessionId>,
    pub room_code: RoomCode,
    pub creator_ready: bool,
    pub joiner_ready: bool,
}

/// `PLAYER_READY`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReady {
    pub session_id: SessionId,
    pub ready: bool,
    pub nickname: String,
}

/// `ANSWER_SET`: carries the fact that a secret exists, never the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSet {
    pub session_id: SessionId,
    pub answer_set: bool,
    pub all_answers_set: bool,
}

/// `NEW_GUESS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGuess {
    pub guesser: SessionId,
    pub guess: String,
    pub result: String,
    pub turn_number: u32,
    /// Absent when the guess ended the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_turn: Option<SessionId>,
}

/// `GAME_FINISHED`: the only event that ever carries secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFinished {
    /// `None` only when the room was reaped (`TIMEOUT`).
    pub winner: Option<SessionId>,
    pub reason: FinishReason,
    pub game_history: Vec<Turn>,
    pub total_turns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joiner_answer: Option<String>,
}

/// `PLAYER_CONNECTED` / `PLAYER_DISCONNECTED`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConnection {
    pub session_id: SessionId,
    pub nickname: String,
    pub connected: bool,
    pub connection_status: ConnectionStatus,
}

/// `ERROR`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error_code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Everything the server can tell a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    RoomCreated(RoomCreated),
    RoomJoined(RoomJoined),
    GameStatus(GameStateInfo),
    StateChange(StateChange),
    PlayerReady(PlayerReady),
    AnswerSet(AnswerSet),
    NewGuess(NewGuess),
    GameFinished(GameFinished),
    PlayerConnected(PlayerConnection),
    PlayerDisconnected(PlayerConnection),
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Builds an `ERROR` event.
    pub fn error(
        error_code: ErrorCode,
        message: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        Self::Error(ErrorPayload {
            error_code,
            message: message.into(),
            details,
        })
    }

    /// Builds the presence event matching `payload.connection_status`.
    pub fn presence(payload: PlayerConnection) -> Self {
        if payload.connection_status.is_connected() {
            Self::PlayerConnected(payload)
        } else {
            Self::PlayerDisconnected(payload)
        }
    }

    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomCreated(_) => "ROOM_CREATED",
            Self::RoomJoined(_) => "ROOM_JOINED",
            Self::GameStatus(_) => "GAME_STATUS",
            Self::StateChange(_) => "STATE_CHANGE",
            Self::PlayerReady(_) => "PLAYER_READY",
            Self::AnswerSet(_) => "ANSWER_SET",
            Self::NewGuess(_) => "NEW_GUESS",
            Self::GameFinished(_) => "GAME_FINISHED",
            Self::PlayerConnected(_) => "PLAYER_CONNECTED",
            Self::PlayerDisconnected(_) => "PLAYER_DISCONNECTED",
            Self::Error(_) => "ERROR",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
