//! Core protocol types for Strikeball's wire format.
//!
//! Every type here is serialized to JSON and read by browser clients, so
//! the serde attributes ARE the wire contract. Field names are camelCase
//! and enum values are SCREAMING_SNAKE_CASE, matching what existing
//! clients parse.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Milliseconds since the UNIX epoch, as stamped on every envelope and turn.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A six-character room code drawn from `[A-Z0-9]`.
///
/// Clients type these by hand, so parsing upper-cases the input first.
/// Anything that is still not exactly six alphanumerics is rejected at
/// decode time, which is why the serde representation goes through
/// `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in every room code.
    pub const LEN: usize = 6;

    /// The characters a room code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Builds a code from six positions into [`ALPHABET`](Self::ALPHABET).
    ///
    /// Indices wrap around the alphabet, so any `usize` is accepted. This
    /// keeps code generation infallible for callers holding an RNG.
    pub fn from_alphabet_indices(indices: [usize; Self::LEN]) -> Self {
        Self(
            indices
                .iter()
                .map(|i| Self::ALPHABET[i % Self::ALPHABET.len()] as char)
                .collect(),
        )
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        let well_formed = code.len() == Self::LEN
            && code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !well_formed {
            return Err(ProtocolError::InvalidMessage(format!(
                "room code must be {} characters of [A-Z0-9], got {s:?}",
                Self::LEN
            )));
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one player's seat in one room.
///
/// Issued when a room is created or joined and presented on every later
/// intent. It is public within the room: broadcasts name seats by it, so
/// the opponent learns it. Proving ownership of a seat takes the
/// [`ReconnectToken`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The private credential of a seat.
///
/// Delivered once, point-to-point, in `ROOM_CREATED` / `ROOM_JOINED`, and
/// never broadcast. A connection must present it to speak for a session
/// it is not already bound to.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconnectToken(String);

impl ReconnectToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keeps tokens out of `?request` logs.
impl fmt::Debug for ReconnectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReconnectToken(..)")
    }
}

// ---------------------------------------------------------------------------
// Game lifecycle
// ---------------------------------------------------------------------------

/// The lifecycle status of a room's game.
///
/// ```text
/// WAITING_FOR_JOINER → WAITING_FOR_READY → SETTING_ANSWERS → IN_PROGRESS
///                            │                   │               │
///                            └───────────────────┴───────────────┴──→ ABANDONED
///                                                                │
///                                                                └──→ FINISHED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    WaitingForJoiner,
    WaitingForReady,
    SettingAnswers,
    InProgress,
    Finished,
    Abandoned,
}

impl GameStatus {
    /// Returns `true` once no further game mutation is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Abandoned)
    }

    /// Returns `true` while a second player may still join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::WaitingForJoiner)
    }

    /// Returns `true` for the statuses an `abandon` intent may end.
    pub fn is_abandonable(self) -> bool {
        matches!(
            self,
            Self::WaitingForReady | Self::SettingAnswers | Self::InProgress
        )
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingForJoiner => "WAITING_FOR_JOINER",
            Self::WaitingForReady => "WAITING_FOR_READY",
            Self::SettingAnswers => "SETTING_ANSWERS",
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
            Self::Abandoned => "ABANDONED",
        };
        f.write_str(name)
    }
}

/// Why a game reached a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// A guess scored a full match.
    Win,
    /// A player explicitly abandoned.
    Abandon,
    /// The room was reaped for inactivity.
    Timeout,
}

/// Presence of a player's connection, as announced to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnected,
}

impl ConnectionStatus {
    /// Returns `true` for the two "player is here" statuses.
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

/// One scored guess. Immutable once appended to a game's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// 1-based, contiguous within a game.
    pub turn_number: u32,
    pub guesser_session_id: SessionId,
    pub guess: String,
    /// Judge output: `OUT`, `{s}S`, `{b}B`, or `{s}S{b}B`.
    pub result: String,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Machine-readable error codes carried by `ERROR` events.
///
/// The human-readable message next to the code is cosmetic; clients
/// branch on the code only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidConfiguration,
    InvalidNickname,
    RoomNotFound,
    RoomFull,
    RoomClosed,
    UnknownSession,
    NotYourTurn,
    InvalidSecret,
    InvalidGuess,
    AlreadySet,
    InvalidState,
    InvalidMessage,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidConfiguration => "INVALID_CONFIGURATION",
            Self::InvalidNickname => "INVALID_NICKNAME",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomFull => "ROOM_FULL",
            Self::RoomClosed => "ROOM_CLOSED",
            Self::UnknownSession => "UNKNOWN_SESSION",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::InvalidSecret => "INVALID_SECRET",
            Self::InvalidGuess => "INVALID_GUESS",
            Self::AlreadySet => "ALREADY_SET",
            Self::InvalidState => "INVALID_STATE",
            Self::InvalidMessage => "INVALID_MESSAGE",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Who a server event is meant for, as decided by game logic.
///
/// The room actor resolves this into a concrete [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Both players of the room.
    Room,
    /// Exactly one player.
    Session(SessionId),
}

/// The addressable channel an outbound envelope was delivered on.
///
/// Room channels carry public game progress; session channels carry
/// errors and personal snapshots. Keeping the two apart on the wire lets
/// a client tell at a glance whether a message was meant for it alone.
///
/// ```json
/// { "scope": "room", "address": "K3X9QA" }
/// { "scope": "session", "address": "9f2c..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "address", rename_all = "lowercase")]
pub enum Channel {
    Room(RoomCode),
    Session(SessionId),
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire wrapper for both directions.
///
/// `T` is either [`ClientIntent`](crate::ClientIntent) (inbound) or
/// [`ServerEvent`](crate::ServerEvent) (outbound). Both are adjacently
/// tagged, and flattening them here produces:
///
/// ```json
/// { "type": "NEW_GUESS", "payload": { ... }, "channel": { ... }, "timestamp": 1700000000000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The `type` + `payload` pair.
    #[serde(flatten)]
    pub body: T,

    /// Where an outbound envelope was routed. Absent on inbound envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,

    /// Milliseconds since the UNIX epoch when the envelope was built.
    #[serde(default)]
    pub timestamp: u64,
}

impl<T> Envelope<T> {
    /// Wraps a client-to-server message, stamped now.
    pub fn inbound(body: T) -> Self {
        Self {
            body,
            channel: None,
            timestamp: unix_millis(),
        }
    }

    /// Wraps a server-to-client message routed on `channel`, stamped now.
    pub fn routed(body: T, channel: Channel) -> Self {
        Self {
            body,
            channel: Some(channel),
            timestamp: unix_millis(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // RoomCode
    // =====================================================================

    #[test]
    fn test_room_code_parse_upper_cases_input() {
        let code: RoomCode = "ab12cd".parse().unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_room_code_parse_rejects_wrong_length() {
        assert!("ABC12".parse::<RoomCode>().is_err());
        assert!("ABC1234".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_room_code_parse_rejects_symbols() {
        assert!("AB-12C".parse::<RoomCode>().is_err());
        assert!("ÄBC123".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_room_code_deserialize_validates() {
        let ok: RoomCode = serde_json::from_str("\"zz9zz9\"").unwrap();
        assert_eq!(ok.as_str(), "ZZ9ZZ9");

        let bad: Result<RoomCode, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let code: RoomCode = "K3X9QA".parse().unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"K3X9QA\"");
    }

    #[test]
    fn test_room_code_from_alphabet_indices_wraps() {
        let code = RoomCode::from_alphabet_indices([0, 25, 26, 35, 36, 71]);
        assert_eq!(code.as_str(), "AZ09A9");
    }

    // =====================================================================
    // SessionId
    // =====================================================================

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    // =====================================================================
    // GameStatus
    // =====================================================================

    #[test]
    fn test_game_status_wire_names() {
        let json = serde_json::to_string(&GameStatus::WaitingForJoiner).unwrap();
        assert_eq!(json, "\"WAITING_FOR_JOINER\"");
        let json = serde_json::to_string(&GameStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn test_game_status_display_matches_wire_name() {
        for status in [
            GameStatus::WaitingForJoiner,
            GameStatus::WaitingForReady,
            GameStatus::SettingAnswers,
            GameStatus::InProgress,
            GameStatus::Finished,
            GameStatus::Abandoned,
        ] {
            let wire = serde_json::to_string(&status).unwrap();
            assert_eq!(wire, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_game_status_predicates() {
        assert!(GameStatus::WaitingForJoiner.is_joinable());
        assert!(!GameStatus::WaitingForReady.is_joinable());

        assert!(GameStatus::Finished.is_terminal());
        assert!(GameStatus::Abandoned.is_terminal());
        assert!(!GameStatus::InProgress.is_terminal());

        assert!(!GameStatus::WaitingForJoiner.is_abandonable());
        assert!(GameStatus::WaitingForReady.is_abandonable());
        assert!(GameStatus::SettingAnswers.is_abandonable());
        assert!(GameStatus::InProgress.is_abandonable());
        assert!(!GameStatus::Finished.is_abandonable());
    }

    // =====================================================================
    // ErrorCode
    // =====================================================================

    #[test]
    fn test_error_code_display_matches_wire_name() {
        for code in [
            ErrorCode::InvalidConfiguration,
            ErrorCode::RoomNotFound,
            ErrorCode::NotYourTurn,
            ErrorCode::AlreadySet,
            ErrorCode::InvalidMessage,
        ] {
            let wire = serde_json::to_string(&code).unwrap();
            assert_eq!(wire, format!("\"{code}\""));
        }
    }

    // =====================================================================
    // Channel
    // =====================================================================

    #[test]
    fn test_channel_json_format() {
        let room = Channel::Room("K3X9QA".parse().unwrap());
        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json["scope"], "room");
        assert_eq!(json["address"], "K3X9QA");

        let session = Channel::Session(SessionId::new("s-1"));
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["scope"], "session");
        assert_eq!(json["address"], "s-1");
    }

    // =====================================================================
    // Turn
    // =====================================================================

    #[test]
    fn test_turn_uses_camel_case_fields() {
        let turn = Turn {
            turn_number: 1,
            guesser_session_id: SessionId::new("s-1"),
            guess: "123".into(),
            result: "1S".into(),
            timestamp: 10,
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["turnNumber"], 1);
        assert_eq!(json["guesserSessionId"], "s-1");
        assert_eq!(json["result"], "1S");
    }
}
