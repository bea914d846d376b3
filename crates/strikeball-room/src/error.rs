//! Error types for the room layer.
//!
//! [`GameError`] is a rejected intent: the game is untouched and the
//! submitter gets an `ERROR` event. [`RoomError`] wraps it together with
//! failures of the room plumbing itself.

use strikeball_protocol::{ErrorCode, GameStatus, RoomCode, ServerEvent, SessionId};
use strikeball_session::SessionError;

use crate::judge::JudgeError;
use crate::rules::RuleViolation;

/// Why an intent was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("invalid room configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid nickname: {0}")]
    InvalidNickname(String),

    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The room already has a joiner.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The room is past the point where anyone can join.
    #[error("room {0} is closed")]
    RoomClosed(RoomCode),

    /// The session is not one of the room's two players.
    #[error("session {0} is not part of this room")]
    UnknownSession(SessionId),

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("invalid secret: {0}")]
    InvalidSecret(RuleViolation),

    #[error("invalid guess: {0}")]
    InvalidGuess(RuleViolation),

    #[error("your secret is already set")]
    AlreadySet,

    /// The intent exists but makes no sense in the current status.
    #[error("cannot {action} while the game is {status}")]
    InvalidState {
        action: &'static str,
        status: GameStatus,
    },
}

impl GameError {
    /// The machine-readable code clients branch on.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            Self::InvalidNickname(_) => ErrorCode::InvalidNickname,
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::RoomClosed(_) => ErrorCode::RoomClosed,
            Self::UnknownSession(_) => ErrorCode::UnknownSession,
            Self::NotYourTurn => ErrorCode::NotYourTurn,
            Self::InvalidSecret(_) => ErrorCode::InvalidSecret,
            Self::InvalidGuess(_) => ErrorCode::InvalidGuess,
            Self::AlreadySet => ErrorCode::AlreadySet,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
        }
    }

    /// Names the broken rule for secret and guess errors.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::InvalidSecret(v) | Self::InvalidGuess(v) => Some(v.rule().to_string()),
            _ => None,
        }
    }

    /// Builds the `ERROR` event sent to the submitter.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::error(self.code(), self.to_string(), self.details())
    }
}

impl From<JudgeError> for GameError {
    fn from(err: JudgeError) -> Self {
        match err {
            JudgeError::InvalidInput { secret, guess } => Self::InvalidGuess(RuleViolation::Length {
                expected: secret,
                actual: guess,
            }),
            JudgeError::MalformedResult(_) => Self::InvalidGuess(RuleViolation::NotNumeric),
        }
    }
}

/// Errors from registry and actor operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The intent was refused by the game or registry rules.
    #[error(transparent)]
    Rejected(#[from] GameError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room actor has stopped (the room was removed mid-request).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// The code reported to the client for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected(err) => err.code(),
            Self::Session(SessionError::NotFound(_) | SessionError::BadToken(_)) => {
                ErrorCode::UnknownSession
            }
            Self::Unavailable(_) => ErrorCode::RoomNotFound,
        }
    }

    /// Builds the `ERROR` event sent to the submitter.
    pub fn to_event(&self) -> ServerEvent {
        match self {
            Self::Rejected(err) => err.to_event(),
            other => ServerEvent::error(other.code(), other.to_string(), None),
        }
    }
}
