//! Rule configuration and the shape checks shared by secrets and guesses.

use std::ops::RangeInclusive;

use strikeball_protocol::{CreateRoomRequest, GameSettings};

use crate::GameError;

/// Which shape rule a secret or guess broke.
///
/// Checks run in declaration order and the first failure wins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("expected {expected} digits, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("only the digits 0-9 are allowed")]
    NotNumeric,

    #[error("the first digit must not be 0")]
    LeadingZero,

    #[error("0 is not allowed in this room")]
    ZeroNotAllowed,

    #[error("digits must not repeat in this room")]
    DuplicateDigit,
}

impl RuleViolation {
    /// The rule name carried in an error's `details`.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Length { .. } => "LENGTH",
            Self::NotNumeric => "NOT_NUMERIC",
            Self::LeadingZero => "LEADING_ZERO",
            Self::ZeroNotAllowed => "ZERO_NOT_ALLOWED",
            Self::DuplicateDigit => "DUPLICATE_DIGIT",
        }
    }
}

/// Validated game parameters shared by both players of a room.
///
/// Immutable once the room exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleConfiguration {
    digits: u8,
    allow_zero: bool,
    allow_duplicate: bool,
}

impl RuleConfiguration {
    /// Digit counts a room may be created with.
    pub const DIGITS: RangeInclusive<u32> = 3..=5;

    /// # Errors
    /// [`GameError::InvalidConfiguration`] if `digits` is outside
    /// [`DIGITS`](Self::DIGITS).
    pub fn new(digits: u32, allow_zero: bool, allow_duplicate: bool) -> Result<Self, GameError> {
        if !Self::DIGITS.contains(&digits) {
            return Err(GameError::InvalidConfiguration(format!(
                "digits must be between {} and {}, got {digits}",
                Self::DIGITS.start(),
                Self::DIGITS.end()
            )));
        }
        Ok(Self {
            digits: digits as u8,
            allow_zero,
            allow_duplicate,
        })
    }

    /// Builds the rules from a `CREATE_ROOM` payload. Every rule field is
    /// required.
    pub fn from_request(request: &CreateRoomRequest) -> Result<Self, GameError> {
        let missing = |field: &str| GameError::InvalidConfiguration(format!("{field} is required"));
        let digits = request.digits.ok_or_else(|| missing("digits"))?;
        let allow_zero = request.allow_zero.ok_or_else(|| missing("allowZero"))?;
        let allow_duplicate = request
            .allow_duplicate
            .ok_or_else(|| missing("allowDuplicate"))?;
        Self::new(digits, allow_zero, allow_duplicate)
    }

    pub fn digits(&self) -> usize {
        usize::from(self.digits)
    }

    pub fn allow_zero(&self) -> bool {
        self.allow_zero
    }

    pub fn allow_duplicate(&self) -> bool {
        self.allow_duplicate
    }

    /// The wire form sent in `ROOM_CREATED` / `ROOM_JOINED`.
    pub fn settings(&self) -> GameSettings {
        GameSettings {
            digits: self.digits,
            allow_zero: self.allow_zero,
            allow_duplicate: self.allow_duplicate,
        }
    }

    /// Checks a secret or guess against these rules.
    ///
    /// A leading `0` is refused even when zeros are allowed elsewhere.
    pub fn validate(&self, candidate: &str) -> Result<(), RuleViolation> {
        let chars: Vec<char> = candidate.chars().collect();

        if chars.len() != self.digits() {
            return Err(RuleViolation::Length {
                expected: self.digits(),
                actual: chars.len(),
            });
        }
        if !chars.iter().all(char::is_ascii_digit) {
            return Err(RuleViolation::NotNumeric);
        }
        if chars.first() == Some(&'0') {
            return Err(RuleViolation::LeadingZero);
        }
        if !self.allow_zero && chars.contains(&'0') {
            return Err(RuleViolation::ZeroNotAllowed);
        }
        if !self.allow_duplicate {
            let mut seen = [false; 10];
            for c in &chars {
                let d = (*c as u8 - b'0') as usize;
                if seen[d] {
                    return Err(RuleViolation::DuplicateDigit);
                }
                seen[d] = true;
            }
        }
        Ok(())
    }
}

/// Longest nickname accepted, in characters.
pub const NICKNAME_MAX_CHARS: usize = 10;

/// Trims and checks an optional nickname, falling back to `default` when
/// none (or only whitespace) was given.
///
/// Letters of any script, digits and inner spaces are allowed.
///
/// # Errors
/// [`GameError::InvalidNickname`] on any other character or when longer
/// than [`NICKNAME_MAX_CHARS`].
pub fn normalize_nickname(raw: Option<&str>, default: &str) -> Result<String, GameError> {
    let nickname = raw.map(str::trim).unwrap_or_default();
    if nickname.is_empty() {
        return Ok(default.to_string());
    }
    if nickname.chars().count() > NICKNAME_MAX_CHARS {
        return Err(GameError::InvalidNickname(format!(
            "nickname must be at most {NICKNAME_MAX_CHARS} characters"
        )));
    }
    if !nickname.chars().all(|c| c.is_alphanumeric() || c == ' ') {
        return Err(GameError::InvalidNickname(
            "nickname may contain only letters, digits and spaces".into(),
        ));
    }
    Ok(nickname.to_string())
}
