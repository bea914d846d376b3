//! The judge: scores a guess against a secret.
//!
//! Pure and synchronous. Shape validation (digits only, leading zero,
//! zero and duplicate policy) happens before scoring; the judge only
//! insists that both sides have the same length.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Errors the judge can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JudgeError {
    /// Secret and guess differ in length.
    #[error("cannot score a {guess}-digit guess against a {secret}-digit secret")]
    InvalidInput { secret: usize, guess: usize },

    /// A result string that is not `OUT`, `{s}S`, `{b}B` or `{s}S{b}B`.
    #[error("malformed result code {0:?}")]
    MalformedResult(String),
}

/// Strike and ball counts for one guess.
///
/// Displays as the wire result code:
///
/// | strikes | balls | code     |
/// |---------|-------|----------|
/// | 0       | 0     | `OUT`    |
/// | s > 0   | 0     | `{s}S`   |
/// | 0       | b > 0 | `{b}B`   |
/// | s > 0   | b > 0 | `{s}S{b}B` |
///
/// A full match never has balls, so it always renders as `{digits}S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    pub strikes: usize,
    pub balls: usize,
}

impl Score {
    /// Returns `true` when every position matched.
    pub fn is_full_match(&self, digits: usize) -> bool {
        self.strikes == digits
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.strikes, self.balls) {
            (0, 0) => f.write_str("OUT"),
            (s, 0) => write!(f, "{s}S"),
            (0, b) => write!(f, "{b}B"),
            (s, b) => write!(f, "{s}S{b}B"),
        }
    }
}

impl FromStr for Score {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "OUT" {
            return Ok(Self::default());
        }

        let malformed = || JudgeError::MalformedResult(s.to_string());
        let mut score = Self::default();
        let mut rest = s;

        if let Some(pos) = rest.find('S') {
            score.strikes = parse_count(&rest[..pos]).ok_or_else(malformed)?;
            rest = &rest[pos + 1..];
        }
        if let Some(count) = rest.strip_suffix('B') {
            score.balls = parse_count(count).ok_or_else(malformed)?;
            rest = "";
        }
        if !rest.is_empty() || score == Self::default() {
            return Err(malformed());
        }
        Ok(score)
    }
}

/// A strictly positive decimal count.
fn parse_count(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|n| *n > 0)
}

/// Scores `guess` against `secret`.
///
/// Strikes count positions where both agree. Balls are counted over the
/// remaining positions only, with multiplicity: each leftover secret digit
/// can be claimed by at most one leftover guess digit.
///
/// ```rust
/// use strikeball_room::judge::score;
///
/// assert_eq!(score("1234", "1243").unwrap().to_string(), "2S2B");
/// assert_eq!(score("1123", "1231").unwrap().to_string(), "1S3B");
/// ```
///
/// # Errors
/// Returns [`JudgeError::InvalidInput`] if the lengths differ.
pub fn score(secret: &str, guess: &str) -> Result<Score, JudgeError> {
    let secret: Vec<char> = secret.chars().collect();
    let guess: Vec<char> = guess.chars().collect();
    if secret.len() != guess.len() {
        return Err(JudgeError::InvalidInput {
            secret: secret.len(),
            guess: guess.len(),
        });
    }

    let mut strikes = 0;
    let mut leftover_secret: HashMap<char, usize> = HashMap::new();
    let mut leftover_guess: HashMap<char, usize> = HashMap::new();

    for (s, g) in secret.iter().zip(&guess) {
        if s == g {
            strikes += 1;
        } else {
            *leftover_secret.entry(*s).or_default() += 1;
            *leftover_guess.entry(*g).or_default() += 1;
        }
    }

    let balls = leftover_guess
        .iter()
        .map(|(digit, n)| (*n).min(leftover_secret.get(digit).copied().unwrap_or(0)))
        .sum();

    Ok(Score { strikes, balls })
}
