//! Access codes identifying a synchronized session.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an access code in characters.
pub const CODE_LEN: usize = 6;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A short human-copyable key addressing one shared record.
///
/// Codes are fixed-length uppercase alphanumeric strings. Parsing
/// upper-cases the input, so users can type codes in either case.
/// Rotation always generates a fresh code; an invalidated code is never
/// reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessCode(String);

/// Errors from parsing an access code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessCodeError {
    /// The code has the wrong number of characters.
    #[error("access code must be {CODE_LEN} characters, got {0}")]
    WrongLength(usize),
    /// The code contains a character outside `A-Z0-9`.
    #[error("access code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

impl AccessCode {
    /// Generates a fresh random code.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code: String = (0..CODE_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        AccessCode(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccessCode {
    type Err = AccessCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper.chars().count() != CODE_LEN {
            return Err(AccessCodeError::WrongLength(upper.chars().count()));
        }
        if let Some(bad) = upper
            .chars()
            .find(|c| !c.is_ascii_uppercase() && !c.is_ascii_digit())
        {
            return Err(AccessCodeError::InvalidCharacter(bad));
        }
        Ok(AccessCode(upper))
    }
}

impl TryFrom<String> for AccessCode {
    type Error = AccessCodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AccessCode> for String {
    fn from(code: AccessCode) -> String {
        code.0
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
