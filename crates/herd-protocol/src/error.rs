//! Error types for herd-protocol.

use thiserror::Error;

use crate::command::CommandKind;

/// A recognised command whose fields are malformed or out of range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Wrong number of fields after the keyword.
    #[error("{kind} LENGTH: expected {expected} fields, found {found}")]
    FieldCount {
        kind: CommandKind,
        expected: usize,
        found: usize,
    },

    /// Position is not two signed decimals back to back.
    #[error("{kind} GPS FORMAT: {text} is not a correctly formatted pair of coordinates")]
    PositionFormat { kind: CommandKind, text: String },

    /// Position parsed but latitude or longitude is out of range.
    #[error("{kind} GPS FORMAT: {text} are not valid coordinates per ISO 6709")]
    PositionRange { kind: CommandKind, text: String },

    /// Client time is not a finite number of seconds.
    #[error("{kind} TIME: {text} is not a valid POSIX time")]
    Time { kind: CommandKind, text: String },

    /// AT time difference is not a finite number.
    #[error("AT SKEW: {0} is not a valid time difference")]
    Skew(String),

    /// WHATSAT argument is not an integer.
    #[error("WHATSAT ARGS: {0} is not a valid integer parameter")]
    NotInteger(String),

    /// WHATSAT radius outside 0..=50.
    #[error("WHATSAT RADIUS: {0} not in valid range (0, 50)")]
    Radius(String),

    /// WHATSAT bound outside 0..=20.
    #[error("WHATSAT BOUND: {0} not in valid range (0, 20)")]
    Bound(String),
}

/// Why a line could not be turned into a [`Command`](crate::Command).
///
/// Both variants keep the line exactly as received.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// First token is not a known keyword (or the line is blank).
    #[error("unrecognized command: {line}")]
    Unrecognized { line: String },

    /// Keyword is known but a field failed validation.
    #[error("{error}")]
    Invalid {
        line: String,
        error: ValidationError,
    },
}

impl ParseError {
    /// The offending line, verbatim.
    pub fn line(&self) -> &str {
        match self {
            Self::Unrecognized { line } | Self::Invalid { line, .. } => line,
        }
    }
}
