//! Typed commands and their validators.

use std::fmt;

use crate::error::{ParseError, ValidationError};
use crate::position::{Position, PositionError, Timestamp};
use crate::{MAX_BOUND, MAX_RADIUS};

/// Keyword of a recognised command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    IAmAt,
    WhatsAt,
    At,
    Help,
    Quit,
}

impl CommandKind {
    /// Match the first token of a line.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "IAMAT" => Some(Self::IAmAt),
            "WHATSAT" => Some(Self::WhatsAt),
            "AT" => Some(Self::At),
            "help" | "HELP" => Some(Self::Help),
            "quit" | "QUIT" => Some(Self::Quit),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IAmAt => write!(f, "IAMAT"),
            Self::WhatsAt => write!(f, "WHATSAT"),
            Self::At => write!(f, "AT"),
            Self::Help => write!(f, "HELP"),
            Self::Quit => write!(f, "QUIT"),
        }
    }
}

/// A client's reported whereabouts: who, where, and when.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub client_id: String,
    pub position: Position,
    pub time: Timestamp,
}

/// A validated protocol command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A client reports its own location.
    IAmAt(Observation),
    /// A client asks for places near another client's last location.
    WhatsAt {
        client_id: String,
        radius: u32,
        bound: usize,
    },
    /// A neighbor relays a location it accepted.
    At {
        origin: String,
        skew: f64,
        observation: Observation,
        /// The node that forwarded this line to us.
        sender: String,
    },
    Help,
    Quit,
}

impl Command {
    /// Parse and validate one line (without its terminator).
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let kind = tokens
            .next()
            .and_then(CommandKind::from_keyword)
            .ok_or_else(|| ParseError::Unrecognized {
                line: line.to_string(),
            })?;
        let fields: Vec<&str> = tokens.collect();

        Self::validate(kind, &fields).map_err(|error| ParseError::Invalid {
            line: line.to_string(),
            error,
        })
    }

    /// The keyword this command was parsed from.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::IAmAt(_) => CommandKind::IAmAt,
            Self::WhatsAt { .. } => CommandKind::WhatsAt,
            Self::At { .. } => CommandKind::At,
            Self::Help => CommandKind::Help,
            Self::Quit => CommandKind::Quit,
        }
    }

    fn validate(kind: CommandKind, fields: &[&str]) -> Result<Self, ValidationError> {
        match kind {
            CommandKind::IAmAt => {
                expect_fields(kind, fields, 3)?;
                observation(kind, fields).map(Self::IAmAt)
            }
            CommandKind::WhatsAt => {
                expect_fields(kind, fields, 3)?;
                let radius = integer(fields[1])?;
                let bound = integer(fields[2])?;
                if !(0..=i64::from(MAX_RADIUS)).contains(&radius) {
                    return Err(ValidationError::Radius(fields[1].to_string()));
                }
                if !(0..=MAX_BOUND as i64).contains(&bound) {
                    return Err(ValidationError::Bound(fields[2].to_string()));
                }
                Ok(Self::WhatsAt {
                    client_id: fields[0].to_string(),
                    radius: radius as u32,
                    bound: bound as usize,
                })
            }
            CommandKind::At => {
                expect_fields(kind, fields, 6)?;
                let skew = fields[1]
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite())
                    .ok_or_else(|| ValidationError::Skew(fields[1].to_string()))?;
                Ok(Self::At {
                    origin: fields[0].to_string(),
                    skew,
                    observation: observation(kind, &fields[2..5])?,
                    sender: fields[5].to_string(),
                })
            }
            CommandKind::Help => {
                expect_fields(kind, fields, 0)?;
                Ok(Self::Help)
            }
            CommandKind::Quit => {
                expect_fields(kind, fields, 0)?;
                Ok(Self::Quit)
            }
        }
    }
}

fn expect_fields(kind: CommandKind, fields: &[&str], expected: usize) -> Result<(), ValidationError> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(ValidationError::FieldCount {
            kind,
            expected,
            found: fields.len(),
        })
    }
}

/// `<client_id> <position> <time>`, shared by IAMAT and AT.
fn observation(kind: CommandKind, fields: &[&str]) -> Result<Observation, ValidationError> {
    let position = Position::parse(fields[1]).map_err(|e| {
        let text = fields[1].to_string();
        match e {
            PositionError::Format => ValidationError::PositionFormat { kind, text },
            PositionError::Range => ValidationError::PositionRange { kind, text },
        }
    })?;
    let time = Timestamp::parse(fields[2]).ok_or_else(|| ValidationError::Time {
        kind,
        text: fields[2].to_string(),
    })?;

    Ok(Observation {
        client_id: fields[0].to_string(),
        position,
        time,
    })
}

fn integer(text: &str) -> Result<i64, ValidationError> {
    text.parse()
        .map_err(|_| ValidationError::NotInteger(text.to_string()))
}
