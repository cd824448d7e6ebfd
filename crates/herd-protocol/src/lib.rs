//! Herd Protocol - the line protocol spoken by clients and herd nodes.
//!
//! Every message is one newline-terminated ASCII line, framed by
//! [`LineCodec`]. The first token picks the command; the rest are
//! positional fields.
//!
//! ```text
//! IAMAT   <client_id> <position> <posix_time>
//! WHATSAT <client_id> <radius 0-50 km> <bound 0-20>
//! AT      <origin> <±skew> <client_id> <position> <posix_time> <sender>
//! help
//! quit
//! ```
//!
//! A position is a latitude and a longitude written back to back with
//! explicit signs, e.g. `+34.068930-118.445127`.
//!
//! # Parsing
//!
//! [`Command::parse`] either yields a typed [`Command`] or a [`ParseError`]
//! that still carries the original line, so the caller can echo it back
//! verbatim. Handlers never see an invalid command.
//!
//! ```
//! use herd_protocol::Command;
//!
//! let cmd = Command::parse("IAMAT kiwi.cs.ucla.edu +34.068930-118.445127 1491161100.0").unwrap();
//! assert!(matches!(cmd, Command::IAmAt(_)));
//!
//! let err = Command::parse("WHATSAT kiwi.cs.ucla.edu 51 5").unwrap_err();
//! assert_eq!(err.line(), "WHATSAT kiwi.cs.ucla.edu 51 5");
//! ```

pub mod at;
pub mod codec;
pub mod command;
pub mod error;
pub mod position;

pub use at::AtLine;
pub use codec::{Frame, LineCodec, MAX_LINE_LENGTH};
pub use command::{Command, CommandKind, Observation};
pub use error::{ParseError, ValidationError};
pub use position::{Position, Timestamp};

/// Largest WHATSAT radius a client may ask for.
pub const MAX_RADIUS: u32 = 50;

/// Largest number of places a client may ask for.
pub const MAX_BOUND: usize = 20;

/// Reply to `help`.
pub const HELP_TEXT: &str = "Available commands:\n\
> IAMAT [client_id] [client_position] [client_time]\n\
> WHATSAT [client_id] [radius_km] [bound]\n\
> AT [server_id] [time_diff] [client_id] [client_position] [client_time]\n\
> help\n\
> quit\n\n";

/// Reply to `quit`. The transport stays open; the client closes it.
pub const QUIT_TEXT: &str = "To disconnect from the current session, use the Telnet escape\n\
character '^]' (Control-]), and then type 'quit' into the Telnet\n\
interpreter to safely close the connection.\n\n";
