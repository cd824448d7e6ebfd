//! AT lines - the canonical report of a client's last known location.
//!
//! ```text
//! AT Alford +0.263873 kiwi.cs.ucla.edu +34.068930-118.445127 1491161100.000000000
//! ```
//!
//! Clients get this five-field form. Between nodes the same line carries
//! one more field, the forwarding node's name, which every hop replaces
//! with its own.

use std::fmt;

use crate::command::Observation;

/// A formatted AT report, as produced by one node at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct AtLine {
    /// Node that produced the line
    pub origin: String,
    /// Seconds between the client's timestamp and the node's clock
    pub skew: f64,
    pub observation: Observation,
}

impl AtLine {
    /// Stamp an observation at node `origin`, whose clock reads `now`.
    pub fn stamp(origin: impl Into<String>, observation: Observation, now: f64) -> Self {
        let skew = now - observation.time.seconds();
        Self {
            origin: origin.into(),
            skew,
            observation,
        }
    }

    /// The six-field peer form, naming `sender` as the forwarding node.
    pub fn relayed_by(&self, sender: &str) -> String {
        format!("{self} {sender}")
    }
}

impl fmt::Display for AtLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AT {} {:+.6} {} {} {}",
            self.origin,
            self.skew,
            self.observation.client_id,
            self.observation.position,
            self.observation.time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Command, Position, Timestamp};

    fn kiwi() -> Observation {
        Observation {
            client_id: "kiwi.cs.ucla.edu".into(),
            position: Position::parse("+34.068930-118.445127").unwrap(),
            time: Timestamp::parse("1491161100.000000000").unwrap(),
        }
    }

    #[test]
    fn formats_positive_skew() {
        let at = AtLine::stamp("Alford", kiwi(), 1491161100.5);
        assert_eq!(
            at.to_string(),
            "AT Alford +0.500000 kiwi.cs.ucla.edu +34.068930-118.445127 1491161100.000000000"
        );
    }

    #[test]
    fn formats_negative_skew() {
        let at = AtLine::stamp("Alford", kiwi(), 1491161099.75);
        assert!(at.to_string().starts_with("AT Alford -0.250000 "));
    }

    #[test]
    fn relayed_form_parses_back() {
        let at = AtLine::stamp("Alford", kiwi(), 1491161101.0);
        let wire = at.relayed_by("Alford");
        let Command::At {
            origin,
            observation,
            sender,
            ..
        } = Command::parse(&wire).unwrap()
        else {
            panic!("relayed line is not AT: {wire}");
        };
        assert_eq!(origin, "Alford");
        assert_eq!(sender, "Alford");
        assert_eq!(observation, kiwi());
    }
}
