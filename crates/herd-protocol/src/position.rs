//! Positions and client timestamps.
//!
//! Both keep the text they were parsed from: replies echo the client's own
//! spelling (`1491161100.000000000` stays nine decimals), while the parsed
//! numbers drive range checks, staleness comparison and places queries.

use std::fmt;

/// A latitude/longitude pair in ISO 6709 back-to-back form.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Degrees north, in [-90, 90]
    pub latitude: f64,
    /// Degrees east, in [-180, 180]
    pub longitude: f64,
    text: String,
}

/// Why a position string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    /// Not two `[+-]digits.digits` tokens back to back.
    Format,
    /// Well formed, but a coordinate is out of range.
    Range,
}

impl Position {
    /// Parse `+34.068930-118.445127`.
    pub fn parse(text: &str) -> Result<Self, PositionError> {
        let split = text
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '+' || c == '-')
            .map(|(i, _)| i)
            .ok_or(PositionError::Format)?;
        let (lat, lon) = text.split_at(split);

        let latitude = signed_decimal(lat).ok_or(PositionError::Format)?;
        let longitude = signed_decimal(lon).ok_or(PositionError::Format)?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(PositionError::Range);
        }

        Ok(Self {
            latitude,
            longitude,
            text: text.to_string(),
        })
    }

    /// The position exactly as the client wrote it.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parse `[+-]\d+\.\d+` exactly.
fn signed_decimal(s: &str) -> Option<f64> {
    let body = s.strip_prefix(['+', '-'])?;
    let (int, frac) = body.split_once('.')?;
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(int) || !digits(frac) {
        return None;
    }
    s.parse().ok()
}

/// POSIX seconds as supplied by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp {
    seconds: f64,
    text: String,
}

impl Timestamp {
    /// Parse a finite float. `inf` and `NaN` are not times.
    pub fn parse(text: &str) -> Option<Self> {
        let seconds: f64 = text.parse().ok()?;
        seconds.is_finite().then(|| Self {
            seconds,
            text: text.to_string(),
        })
    }

    /// Seconds since the epoch.
    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// The time exactly as the client wrote it.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ucla() {
        let pos = Position::parse("+34.068930-118.445127").unwrap();
        assert_eq!(pos.latitude, 34.068930);
        assert_eq!(pos.longitude, -118.445127);
        assert_eq!(pos.to_string(), "+34.068930-118.445127");
    }

    #[test]
    fn parses_boundaries() {
        assert!(Position::parse("+90.0+180.0").is_ok());
        assert!(Position::parse("-90.0-180.0").is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Position::parse("+91.0-118.0"), Err(PositionError::Range));
        assert_eq!(Position::parse("+34.0-180.5"), Err(PositionError::Range));
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "",
            "34.068930-118.445127",
            "+34.068930",
            "+34-118.445127",
            "+34.068930,-118.445127",
            "+34.068930-118.",
            "+34.068930-118.445127x",
            "+34.068930-118.445127+1.0",
            "++34.0-118.0",
        ] {
            assert_eq!(Position::parse(bad), Err(PositionError::Format), "{bad}");
        }
    }

    #[test]
    fn timestamp_keeps_text() {
        let t = Timestamp::parse("1491161100.000000000").unwrap();
        assert_eq!(t.seconds(), 1491161100.0);
        assert_eq!(t.to_string(), "1491161100.000000000");
    }

    #[test]
    fn timestamp_rejects_non_finite() {
        assert!(Timestamp::parse("inf").is_none());
        assert!(Timestamp::parse("NaN").is_none());
        assert!(Timestamp::parse("yesterday").is_none());
    }
}
