//! Daemon timestamps: RFC 3339 text or the `<invalid>` sentinel.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{ParseError, ParseResult};

/// Text the daemon prints for a timestamp it does not have.
pub const INVALID_TIME: &str = "<invalid>";

/// Timestamp reported by the daemon, possibly invalid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FahTime {
    /// The daemon printed `<invalid>`.
    #[default]
    Invalid,
    /// A concrete UTC instant.
    At(DateTime<Utc>),
}

impl FahTime {
    /// Parses an RFC 3339 timestamp or the `<invalid>` sentinel.
    pub fn parse(text: &str) -> ParseResult<Self> {
        if text == INVALID_TIME {
            return Ok(FahTime::Invalid);
        }
        DateTime::parse_from_rfc3339(text)
            .map(|time| FahTime::At(time.with_timezone(&Utc)))
            .map_err(|err| ParseError::Time {
                text: text.to_string(),
                reason: err.to_string(),
            })
    }

    /// Returns true for the `<invalid>` sentinel.
    pub fn is_invalid(&self) -> bool {
        matches!(self, FahTime::Invalid)
    }

    /// Returns the instant, unless this is the `<invalid>` sentinel.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FahTime::Invalid => None,
            FahTime::At(time) => Some(*time),
        }
    }
}

impl FromStr for FahTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FahTime::parse(s)
    }
}

impl fmt::Display for FahTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FahTime::Invalid => f.write_str(INVALID_TIME),
            FahTime::At(time) => f.write_str(&time.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl<'de> Deserialize<'de> for FahTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        FahTime::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339() {
        let time = FahTime::parse("2020-04-01T12:30:00Z").unwrap();
        let expected = Utc.with_ymd_and_hms(2020, 4, 1, 12, 30, 0).unwrap();
        assert_eq!(time, FahTime::At(expected));
        assert!(!time.is_invalid());
        assert_eq!(time.to_string(), "2020-04-01T12:30:00Z");
    }

    #[test]
    fn normalizes_offsets_to_utc() {
        let time = FahTime::parse("2020-04-01T14:30:00+02:00").unwrap();
        let expected = Utc.with_ymd_and_hms(2020, 4, 1, 12, 30, 0).unwrap();
        assert_eq!(time.as_datetime(), Some(expected));
    }

    #[test]
    fn invalid_is_a_sentinel() {
        let time = FahTime::parse("<invalid>").unwrap();
        assert!(time.is_invalid());
        assert_eq!(time.as_datetime(), None);
        assert_eq!(time.to_string(), "<invalid>");
    }

    #[test]
    fn rejects_other_text() {
        assert!(FahTime::parse("yesterday").is_err());
        assert!(FahTime::parse("").is_err());
    }
}
