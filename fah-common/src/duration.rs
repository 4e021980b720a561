//! # Daemon Durations
//!
//! Purpose: Parse the human-readable durations printed by the daemon
//! (`"1 day 2 hours"`, `"3 mins 4 secs"`, `"1.5 days"`) and the
//! `"unknowntime"` sentinel into a typed value.
//!
//! ## Design Principles
//! 1. **Pure Rewriting**: Unit words are shortened by a pure function over an
//!    immutable table; no shared replacer state.
//! 2. **Explicit Sentinel**: `unknowntime` is its own variant instead of a
//!    magic negative duration.
//! 3. **Fail Fast**: Bare numbers, bare units and repeated day sections are
//!    rejected rather than guessed.
//!
//! ## Grammar (after shortening)
//!
//! ```text
//! duration := [ <float> "d" ] { <float> <unit> }
//! unit     := "h" | "m" | "s" | "ms" | "us" | "µs" | "ns"
//! ```
//!
//! A string holding only a day section is valid; anything else needs at
//! least one `<float><unit>` pair after it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{ParseError, ParseResult};

/// Text the daemon prints when it cannot estimate a duration.
pub const UNKNOWN_TIME: &str = "unknowntime";

const SECS_PER_DAY: f64 = 86_400.0;

// Longer words come first so "days" wins over "day".
const UNIT_WORDS: [(&str, &str); 8] = [
    ("days", "d"),
    ("day", "d"),
    ("hours", "h"),
    ("hour", "h"),
    ("mins", "m"),
    ("min", "m"),
    ("secs", "s"),
    ("sec", "s"),
];

// Two-byte units come first so "ms" is not read as "m" followed by "s".
const UNIT_NANOS: [(&str, f64); 7] = [
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3_600e9),
];

/// Duration reported by the daemon, possibly unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FahDuration {
    /// The daemon printed `unknowntime`.
    Unknown,
    /// A concrete, non-negative duration.
    Known(Duration),
}

impl FahDuration {
    /// Parses daemon duration text.
    pub fn parse(text: &str) -> ParseResult<Self> {
        let shortened = abbreviate_units(text);
        if shortened == UNKNOWN_TIME {
            return Ok(FahDuration::Unknown);
        }

        let invalid = || ParseError::Duration(text.to_string());

        let (days, rest) = match shortened.find('d') {
            Some(idx) => {
                let days: f64 = shortened[..idx].parse().map_err(|_| invalid())?;
                (days, &shortened[idx + 1..])
            }
            None => (0.0, shortened.as_str()),
        };

        let total = Duration::try_from_secs_f64(days * SECS_PER_DAY).map_err(|_| invalid())?;
        if rest.is_empty() && shortened.contains('d') {
            return Ok(FahDuration::Known(total));
        }

        let clock = parse_unit_pairs(rest).ok_or_else(invalid)?;
        total
            .checked_add(clock)
            .map(FahDuration::Known)
            .ok_or_else(invalid)
    }

    /// Returns true for the `unknowntime` sentinel.
    pub fn is_unknown(&self) -> bool {
        matches!(self, FahDuration::Unknown)
    }

    /// Returns the concrete duration, if known.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            FahDuration::Unknown => None,
            FahDuration::Known(duration) => Some(*duration),
        }
    }
}

impl Default for FahDuration {
    fn default() -> Self {
        FahDuration::Known(Duration::ZERO)
    }
}

impl From<Duration> for FahDuration {
    fn from(duration: Duration) -> Self {
        FahDuration::Known(duration)
    }
}

impl FromStr for FahDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FahDuration::parse(s)
    }
}

impl fmt::Display for FahDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = match self {
            FahDuration::Unknown => return f.write_str(UNKNOWN_TIME),
            FahDuration::Known(duration) => *duration,
        };

        let secs = duration.as_secs();
        let nanos = duration.subsec_nanos();
        let (hours, mins, secs) = (secs / 3_600, (secs / 60) % 60, secs % 60);
        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || mins > 0 {
            write!(f, "{}m", mins)?;
        }
        if nanos == 0 {
            write!(f, "{}s", secs)
        } else {
            let frac = format!("{:09}", nanos);
            write!(f, "{}.{}s", secs, frac.trim_end_matches('0'))
        }
    }
}

impl<'de> Deserialize<'de> for FahDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        FahDuration::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Removes spaces and shortens unit words (`"1 day 2 hours"` -> `"1d2h"`).
pub fn abbreviate_units(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while let Some(ch) = rest.chars().next() {
        if ch == ' ' {
            rest = &rest[1..];
            continue;
        }
        for (word, short) in UNIT_WORDS {
            if let Some(tail) = rest.strip_prefix(word) {
                out.push_str(short);
                rest = tail;
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// Parses `<float><unit>` pairs, e.g. `"2h30m"` or `"1.5s"`.
///
/// A lone `"0"` is accepted as zero. Returns `None` for empty input, a
/// number without unit, or a unit without number.
fn parse_unit_pairs(text: &str) -> Option<Duration> {
    if text == "0" {
        return Some(Duration::ZERO);
    }
    if text.is_empty() {
        return None;
    }

    let mut nanos = 0f64;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let value: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let (unit, scale) = UNIT_NANOS
            .iter()
            .find(|(unit, _)| rest.starts_with(unit))?;
        nanos += value * scale;
        rest = &rest[unit.len()..];
    }

    Duration::try_from_secs_f64(nanos.round() / 1e9).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(secs: u64) -> FahDuration {
        FahDuration::Known(Duration::from_secs(secs))
    }

    #[test]
    fn shortens_unit_words() {
        assert_eq!(abbreviate_units("1 day 2 hours"), "1d2h");
        assert_eq!(abbreviate_units("3 mins 4 secs"), "3m4s");
        assert_eq!(abbreviate_units("2 days"), "2d");
    }

    #[test]
    fn parses_daemon_durations() {
        assert_eq!(FahDuration::parse("0 day").unwrap(), known(0));
        assert_eq!(FahDuration::parse("1day").unwrap(), known(86_400));
        assert_eq!(FahDuration::parse("2 days").unwrap(), known(2 * 86_400));
        assert_eq!(FahDuration::parse("1 sec").unwrap(), known(1));
        assert_eq!(FahDuration::parse("1 day 1 sec").unwrap(), known(86_401));
        assert_eq!(FahDuration::parse("1.5 days").unwrap(), known(36 * 3_600));
        assert_eq!(FahDuration::parse("4 hours 20 mins").unwrap(), known(4 * 3_600 + 20 * 60));
    }

    #[test]
    fn rejects_malformed_durations() {
        for text in ["", "1", "days", "0 day 0 day", "sec", "1 fortnight"] {
            assert!(FahDuration::parse(text).is_err(), "{:?} should fail", text);
        }
    }

    #[test]
    fn unknowntime_is_a_sentinel() {
        let unknown = FahDuration::parse("unknowntime").unwrap();
        assert!(unknown.is_unknown());
        assert_eq!(unknown.as_duration(), None);
        assert_eq!(unknown.to_string(), "unknowntime");

        let one = FahDuration::Known(Duration::from_nanos(1));
        assert!(!one.is_unknown());
        assert_ne!(one.to_string(), "unknowntime");
    }

    #[test]
    fn display_parses_back() {
        let value = known(86_401);
        assert_eq!(value.to_string(), "24h0m1s");
        assert_eq!(FahDuration::parse(&value.to_string()).unwrap(), value);
    }

    #[test]
    fn deserializes_from_json_string() {
        let value: FahDuration = serde_json::from_str("\"2 hours\"").unwrap();
        assert_eq!(value, known(7_200));
        assert!(serde_json::from_str::<FahDuration>("\"soon\"").is_err());
    }

    proptest::proptest! {
        #[test]
        fn parse_never_panics(text in "\\PC{0,32}") {
            let _ = FahDuration::parse(&text);
        }

        #[test]
        fn parse_never_panics_on_unit_soup(text in "[0-9.e+ -]{0,8}(days?|hours?|mins?|secs?|ms|us|ns|[dhms])?( ?[0-9.e+-]{0,12}[a-z ]{0,6}){0,4}") {
            let _ = FahDuration::parse(&text);
        }
    }
}
