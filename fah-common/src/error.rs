//! Errors raised while turning daemon text into typed values.

use thiserror::Error;

/// Result alias for text parsing in this crate.
pub type ParseResult<T> = Result<T, ParseError>;

/// Failure to interpret a piece of daemon text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Duration text such as `"1 day 2 hours"` was malformed.
    #[error("invalid duration: {0:?}")]
    Duration(String),

    /// Timestamp was neither RFC 3339 nor `<invalid>`.
    #[error("invalid time {text:?}: {reason}")]
    Time { text: String, reason: String },

    /// Expected decimal integer text.
    #[error("invalid integer: {0:?}")]
    Int(String),

    /// Expected `"true"` or `"false"`.
    #[error("invalid boolean: {0:?}")]
    Bool(String),

    /// Unknown power level.
    #[error("invalid power level: {0:?}")]
    Power(String),

    /// A named option field failed to parse.
    #[error("option {key}: {source}")]
    Field {
        key: String,
        #[source]
        source: Box<ParseError>,
    },

    /// The `info` reply did not have the expected section layout.
    #[error("invalid info layout: {0}")]
    InfoLayout(String),
}

impl ParseError {
    /// Wraps `self` with the option key it belongs to.
    pub fn for_field(self, key: &str) -> Self {
        ParseError::Field {
            key: key.to_string(),
            source: Box::new(self),
        }
    }
}
