//! Client error taxonomy.

use std::io;

use fah_common::ParseError;
use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not dial the daemon or read its welcome banner.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Address could not be resolved to a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Command text would break line framing.
    #[error("invalid command {0:?}: contains newline")]
    InvalidCommand(String),

    /// Command argument could break the daemon's command syntax.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The daemon closed the connection before the reply boundary.
    ///
    /// `partial` holds whatever arrived before the close. The command may
    /// have been invalid; it is never replayed.
    #[error("connection closed by daemon after {} bytes; the command might have been invalid", .partial.len())]
    Disconnected { partial: Vec<u8> },

    /// Reply did not match the literal or escaped-string grammar.
    #[error("format error: {0}")]
    Format(String),

    /// Literal body was not decodable into the requested shape.
    #[error("format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Decoded reply held text that did not parse into a typed value.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Network failure other than a clean close.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The session was closed by the caller.
    #[error("session closed")]
    Closed,
}

impl ClientError {
    /// True for errors caused by a malformed reply payload.
    pub fn is_format(&self) -> bool {
        matches!(self, ClientError::Format(_) | ClientError::Json(_))
    }

    /// True when the daemon dropped the connection mid-reply.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ClientError::Disconnected { .. })
    }
}
