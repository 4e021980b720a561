//! # Folding@home Remote-Control Client
//!
//! Purpose: Provide a lightweight, synchronous client for the daemon's
//! line-oriented remote-control port and decode its PyON replies.
//!
//! ## Design Principles
//! 1. **Layered**: framing, raw connection, shared session, command catalogue.
//! 2. **Serialized Access**: One command in flight per session.
//! 3. **Minimal Allocation**: Reuse buffers for request and reply framing.
//! 4. **Protocol Clarity**: Prompt-delimited replies are split explicitly.

mod client;
mod connection;
mod error;
pub mod framing;
pub mod pyon;
mod session;

pub use client::{FahClient, LogUpdates};
pub use connection::{ClientConfig, Connection, DEFAULT_ADDR, DEFAULT_PORT};
pub use error::{ClientError, ClientResult};
pub use session::Session;

pub use fah_common;
