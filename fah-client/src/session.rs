//! # Session
//!
//! Purpose: Share one daemon connection safely and keep it alive across
//! daemon-side disconnects.
//!
//! ## Design Principles
//! 1. **One Command in Flight**: A mutex guards the whole round trip (write
//!    plus read-until-boundary), so replies always pair with their requests.
//! 2. **Reconnect, Never Replay**: When the daemon closes the stream
//!    mid-reply, the session re-dials under the same guard and still reports
//!    the failure. Retrying the command is the caller's decision.
//! 3. **No Stale Streams**: Any other transport error (a read timeout, a
//!    reset) drops the stream, since a late reply would otherwise answer the
//!    next command. The next command dials a fresh one.
//! 4. **Synchronous**: No background threads or channels; each call blocks
//!    the caller until the reply or an error arrives.
//!
//! ## State Machine
//!
//! ```text
//! Connected --(EOF mid-reply, re-dial ok)----> Connected (new stream)
//! Connected --(EOF mid-reply, re-dial fails)-> Disconnected
//! Connected --(other I/O error)--------------> Disconnected
//! Disconnected --(next command, dial ok)-----> Connected
//! any --(close)------------------------------> Closed
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::connection::{ClientConfig, Connection};
use crate::error::{ClientError, ClientResult};
use crate::framing::validate_command;

enum SessionState {
    Connected(Connection),
    Disconnected,
    Closed,
}

/// A live, shareable connection to the daemon.
///
/// `Session` is `Sync`; wrap it in an `Arc` to issue commands from several
/// threads. Commands are serialized.
pub struct Session {
    config: ClientConfig,
    state: Mutex<SessionState>,
}

impl Session {
    /// Connects to `addr` with default settings.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let config = ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        };
        Self::with_config(config)
    }

    /// Connects with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let conn = Connection::open(&config)?;
        Ok(Session {
            config,
            state: Mutex::new(SessionState::Connected(conn)),
        })
    }

    /// Sends `command` and returns the raw reply.
    ///
    /// An empty command returns an empty reply without touching the wire.
    /// A command containing a newline fails with `InvalidCommand`.
    pub fn execute(&self, command: &str) -> ClientResult<Vec<u8>> {
        self.guarded(command, |conn| conn.exec(command).map(<[u8]>::to_vec))
    }

    /// Like `execute`, but runs `command` through the daemon's `eval` so
    /// output without a trailing newline is framed correctly.
    pub fn execute_eval(&self, command: &str) -> ClientResult<Vec<u8>> {
        self.guarded(command, |conn| conn.exec_eval(command).map(<[u8]>::to_vec))
    }

    /// Sends `command`, discards its reply, then runs `eval_command` through
    /// `eval` and returns that reply, without releasing the guard in between.
    ///
    /// For commands whose real output arrives after the following prompt.
    pub(crate) fn execute_then_eval(&self, command: &str, eval_command: &str) -> ClientResult<Vec<u8>> {
        validate_command(eval_command)?;
        self.guarded(command, |conn| {
            conn.exec(command)?;
            conn.exec_eval(eval_command).map(<[u8]>::to_vec)
        })
    }

    /// Closes the connection. Further commands fail with `Closed`.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if let SessionState::Connected(conn) = &*state {
            conn.shutdown();
        }
        *state = SessionState::Closed;
    }

    /// True while a live stream is held.
    pub fn is_connected(&self) -> bool {
        matches!(*self.lock_state(), SessionState::Connected(_))
    }

    /// Address the session dials and re-dials.
    pub fn addr(&self) -> &str {
        &self.config.addr
    }

    /// Configuration used for every dial.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn guarded<F>(&self, command: &str, exec: F) -> ClientResult<Vec<u8>>
    where
        F: FnOnce(&mut Connection) -> ClientResult<Vec<u8>>,
    {
        validate_command(command)?;
        if command.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.lock_state();
        if let SessionState::Disconnected = *state {
            *state = SessionState::Connected(Connection::open(&self.config)?);
        }
        let conn = match &mut *state {
            SessionState::Connected(conn) => conn,
            _ => return Err(ClientError::Closed),
        };

        match exec(conn) {
            Ok(reply) => Ok(reply),
            Err(ClientError::Disconnected { partial }) => {
                self.reconnect(&mut state)?;
                Err(ClientError::Disconnected { partial })
            }
            Err(ClientError::Io(err)) => {
                conn.shutdown();
                *state = SessionState::Disconnected;
                warn!(addr = %self.config.addr, error = %err, "dropped connection after I/O error");
                Err(ClientError::Io(err))
            }
            Err(err) => Err(err),
        }
    }

    fn reconnect(&self, state: &mut SessionState) -> ClientResult<()> {
        if let SessionState::Connected(old) = &*state {
            old.shutdown();
        }
        *state = SessionState::Disconnected;

        match Connection::open(&self.config) {
            Ok(conn) => {
                *state = SessionState::Connected(conn);
                info!(addr = %self.config.addr, "reconnected after daemon closed the connection");
                Ok(())
            }
            Err(err) => {
                warn!(addr = %self.config.addr, error = %err, "reconnect failed");
                Err(err)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // The guarded state holds no invariant a panicking holder could break.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
