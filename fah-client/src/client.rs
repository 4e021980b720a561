//! # Command Catalogue
//!
//! Purpose: Expose the daemon's named commands as typed, blocking methods.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `FahClient` hides framing, locking and decoding.
//! 2. **Thin Call-Sites**: Each method formats one command line, runs it on
//!    the session and decodes the reply; nothing else.
//! 3. **Injection Safety**: Caller-supplied arguments are checked before they
//!    are spliced into a command line.

use std::collections::HashMap;
use std::fmt;

use fah_common::{FahDuration, Info, Options, SimulationInfo, SlotInfo, SlotQueueInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::connection::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pyon::{decode, decode_log_update};
use crate::session::Session;

/// Argument for `log-updates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogUpdates {
    Start,
    Restart,
    Stop,
}

impl LogUpdates {
    /// Argument text as the daemon expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogUpdates::Start => "start",
            LogUpdates::Restart => "restart",
            LogUpdates::Stop => "stop",
        }
    }
}

/// Typed client for the daemon's remote-control commands.
pub struct FahClient {
    session: Session,
}

impl FahClient {
    /// Connects to `addr` with default settings.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        Ok(Self::from_session(Session::connect(addr)?))
    }

    /// Connects with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self::from_session(Session::with_config(config)?))
    }

    /// Wraps an already connected session.
    pub fn from_session(session: Session) -> Self {
        FahClient { session }
    }

    /// Underlying session, for commands without a typed wrapper.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs a raw command and returns the reply as text.
    pub fn exec(&self, command: &str) -> ClientResult<String> {
        let reply = self.session.execute(command)?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Runs a raw command through `eval` and returns the reply as text.
    pub fn exec_eval(&self, command: &str) -> ClientResult<String> {
        let reply = self.session.execute_eval(command)?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Returns the daemon's command help.
    pub fn help(&self) -> ClientResult<String> {
        self.exec("help")
    }

    /// Enables or disables log streaming and returns the current log.
    ///
    /// The daemon answers `log-updates` with an empty reply and sends the
    /// log after the following prompt, so an `eval` is issued to collect it.
    pub fn log_updates(&self, arg: LogUpdates) -> ClientResult<String> {
        let command = format!("log-updates {}", arg.as_str());
        let reply = self.session.execute_then_eval(&command, "eval")?;
        decode_log_update(&reply)
    }

    /// Unpauses slots waiting for the screensaver; they pause again on disconnect.
    pub fn screensaver(&self) -> ClientResult<()> {
        self.run("screensaver")
    }

    /// Sets a slot to be always on.
    pub fn always_on(&self, slot: u32) -> ClientResult<()> {
        self.run(&format!("always_on {}", slot))
    }

    /// True if the daemon has a user, team or passkey set.
    pub fn configured(&self) -> ClientResult<bool> {
        self.query("configured")
    }

    /// Runs one client cycle.
    pub fn do_cycle(&self) -> ClientResult<()> {
        self.run("do-cycle")
    }

    /// Downloads a folding core of `core_type` from `url`.
    pub fn download_core(&self, core_type: &str, url: &str) -> ClientResult<()> {
        check_argument("core type", core_type, char::is_whitespace)?;
        check_argument("core url", url, char::is_whitespace)?;
        self.run(&format!("download-core {} {}", core_type, url))
    }

    /// Pauses a slot once its current work unit completes.
    pub fn finish(&self, slot: u32) -> ClientResult<()> {
        self.run(&format!("finish {}", slot))
    }

    /// Pauses every slot once its current work unit completes.
    pub fn finish_all(&self) -> ClientResult<()> {
        self.run("finish")
    }

    /// Returns build and host information.
    pub fn info(&self) -> ClientResult<Info> {
        let sections: Vec<Vec<Value>> = self.query("info")?;
        Ok(Info::from_sections(&sections)?)
    }

    /// Number of configured folding slots.
    pub fn num_slots(&self) -> ClientResult<u32> {
        self.query("num-slots")
    }

    /// Sets a slot to run only when the machine is idle.
    pub fn on_idle(&self, slot: u32) -> ClientResult<()> {
        self.run(&format!("on_idle {}", slot))
    }

    /// Sets every slot to run only when the machine is idle.
    pub fn on_idle_all(&self) -> ClientResult<()> {
        self.run("on_idle")
    }

    /// Returns every daemon option, including defaults.
    pub fn options_get(&self) -> ClientResult<Options> {
        let map: HashMap<String, String> = self.query("options -a")?;
        Ok(Options::from_map(&map)?)
    }

    /// Sets option `key` to `value`.
    pub fn options_set(&self, key: &str, value: impl fmt::Display) -> ClientResult<()> {
        let value = value.to_string();
        check_argument("option key", key, |c| c == '=' || c == '!' || c.is_whitespace())?;
        if key.is_empty() {
            return Err(ClientError::InvalidArgument("empty option key".to_string()));
        }
        check_argument("option value", &value, char::is_whitespace)?;
        self.run(&format!("options {}={}", key, value))
    }

    /// Pauses every slot immediately.
    pub fn pause_all(&self) -> ClientResult<()> {
        self.run("pause")
    }

    /// Pauses a slot. The daemon does not report whether the slot existed.
    pub fn pause_slot(&self, slot: u32) -> ClientResult<()> {
        self.run(&format!("pause {}", slot))
    }

    /// Total estimated points per day across slots.
    pub fn ppd(&self) -> ClientResult<f64> {
        self.query("ppd")
    }

    /// Returns the work unit queue.
    pub fn queue_info(&self) -> ClientResult<Vec<SlotQueueInfo>> {
        self.query("queue-info")
    }

    /// Requests an ID from the assignment server.
    pub fn request_id(&self) -> ClientResult<()> {
        self.run("request-id")
    }

    /// Requests work server assignment from the assignment server.
    pub fn request_ws(&self) -> ClientResult<()> {
        self.run("request-ws")
    }

    /// Stops the daemon.
    pub fn shutdown(&self) -> ClientResult<()> {
        self.run("shutdown")
    }

    /// Returns simulation progress for a slot.
    pub fn simulation_info(&self, slot: u32) -> ClientResult<SimulationInfo> {
        self.query(&format!("simulation-info {}", slot))
    }

    /// Returns status and options for every slot.
    pub fn slot_info(&self) -> ClientResult<Vec<SlotInfo>> {
        self.query("slot-info")
    }

    /// Unpauses every slot.
    pub fn unpause_all(&self) -> ClientResult<()> {
        self.run("unpause")
    }

    /// Unpauses a slot.
    pub fn unpause_slot(&self, slot: u32) -> ClientResult<()> {
        self.run(&format!("unpause {}", slot))
    }

    /// Daemon uptime. The reply is plain text, so it goes through `eval`.
    pub fn uptime(&self) -> ClientResult<FahDuration> {
        let text = self.exec_eval("uptime")?;
        Ok(FahDuration::parse(text.trim())?)
    }

    /// Blocks until every slot is paused.
    pub fn wait_for_units(&self) -> ClientResult<()> {
        self.run("wait-for-units")
    }

    /// Closes the session.
    pub fn close(&self) {
        self.session.close();
    }

    fn run(&self, command: &str) -> ClientResult<()> {
        self.session.execute(command).map(drop)
    }

    fn query<T: DeserializeOwned>(&self, command: &str) -> ClientResult<T> {
        let reply = self.session.execute(command)?;
        decode(&reply)
    }
}

fn check_argument(name: &str, text: &str, forbidden: impl Fn(char) -> bool) -> ClientResult<()> {
    match text.chars().find(|&c| forbidden(c)) {
        Some(c) => Err(ClientError::InvalidArgument(format!(
            "{} {:?} contains {:?}",
            name, text, c
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_check_names_the_offending_char() {
        let err = check_argument("option key", "power=", |c| c == '=').unwrap_err();
        match err {
            ClientError::InvalidArgument(message) => assert!(message.contains("'='")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(check_argument("option value", "LIGHT", char::is_whitespace).is_ok());
    }

    #[test]
    fn log_update_args() {
        assert_eq!(LogUpdates::Start.as_str(), "start");
        assert_eq!(LogUpdates::Restart.as_str(), "restart");
        assert_eq!(LogUpdates::Stop.as_str(), "stop");
    }
}
