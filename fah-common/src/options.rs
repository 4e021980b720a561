//! # Daemon Options
//!
//! Purpose: Type the daemon's option table (`options -a`), which arrives as a
//! flat map of kebab-case keys to text values.
//!
//! ## Design Principles
//! 1. **Static Dispatch**: `OPTION_FIELDS` is a compile-time table of
//!    `(key, setter, getter)` entries; no runtime reflection.
//! 2. **Typed Text**: Booleans, integers and power levels keep the daemon's
//!    text encoding at the edges and a native type inside.
//! 3. **Lenient Keys, Strict Values**: Unknown keys are skipped; a known key
//!    with an unparsable value is an error naming the key.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{ParseError, ParseResult};

/// Boolean carried as `"true"` / `"false"` text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StringBool(pub bool);

impl FromStr for StringBool {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(StringBool(true)),
            "false" => Ok(StringBool(false)),
            _ => Err(ParseError::Bool(s.to_string())),
        }
    }
}

impl fmt::Display for StringBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StringBool> for bool {
    fn from(value: StringBool) -> Self {
        value.0
    }
}

impl<'de> Deserialize<'de> for StringBool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Integer carried as decimal text. Bare JSON integers are accepted too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringInt(pub i64);

impl FromStr for StringInt {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(StringInt)
            .map_err(|_| ParseError::Int(s.to_string()))
    }
}

impl fmt::Display for StringInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StringInt> for i64 {
    fn from(value: StringInt) -> Self {
        value.0
    }
}

impl<'de> Deserialize<'de> for StringInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StringIntVisitor;

        impl<'de> Visitor<'de> for StringIntVisitor {
            type Value = StringInt;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer or decimal integer text")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<StringInt, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<StringInt, E> {
                Ok(StringInt(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<StringInt, E> {
                i64::try_from(v)
                    .map(StringInt)
                    .map_err(|_| E::custom(ParseError::Int(v.to_string())))
            }
        }

        deserializer.deserialize_any(StringIntVisitor)
    }
}

/// Folding power level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Power {
    /// Not set (empty text).
    #[default]
    Unset,
    Light,
    Medium,
    Full,
}

impl Power {
    pub fn as_str(&self) -> &'static str {
        match self {
            Power::Unset => "",
            Power::Light => "LIGHT",
            Power::Medium => "MEDIUM",
            Power::Full => "FULL",
        }
    }
}

impl FromStr for Power {
    type Err = ParseError;

    /// Case-insensitive: the daemon prints `full`, the docs say `FULL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" => Ok(Power::Unset),
            "LIGHT" => Ok(Power::Light),
            "MEDIUM" => Ok(Power::Medium),
            "FULL" => Ok(Power::Full),
            _ => Err(ParseError::Power(s.to_string())),
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Power {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// A field type that can be read from and written back to option text.
pub trait OptionValue: Sized {
    fn parse_option(text: &str) -> ParseResult<Self>;
    fn render_option(&self) -> String;
}

impl OptionValue for String {
    fn parse_option(text: &str) -> ParseResult<Self> {
        Ok(text.to_string())
    }

    fn render_option(&self) -> String {
        self.clone()
    }
}

impl OptionValue for StringBool {
    fn parse_option(text: &str) -> ParseResult<Self> {
        text.parse()
    }

    fn render_option(&self) -> String {
        self.to_string()
    }
}

impl OptionValue for StringInt {
    fn parse_option(text: &str) -> ParseResult<Self> {
        text.parse()
    }

    fn render_option(&self) -> String {
        self.to_string()
    }
}

impl OptionValue for Power {
    fn parse_option(text: &str) -> ParseResult<Self> {
        text.parse()
    }

    fn render_option(&self) -> String {
        self.to_string()
    }
}

/// One row of the option table.
pub struct OptionField {
    /// Daemon option name, e.g. `"cpu-usage"`.
    pub key: &'static str,
    /// Parses `text` into the matching field of `Options`.
    pub set: fn(&mut Options, &str) -> ParseResult<()>,
    /// Renders the matching field back to daemon text.
    pub get: fn(&Options) -> String,
}

impl fmt::Debug for OptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionField").field("key", &self.key).finish()
    }
}

macro_rules! option_table {
    ($($field:ident: $ty:ty => $key:literal,)*) => {
        /// Daemon configuration as reported by `options -a`.
        ///
        /// Field names are the option keys with `-` replaced by `_`.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct Options {
            $(pub $field: $ty,)*
        }

        /// Every known option key with its setter and getter.
        pub const OPTION_FIELDS: &[OptionField] = &[
            $(OptionField {
                key: $key,
                set: |options, text| {
                    options.$field = <$ty as OptionValue>::parse_option(text)?;
                    Ok(())
                },
                get: |options| options.$field.render_option(),
            },)*
        ];
    };
}

option_table! {
    allow: String => "allow",
    capture_directory: String => "capture-directory",
    capture_on_error: StringBool => "capture-on-error",
    capture_packets: StringBool => "capture-packets",
    capture_requests: StringBool => "capture-requests",
    capture_responses: StringBool => "capture-responses",
    capture_sockets: StringBool => "capture-sockets",
    cause: String => "cause",
    certificate_file: String => "certificate-file",
    checkpoint: StringInt => "checkpoint",
    child: StringBool => "child",
    client_subtype: String => "client-subtype",
    client_threads: StringInt => "client-threads",
    client_type: String => "client-type",
    command_address: String => "command-address",
    command_allow_no_pass: String => "command-allow-no-pass",
    deny: String => "deny",
    command_deny_no_pass: String => "command-deny-no-pass",
    command_enable: StringBool => "command-enable",
    command_port: StringInt => "command-port",
    config_rotate: StringBool => "config-rotate",
    config_rotate_dir: String => "config-rotate-dir",
    config_rotate_max: StringInt => "config-rotate-max",
    connection_timeout: StringInt => "connection-timeout",
    core_priority: String => "core-priority",
    cpu_species: String => "cpu-species",
    cpu_type: String => "cpu-type",
    cpu_usage: StringInt => "cpu-usage",
    cpus: StringInt => "cpus",
    crl_file: String => "crl-file",
    cuda_index: String => "cuda-index",
    cycle_rate: StringInt => "cycle-rate",
    cycles: StringInt => "cycles",
    daemon: StringBool => "daemon",
    debug_sockets: StringBool => "debug-sockets",
    disable_sleep_when_active: StringBool => "disable-sleep-when-active",
    disable_viz: StringBool => "disable-viz",
    dump_after_deadline: StringBool => "dump-after-deadline",
    exception_locations: StringBool => "exception-locations",
    exit_when_done: StringBool => "exit-when-done",
    extra_core_args: String => "extra-core-args",
    fold_anon: StringBool => "fold-anon",
    gpu: StringBool => "gpu",
    gpu_index: String => "gpu-index",
    gpu_usage: StringInt => "gpu-usage",
    gui_enabled: StringBool => "gui-enabled",
    http_addresses: String => "http-addresses",
    https_addresses: String => "https-addresses",
    idle: StringBool => "idle",
    log: String => "log",
    log_color: StringBool => "log-color",
    log_crlf: StringBool => "log-crlf",
    log_date: StringBool => "log-date",
    log_date_periodically: StringInt => "log-date-periodically",
    log_domain: StringBool => "log-domain",
    log_domain_levels: String => "log-domain-levels",
    log_header: StringBool => "log-header",
    log_level: StringBool => "log-level",
    log_no_info_header: StringBool => "log-no-info-header",
    log_redirect: StringBool => "log-redirect",
    log_rotate: StringBool => "log-rotate",
    log_rotate_dir: String => "log-rotate-dir",
    log_rotate_max: StringInt => "log-rotate-max",
    log_short_level: StringBool => "log-short-level",
    log_simple_domains: StringBool => "log-simple-domains",
    log_thread_id: StringBool => "log-thread-id",
    log_thread_prefix: StringBool => "log-thread-prefix",
    log_time: StringBool => "log-time",
    log_to_screen: StringBool => "log-to-screen",
    log_truncate: StringBool => "log-truncate",
    machine_id: StringInt => "machine-id",
    max_connect_time: StringInt => "max-connect-time",
    max_connections: StringInt => "max-connections",
    max_packet_size: String => "max-packet-size",
    max_queue: StringInt => "max-queue",
    max_request_length: StringInt => "max-request-length",
    max_shutdown_wait: StringInt => "max-shutdown-wait",
    max_slot_errors: StringInt => "max-slot-errors",
    max_unit_errors: StringInt => "max-unit-errors",
    max_units: StringInt => "max-units",
    memory: String => "memory",
    min_connect_time: StringInt => "min-connect-time",
    next_unit_percentage: StringInt => "next-unit-percentage",
    priority: String => "priority",
    no_assembly: StringBool => "no-assembly",
    open_web_control: StringBool => "open-web-control",
    opencl_index: String => "opencl-index",
    os_species: String => "os-species",
    os_type: String => "os-type",
    passkey: String => "passkey",
    password: String => "password",
    pause_on_battery: StringBool => "pause-on-battery",
    pause_on_start: StringBool => "pause-on-start",
    paused: StringBool => "paused",
    pid: StringBool => "pid",
    pid_file: String => "pid-file",
    power: Power => "power",
    private_key_file: String => "private-key-file",
    project_key: StringInt => "project-key",
    proxy: String => "proxy",
    proxy_enable: StringBool => "proxy-enable",
    proxy_pass: String => "proxy-pass",
    proxy_user: String => "proxy-user",
    respawn: StringBool => "respawn",
    service: StringBool => "service",
    service_description: String => "service-description",
    service_restart: StringBool => "service-restart",
    service_restart_delay: StringInt => "service-restart-delay",
    session_cookie: String => "session-cookie",
    session_lifetime: StringInt => "session-lifetime",
    session_timeout: StringInt => "session-timeout",
    smp: StringBool => "smp",
    stack_traces: StringBool => "stack-traces",
    stall_detection_enabled: StringBool => "stall-detection-enabled",
    stall_percent: StringInt => "stall-percent",
    stall_timeout: StringInt => "stall-timeout",
    team: StringInt => "team",
    user: String => "user",
    verbosity: StringInt => "verbosity",
    web_allow: String => "web-allow",
    web_deny: String => "web-deny",
    web_enable: StringBool => "web-enable",
}

impl Options {
    /// Builds an `Options` from the decoded `options -a` map.
    ///
    /// Missing keys keep their default; unknown keys are skipped.
    pub fn from_map(map: &HashMap<String, String>) -> ParseResult<Self> {
        let mut options = Options::default();
        for field in OPTION_FIELDS {
            if let Some(text) = map.get(field.key) {
                (field.set)(&mut options, text).map_err(|err| err.for_field(field.key))?;
            }
        }
        for key in map.keys() {
            if find_field(key).is_none() {
                debug!(key = %key, "discarded unknown option");
            }
        }
        Ok(options)
    }

    /// Returns the daemon text for option `key`, or `None` if the key is unknown.
    pub fn get(&self, key: &str) -> Option<String> {
        find_field(key).map(|field| (field.get)(self))
    }

    /// Parses `text` into option `key`. Returns `Ok(false)` for an unknown key.
    pub fn set(&mut self, key: &str, text: &str) -> ParseResult<bool> {
        match find_field(key) {
            Some(field) => {
                (field.set)(self, text).map_err(|err| err.for_field(key))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn find_field(key: &str) -> Option<&'static OptionField> {
    OPTION_FIELDS.iter().find(|field| field.key == key)
}
