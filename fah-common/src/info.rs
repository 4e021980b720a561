//! # Build and Host Info
//!
//! Purpose: Type the `info` reply, a list of sections where each section is
//! `[name, [key, value], [key, value], ...]`.
//!
//! ## Design Principles
//! 1. **Fixed Layout**: The first four sections must be `FAHClient`, `CBang`,
//!    `System`, `libFAH`, in that order.
//! 2. **Per-Section Tables**: Each section type owns an explicit key match;
//!    keys are compared with spaces removed (`"OS Version"` -> `OSVersion`).
//! 3. **Lenient Keys**: Unknown keys are logged and discarded.

use serde_json::Value;
use tracing::debug;

use crate::error::{ParseError, ParseResult};
use crate::options::{OptionValue, StringInt};

macro_rules! info_section {
    ($(#[$meta:meta])* $name:ident { $($field:ident: $ty:ty => $key:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl $name {
            /// Sets the field named by `key`. Returns `Ok(false)` for an unknown key.
            pub fn set(&mut self, key: &str, text: &str) -> ParseResult<bool> {
                match key.replace(' ', "").as_str() {
                    $($key => {
                        self.$field = <$ty as OptionValue>::parse_option(text)
                            .map_err(|err| err.for_field(key))?;
                    })*
                    _ => return Ok(false),
                }
                Ok(true)
            }
        }
    };
}

info_section! {
    /// Daemon build details.
    FahClientInfo {
        version: String => "Version",
        author: String => "Author",
        copyright: String => "Copyright",
        homepage: String => "Homepage",
        date: String => "Date",
        time: String => "Time",
        revision: String => "Revision",
        branch: String => "Branch",
        compiler: String => "Compiler",
        options: String => "Options",
        platform: String => "Platform",
        bits: String => "Bits",
        mode: String => "Mode",
        args: String => "Args",
        config: String => "Config",
    }
}

info_section! {
    /// Build details shared by `CBang` and `libFAH`.
    LibraryInfo {
        date: String => "Date",
        time: String => "Time",
        revision: String => "Revision",
        branch: String => "Branch",
        compiler: String => "Compiler",
        options: String => "Options",
        platform: String => "Platform",
        bits: String => "Bits",
        mode: String => "Mode",
    }
}

info_section! {
    /// Host machine details.
    SystemInfo {
        cpu: String => "CPU",
        cpu_id: String => "CPUID",
        cpus: StringInt => "CPUs",
        memory: String => "Memory",
        free_memory: String => "FreeMemory",
        threads: String => "Threads",
        os_version: String => "OSVersion",
        has_battery: String => "HasBattery",
        on_battery: String => "OnBattery",
        utc_offset: String => "UTCOffset",
        pid: String => "PID",
        cwd: String => "CWD",
        os: String => "OS",
        os_arch: String => "OSArch",
        gpus: StringInt => "GPUs",
    }
}

/// Section names, in the order the daemon sends them.
pub const INFO_SECTIONS: [&str; 4] = ["FAHClient", "CBang", "System", "libFAH"];

/// Typed `info` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub fah_client: FahClientInfo,
    pub cbang: LibraryInfo,
    pub system: SystemInfo,
    pub libfah: LibraryInfo,
    /// `GPU <n>` entries of the `System` section, in order.
    pub gpu_devices: Vec<String>,
}

impl Info {
    /// Builds an `Info` from the decoded section list.
    pub fn from_sections(sections: &[Vec<Value>]) -> ParseResult<Self> {
        if sections.len() < INFO_SECTIONS.len() {
            return Err(ParseError::InfoLayout(format!(
                "expected {} sections, got {}",
                INFO_SECTIONS.len(),
                sections.len()
            )));
        }

        let mut info = Info::default();
        for (idx, (section, expected)) in sections.iter().zip(INFO_SECTIONS).enumerate() {
            let name = section.first().and_then(Value::as_str);
            if name != Some(expected) {
                return Err(ParseError::InfoLayout(format!(
                    "section {} should be {:?}, got {:?}",
                    idx, expected, name
                )));
            }

            for entry in &section[1..] {
                let (key, text) = entry_pair(entry)?;
                let known = match idx {
                    0 => info.fah_client.set(key, &text)?,
                    1 => info.cbang.set(key, &text)?,
                    2 if is_gpu_device(key) => {
                        info.gpu_devices.push(text);
                        true
                    }
                    2 => info.system.set(key, &text)?,
                    _ => info.libfah.set(key, &text)?,
                };
                if !known {
                    debug!(section = expected, key, "discarded info field");
                }
            }
        }

        for extra in &sections[INFO_SECTIONS.len()..] {
            debug!(section = ?extra.first(), "discarded info section");
        }
        Ok(info)
    }
}

fn entry_pair(entry: &Value) -> ParseResult<(&str, String)> {
    let pair = entry
        .as_array()
        .filter(|pair| pair.len() == 2)
        .ok_or_else(|| ParseError::InfoLayout(format!("expected [key, value], got {}", entry)))?;
    let key = pair[0]
        .as_str()
        .ok_or_else(|| ParseError::InfoLayout(format!("non-text key {}", pair[0])))?;
    let text = match &pair[1] {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Ok((key, text))
}

fn is_gpu_device(key: &str) -> bool {
    key.strip_prefix("GPU ")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Vec<Value>> {
        serde_json::from_value(json!([
            ["FAHClient", ["Version", "7.6.21"], ["Mode", "Release"], ["Website", "x"]],
            ["CBang", ["Date", "Oct 20 2020"], ["Branch", "master"]],
            [
                "System",
                ["CPU", "AMD Ryzen 7"],
                ["CPUs", "16"],
                ["OS Version", "5.4"],
                ["GPUs", "1"],
                ["GPU 0", "Bus:1 Slot:0 Func:0 NVIDIA:8"]
            ],
            ["libFAH", ["Date", "Oct 20 2020"]]
        ]))
        .unwrap()
    }

    #[test]
    fn fills_sections_by_key() {
        let info = Info::from_sections(&sample()).unwrap();
        assert_eq!(info.fah_client.version, "7.6.21");
        assert_eq!(info.fah_client.mode, "Release");
        assert_eq!(info.cbang.branch, "master");
        assert_eq!(info.system.cpus, StringInt(16));
        assert_eq!(info.system.os_version, "5.4");
        assert_eq!(info.system.gpus, StringInt(1));
        assert_eq!(info.gpu_devices, vec!["Bus:1 Slot:0 Func:0 NVIDIA:8".to_string()]);
        assert_eq!(info.libfah.date, "Oct 20 2020");
    }

    #[test]
    fn rejects_wrong_layout() {
        let mut sections = sample();
        sections.swap(0, 1);
        assert!(matches!(
            Info::from_sections(&sections),
            Err(ParseError::InfoLayout(_))
        ));
        assert!(Info::from_sections(&sample()[..3]).is_err());
    }

    #[test]
    fn reports_bad_numbers_with_key() {
        let mut sections = sample();
        sections[2][2] = json!(["CPUs", "many"]);
        let err = Info::from_sections(&sections).unwrap_err();
        assert!(matches!(err, ParseError::Field { ref key, .. } if key == "CPUs"));
    }
}
