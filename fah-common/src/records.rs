//! Per-slot records returned by `queue-info`, `simulation-info` and `slot-info`.
//!
//! Missing keys take their default; string-typed numbers, durations and
//! timestamps go through the adapters in this crate.

use serde::Deserialize;
use serde_json::Value;

use crate::duration::FahDuration;
use crate::options::{StringBool, StringInt};
use crate::time::FahTime;

/// One work unit in the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlotQueueInfo {
    pub id: String,
    pub state: String,
    pub error: String,
    pub project: i64,
    pub run: i64,
    pub clone: i64,
    pub gen: i64,
    pub core: String,
    pub unit: String,
    #[serde(rename = "percentdone")]
    pub percent_done: String,
    pub eta: FahDuration,
    pub ppd: StringInt,
    #[serde(rename = "creditestimate")]
    pub credit_estimate: StringInt,
    #[serde(rename = "waitingon")]
    pub waiting_on: String,
    #[serde(rename = "nextattempt")]
    pub next_attempt: FahDuration,
    #[serde(rename = "timeremaining")]
    pub time_remaining: FahDuration,
    #[serde(rename = "totalframes")]
    pub total_frames: i64,
    #[serde(rename = "framesdone")]
    pub frames_done: i64,
    pub assigned: FahTime,
    pub timeout: FahTime,
    pub deadline: FahTime,
    pub ws: String,
    pub cs: String,
    pub attempts: i64,
    pub slot: String,
    pub tpf: FahDuration,
    #[serde(rename = "basecredit")]
    pub base_credit: StringInt,
}

/// Progress of the simulation running in one slot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationInfo {
    pub user: String,
    pub team: String,
    pub project: i64,
    pub run: i64,
    pub clone: i64,
    pub gen: i64,
    pub core_type: i64,
    pub core: String,
    pub total_iterations: i64,
    pub iterations_done: i64,
    pub energy: i64,
    pub temperature: i64,
    pub start_time: FahTime,
    pub timeout: i64,
    pub deadline: i64,
    pub eta: i64,
    pub progress: f64,
    pub slot: i64,
}

/// Status of one folding slot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlotInfo {
    pub id: String,
    pub status: String,
    pub description: String,
    pub options: serde_json::Map<String, Value>,
    pub reason: String,
    pub idle: bool,
}

/// Typed view of the options attached to a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlotOptions {
    #[serde(rename = "machine-id")]
    pub machine_id: String,
    pub paused: StringBool,
}

impl SlotInfo {
    /// Decodes the slot's option map into `SlotOptions`.
    pub fn slot_options(&self) -> serde_json::Result<SlotOptions> {
        serde_json::from_value(Value::Object(self.options.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn decodes_queue_entry() {
        let json = r#"{
            "id": "00", "state": "RUNNING", "project": 13851, "run": 0,
            "clone": 4, "gen": 7, "percentdone": "12.50%",
            "eta": "1 hours 2 mins", "ppd": "350000", "creditestimate": "9000",
            "nextattempt": "0.00 secs", "timeremaining": "unknowntime",
            "assigned": "2020-05-01T10:00:00Z", "timeout": "<invalid>",
            "deadline": "2020-05-02T10:00:00Z", "tpf": "3 mins 10 secs",
            "basecredit": "2000", "extra": 1
        }"#;
        let entry: SlotQueueInfo = serde_json::from_str(json).unwrap();
        assert_eq!(entry.project, 13851);
        assert_eq!(entry.percent_done, "12.50%");
        assert_eq!(entry.eta, FahDuration::Known(Duration::from_secs(3_720)));
        assert_eq!(entry.ppd, StringInt(350_000));
        assert!(entry.time_remaining.is_unknown());
        assert!(entry.timeout.is_invalid());
        assert!(!entry.assigned.is_invalid());
        assert_eq!(entry.tpf, FahDuration::Known(Duration::from_secs(190)));
    }

    #[test]
    fn decodes_slot_options() {
        let json = r#"{"id": "00", "status": "RUNNING", "idle": false,
            "options": {"machine-id": "0", "paused": "true", "client-type": "advanced"}}"#;
        let slot: SlotInfo = serde_json::from_str(json).unwrap();
        let options = slot.slot_options().unwrap();
        assert_eq!(options.machine_id, "0");
        assert_eq!(options.paused, StringBool(true));
    }
}
