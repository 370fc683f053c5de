//! Snapshot wire format.
//!
//! One JSON object with the keys `contacts`, `sms`, `callLogs`, `mediaFiles`,
//! `documents` and `deviceInfo`, in that order. Optional values are written as
//! empty strings.

use anyhow::{Context, Result};

use crate::constants::ERROR_FAILED_TO_SERIALIZE;
use crate::models::Snapshot;

pub fn to_wire_format(snapshot: &Snapshot) -> Result<String> {
    serde_json::to_string(snapshot).context(ERROR_FAILED_TO_SERIALIZE)
}

/// Indented variant, used for the local copy written next to the run summary
pub fn to_wire_format_pretty(snapshot: &Snapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot).context(ERROR_FAILED_TO_SERIALIZE)
}

pub fn from_wire_format(data: &str) -> Result<Snapshot> {
    serde_json::from_str(data).context("Failed to parse snapshot wire format")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn sample() -> Snapshot {
        Snapshot {
            contacts: vec![ContactRecord {
                name: "Ana".into(),
                phone: "010-1".into(),
                email: String::new(),
            }],
            messages: vec![MessageRecord {
                address: "555-0100".into(),
                body: "hello".into(),
                timestamp: 1_700_000_000_000,
                kind: MessageKind::Received,
            }],
            calls: vec![CallRecord::new("555-0101".into(), None, 5, 42, CallKind::Outgoing)],
            media_files: vec![MediaFileRecord {
                path: "/storage/emulated/0/DCIM/a.jpg".into(),
                name: "a.jpg".into(),
                size: 2048,
                mime_type: "image/jpeg".into(),
                date_added: 1_700_000_000,
            }],
            documents: vec![DocumentRecord {
                path: "content://media/external/downloads/3".into(),
                name: "plan.pdf".into(),
                size: 10,
                mime_type: "application/pdf".into(),
            }],
            device: DeviceInfo {
                model: "Pixel 8".into(),
                manufacturer: "Google".into(),
                android_version: "14".into(),
                sdk_version: 34,
            },
        }
    }

    #[test]
    fn test_key_order() {
        let wire = to_wire_format(&sample()).unwrap();
        let positions: Vec<usize> = ["\"contacts\"", "\"sms\"", "\"callLogs\"", "\"mediaFiles\"", "\"documents\"", "\"deviceInfo\""]
            .iter()
            .map(|key| wire.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(wire.contains("\"mimeType\":\"image/jpeg\""));
        assert!(wire.contains("\"androidVersion\":\"14\""));
        assert!(wire.contains("\"sdkVersion\":34"));
    }

    #[test]
    fn test_missing_call_name_is_empty_string() {
        let wire = to_wire_format(&sample()).unwrap();
        assert!(wire.contains(r#""callLogs":[{"number":"555-0101","name":"","date":5,"duration":42,"type":"outgoing"}]"#));
    }

    #[test]
    fn test_round_trip() {
        let snapshot = sample();
        assert_eq!(from_wire_format(&to_wire_format(&snapshot).unwrap()).unwrap(), snapshot);
        assert_eq!(from_wire_format(&to_wire_format_pretty(&snapshot).unwrap()).unwrap(), snapshot);
    }

    #[test]
    fn test_empty_snapshot_is_valid() {
        let wire = to_wire_format(&Snapshot::empty(DeviceInfo::default())).unwrap();
        assert!(wire.starts_with(r#"{"contacts":[],"sms":[],"callLogs":[],"mediaFiles":[],"documents":[]"#));
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(from_wire_format("{\"contacts\": 5}").is_err());
    }
}
