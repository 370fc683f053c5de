use anyhow::{Context, Result};
use serde_json::json;

use crate::pipeline::ExportResult;
use crate::utils::hash::sha256_bytes;

/// Create a JSON summary of an export run.
///
/// The summary is the audit record of the run: which categories the user
/// consented to, what each collector produced, which categories were filled
/// with sample data and what the delivery did.
///
/// # Example Output
///
/// ```json
/// {
///   "run_id": "550e8400-e29b-41d4-a716-446655440000",
///   "hostname": "backup-host",
///   "started_at": "2024-01-15T14:30:52Z",
///   "consent": [{"category": "contacts", "granted": true, "required": ["read_contacts"]}],
///   "outcomes": {"contacts": {"status": "collected", "count": 12}},
///   "sample_mode_substituted": [],
///   "delivery": {"result": "delivered", "status": 200, "attached": [...], "skipped": []}
/// }
/// ```
pub fn create_run_summary(hostname: &str, result: &ExportResult) -> Result<String> {
    let snapshot = &result.report.snapshot;

    let counts = json!({
        "contacts": snapshot.contacts.len(),
        "messages": snapshot.messages.len(),
        "call_history": snapshot.calls.len(),
        "media": snapshot.media_files.len(),
        "documents": snapshot.documents.len(),
    });

    let snapshot_digest = if result.serialized.is_empty() {
        None
    } else {
        Some(sha256_bytes(result.serialized.as_bytes()))
    };

    let summary = json!({
        "run_id": result.run_id.to_string(),
        "hostname": hostname,
        "started_at": result.started_at.to_rfc3339(),
        "finished_at": result.finished_at.to_rfc3339(),
        "exporter_version": env!("CARGO_PKG_VERSION"),
        "device": snapshot.device,
        "consent": result.report.consent,
        "outcomes": result.report.outcomes,
        "record_counts": counts,
        "sample_mode_substituted": result.report.substituted_categories(),
        "denied": result.denied,
        "snapshot_sha256": snapshot_digest,
        "snapshot_bytes": result.serialized.len(),
        "delivery": result.delivery,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize run summary to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AggregationReport, CategoryOutcome};
    use crate::delivery::{AttachedFile, DeliveryOutcome};
    use crate::fixtures::{FixtureProvider, SampleFixtures};
    use crate::models::{Category, DeviceInfo, Snapshot};
    use chrono::Utc;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn result(delivery: Option<DeliveryOutcome>) -> ExportResult {
        let mut snapshot = Snapshot::empty(DeviceInfo {
            model: "Pixel 8".into(),
            ..Default::default()
        });
        snapshot.contacts = SampleFixtures::now().contacts();

        let mut outcomes = BTreeMap::new();
        outcomes.insert(Category::Contacts, CategoryOutcome::Substituted { count: snapshot.contacts.len() });
        outcomes.insert(Category::Messages, CategoryOutcome::Denied);
        outcomes.insert(Category::Media, CategoryOutcome::TimedOut);

        ExportResult {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            report: AggregationReport {
                snapshot,
                outcomes,
                consent: Vec::new(),
            },
            serialized: "{}".to_string(),
            delivery,
            denied: vec![Category::Messages],
        }
    }

    #[test]
    fn test_summary_lists_substitutions_and_outcomes() {
        let json: Value = serde_json::from_str(&create_run_summary("host-a", &result(None)).unwrap()).unwrap();

        assert_eq!(json["hostname"], "host-a");
        assert_eq!(json["sample_mode_substituted"], serde_json::json!(["contacts"]));
        assert_eq!(json["outcomes"]["messages"]["status"], "denied");
        assert_eq!(json["outcomes"]["media"]["status"], "timed_out");
        assert_eq!(json["outcomes"]["contacts"]["count"], 21);
        assert_eq!(json["denied"], serde_json::json!(["messages"]));
        assert_eq!(json["device"]["model"], "Pixel 8");
        assert!(json["delivery"].is_null());
        assert_eq!(json["snapshot_sha256"], sha256_bytes(b"{}"));
    }

    #[test]
    fn test_summary_includes_delivery_outcome() {
        let delivery = DeliveryOutcome::Delivered {
            status: 200,
            attached: vec![AttachedFile {
                name: "plan.pdf".into(),
                mime_type: "application/pdf".into(),
                size: 4,
                sha256: "00".into(),
            }],
            skipped: vec!["gone.jpg".into()],
        };
        let json: Value = serde_json::from_str(&create_run_summary("host-a", &result(Some(delivery))).unwrap()).unwrap();

        assert_eq!(json["delivery"]["result"], "delivered");
        assert_eq!(json["delivery"]["attached"][0]["name"], "plan.pdf");
        assert_eq!(json["delivery"]["skipped"][0], "gone.jpg");
    }
}
