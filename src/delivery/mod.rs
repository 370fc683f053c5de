//! Upload of a serialized snapshot and its referenced files.
//!
//! Delivery is one multipart POST: a `data` part carrying the snapshot JSON and
//! one `files` part per attachment. Attachments are first materialized into a
//! per-run scratch directory so content URIs and plain paths are handled the
//! same way, then streamed from disk into the request body.
//!
//! ```text
//!  FileReference ──▶ ScratchDir (copy + sha256) ──▶ multipart "files" (streamed)
//!  snapshot JSON ──────────────────────────────────▶ multipart "data"
//! ```

use serde::Serialize;

use crate::models::Snapshot;

/// HTTP client and multipart assembly
pub mod client;

/// Per-run scratch space for materialized attachments
pub mod scratch;

pub use client::DeliveryClient;
pub use scratch::{purge_stale_scratch, ScratchDir, ScratchFile};

/// A file to attach, as referenced by a snapshot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// Content URI or filesystem path
    pub location: String,
    /// Display name, sent as the part file name
    pub name: String,
    /// Recorded MIME type; empty when unknown
    pub mime_type: String,
}

/// Attachments for a snapshot: every document, then every media file.
pub fn file_references(snapshot: &Snapshot) -> Vec<FileReference> {
    let documents = snapshot.documents.iter().map(|d| FileReference {
        location: d.path.clone(),
        name: d.name.clone(),
        mime_type: d.mime_type.clone(),
    });
    let media = snapshot.media_files.iter().map(|m| FileReference {
        location: m.path.clone(),
        name: m.name.clone(),
        mime_type: m.mime_type.clone(),
    });

    documents
        .chain(media)
        .filter(|r| !r.location.is_empty())
        .collect()
}

/// An attachment that made it into the upload.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub sha256: String,
}

/// Result of one delivery attempt. Delivery never returns an error; every
/// failure mode is one of these variants.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered {
        status: u16,
        attached: Vec<AttachedFile>,
        skipped: Vec<String>,
    },
    /// The endpoint is the unconfigured placeholder; nothing was sent
    SkippedPlaceholder,
    /// The server answered with a non-success status
    Rejected { status: u16, body: String },
    /// Transport failure or timeout
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. } | DeliveryOutcome::SkippedPlaceholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceInfo, DocumentRecord, MediaFileRecord};

    #[test]
    fn test_documents_come_before_media() {
        let mut snapshot = Snapshot::empty(DeviceInfo::default());
        snapshot.media_files.push(MediaFileRecord {
            path: "/sdcard/DCIM/a.jpg".into(),
            name: "a.jpg".into(),
            size: 1,
            mime_type: "image/jpeg".into(),
            date_added: 0,
        });
        snapshot.documents.push(DocumentRecord {
            path: "content://media/external/downloads/1".into(),
            name: "b.pdf".into(),
            size: 1,
            mime_type: String::new(),
        });
        snapshot.media_files.push(MediaFileRecord {
            path: String::new(),
            name: "orphan.mp3".into(),
            size: 0,
            mime_type: "audio/*".into(),
            date_added: 0,
        });

        let refs = file_references(&snapshot);
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.jpg"]);
    }

    #[test]
    fn test_outcome_success() {
        assert!(DeliveryOutcome::SkippedPlaceholder.is_success());
        assert!(!DeliveryOutcome::Rejected { status: 500, body: String::new() }.is_success());
        assert!(!DeliveryOutcome::Failed { reason: "timeout".into() }.is_success());
    }
}
