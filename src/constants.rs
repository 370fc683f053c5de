//! Global constants for the device-exporter application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Collection caps
/// Maximum contact rows read per run
pub const MAX_CONTACTS: usize = 100;

/// Maximum messages collected per run
pub const MAX_MESSAGES: usize = 100;

/// Maximum call history entries collected per run
pub const MAX_CALLS: usize = 100;

/// Maximum records per media kind (image, video, audio)
pub const MAX_MEDIA_PER_KIND: usize = 50;

/// Maximum rows inspected by the broad files-index document strategy
pub const MAX_FILES_INDEX_SCAN: usize = 2000;

// Document discovery
/// Document extensions accepted by the document collector
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "txt"];

/// MIME types queried by the MIME-scoped document strategy
pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Folder holding downloaded files, relative to a storage root
pub const DOWNLOAD_FOLDER: &str = "Download";

/// Folder holding user documents, relative to a storage root
pub const DOCUMENTS_FOLDER: &str = "Documents";

// Platform levels
/// First SDK level with fine-grained media permissions
pub const FINE_GRAINED_MEDIA_SDK: u32 = 33;

/// SDK level assumed when the configuration does not state one
pub const DEFAULT_SDK_LEVEL: u32 = 34;

// Content URIs
pub const CONTENT_SCHEME: &str = "content://";
pub const DOWNLOADS_CONTENT_URI: &str = "content://media/external/downloads";
pub const FILES_CONTENT_URI: &str = "content://media/external/file";
pub const IMAGES_CONTENT_URI: &str = "content://media/external/images/media";
pub const VIDEO_CONTENT_URI: &str = "content://media/external/video/media";
pub const AUDIO_CONTENT_URI: &str = "content://media/external/audio/media";

// Delivery
/// Endpoint value that means "not configured"; delivery is skipped for it
pub const PLACEHOLDER_ENDPOINT: &str = "http://your-server.example/api/collect";

/// Multipart field carrying the serialized snapshot
pub const DATA_PART_NAME: &str = "data";

/// Multipart field carrying each attached file
pub const FILES_PART_NAME: &str = "files";

/// MIME type used when nothing better is known
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Maximum response body characters written to the log
pub const MAX_LOGGED_RESPONSE_CHARS: usize = 2048;

// Timeout constants
/// Default per-collector deadline in seconds
pub const DEFAULT_COLLECTOR_TIMEOUT_SECS: u64 = 30;

/// Default whole-request upload deadline in seconds
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

// Hashing
/// Buffer size used when hashing attachments (1MB)
pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

// Default names
pub const DEFAULT_CONFIG_NAME: &str = "export_config.yaml";
pub const DEFAULT_SNAPSHOT_NAME: &str = "snapshot.json";
pub const DEFAULT_SUMMARY_NAME: &str = "export_summary.json";
pub const SCRATCH_DIR_NAME: &str = "device-exporter-scratch";
pub const SCRATCH_FILE_PREFIX: &str = "upload";

// Error messages
pub const ERROR_FAILED_TO_READ_FILE: &str = "Failed to read file";
pub const ERROR_FAILED_TO_WRITE_FILE: &str = "Failed to write file";
pub const ERROR_FAILED_TO_SERIALIZE: &str = "Failed to serialize snapshot";
