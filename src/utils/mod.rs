//! Supporting utilities for export runs.
//!
//! ## Components
//!
//! - **MIME**: extension-based MIME type inference for attachments
//! - **Hashing**: SHA-256 digests of attachments and the serialized snapshot
//! - **Device**: device metadata from configuration with host probing
//! - **Summary**: JSON audit summary of a run
//!
//! ### Inferring an attachment type
//!
//! ```
//! use device_exporter::utils::mime::guess_mime;
//!
//! assert_eq!(guess_mime("Quarterly.XLSX"), "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
//! assert_eq!(guess_mime("blob.bin"), "application/octet-stream");
//! ```

/// Run summary generation
pub mod summary;

/// Cryptographic hash calculation utilities
pub mod hash;

/// MIME type inference from file names
pub mod mime;

/// Device metadata resolution
pub mod device;
