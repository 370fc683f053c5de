//! Per-category record collectors.
//!
//! Each collector reads one data category through a [`DataSource`], after
//! checking the [`PermissionGate`]. Collectors are synchronous and are run on
//! the blocking pool by the aggregator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               RecordCollector               │
//! ├─────────────────────────────────────────────┤
//! │  Contacts │ Messages │ Calls │ Media │ Docs │
//! ├─────────────────────────────────────────────┤
//! │        PermissionGate  +  DataSource        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use device_exporter::collectors::{MessagesCollector, RecordCollector};
//! use device_exporter::permissions::{GrantedPermissions, Permission, PermissionGate};
//! use device_exporter::sources::ProviderStore;
//!
//! let store = Arc::new(ProviderStore::new());
//! let gate = Arc::new(PermissionGate::new(GrantedPermissions::new([Permission::ReadSms], 34)));
//!
//! let messages = MessagesCollector::new(store, gate).collect();
//! println!("Collected {} messages", messages.len());
//! ```
//!
//! [`DataSource`]: crate::sources::DataSource
//! [`PermissionGate`]: crate::permissions::PermissionGate

/// Collector trait, error type and shared query helpers
pub mod collector;

pub mod contacts;
pub mod messages;
pub mod calls;
pub mod media;

/// Multi-strategy document discovery
pub mod documents;

pub use collector::{CollectionError, RecordCollector};
pub use contacts::ContactsCollector;
pub use messages::MessagesCollector;
pub use calls::CallHistoryCollector;
pub use media::MediaCollector;
pub use documents::{DocumentCollector, DocumentStrategy};
