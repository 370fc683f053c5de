//! # device-exporter
//!
//! A consent-gated export tool for device data: contacts, messages, call
//! history, media and documents are read from a device's providers, normalized
//! into one snapshot and uploaded to a backup endpoint together with the
//! referenced files.
//!
//! ## Overview
//!
//! Every category is gated by the permissions the user granted in the export
//! configuration. A category without consent is never queried; the consent
//! decision for each category is logged at the start of a run and written to
//! the run summary.
//!
//! ```text
//!  PermissionGate ─▶ collectors ─▶ Aggregator ─▶ serializer ─▶ DeliveryClient ─▶ endpoint
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use device_exporter::aggregator::Aggregator;
//! use device_exporter::models::DeviceInfo;
//! use device_exporter::permissions::{GrantedPermissions, Permission, PermissionGate};
//! use device_exporter::serializer::to_wire_format;
//! use device_exporter::sources::ProviderStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(ProviderStore::from_dump_dir(std::path::Path::new("/dumps/pixel"))?);
//! let gate = Arc::new(PermissionGate::new(GrantedPermissions::new(
//!     [Permission::ReadContacts, Permission::ReadSms],
//!     34,
//! )));
//!
//! let snapshot = Aggregator::new(store, gate, DeviceInfo::default())
//!     .build_snapshot()
//!     .await;
//! println!("{}", to_wire_format(&snapshot)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`sources`]: provider queries and content resolution
//! - [`permissions`]: consent checks per category
//! - [`collectors`]: one collector per data category
//! - [`fixtures`]: sample records for explicit sample mode
//! - [`aggregator`]: concurrent snapshot assembly
//! - [`serializer`]: snapshot wire format
//! - [`delivery`]: multipart upload of snapshot and files
//! - [`pipeline`]: background export runs
//! - [`config`]: export configuration
//! - [`utils`]: MIME inference, hashing, device metadata, run summary

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models and structures used throughout the application
pub mod models;

/// Application constants and configuration values
pub mod constants;

/// Configuration management
pub mod config;

/// Provider data access
pub mod sources;

/// Consent checks
pub mod permissions;

/// Per-category record collectors
pub mod collectors;

/// Sample records used in sample mode
pub mod fixtures;

pub mod aggregator;

pub mod serializer;

/// Snapshot upload
pub mod delivery;

pub mod pipeline;

/// Utility functions for MIME types, hashing and reporting
pub mod utils;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
