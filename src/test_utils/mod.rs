//! Test utilities shared by the unit test modules.

#![cfg(test)]

use anyhow::Result;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use crate::permissions::{GrantedPermissions, Permission, PermissionGate};

/// Gate that grants exactly `permissions` at SDK level 34
pub fn gate_with(permissions: &[Permission]) -> Arc<PermissionGate> {
    Arc::new(PermissionGate::new(GrantedPermissions::new(permissions.iter().copied(), 34)))
}

/// Write a small device dump: JSON and YAML provider tables plus a storage
/// tree with one downloaded PDF and one stray file.
pub fn create_device_dump() -> Result<TempDir> {
    let dump = TempDir::new()?;
    let providers = dump.path().join("providers");
    let download = dump.path().join("storage").join("Download");
    fs::create_dir_all(&providers)?;
    fs::create_dir_all(&download)?;

    write_json(
        &providers.join("phones.json"),
        json!([
            {"contact_id": 1, "display_name": "Ana Ruiz", "number": "555-0100"},
            {"contact_id": 1, "display_name": "Ana Ruiz", "number": "555-0100"},
            {"contact_id": 2, "display_name": "Ben Ode", "number": "555-0101"}
        ]),
    )?;
    write_json(
        &providers.join("emails.json"),
        json!([{"contact_id": 1, "data1": "ana@example.com"}]),
    )?;
    fs::write(
        providers.join("sms.yaml"),
        "- {address: 555-0100, body: see you at six, date: 1700000000000, type: 1}\n\
         - {address: 555-0101, body: on my way, date: 1700000500000, type: 2}\n",
    )?;
    write_json(
        &providers.join("downloads.json"),
        json!([
            {"_id": 7, "display_name": "lease.pdf", "_size": 9, "_data": "storage/Download/lease.pdf", "date_added": 1700000000}
        ]),
    )?;

    fs::write(download.join("lease.pdf"), b"%PDF-1.7")?;
    fs::write(download.join("setup.exe"), b"MZ")?;

    Ok(dump)
}

fn write_json(path: &Path, value: serde_json::Value) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(&value)?)?;
    Ok(())
}
