//! Authorization checks per data category.
//!
//! The gate is a pure query over a [`PermissionProvider`]. It never prompts;
//! the caller is responsible for obtaining consent before a run starts.

use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SDK_LEVEL, FINE_GRAINED_MEDIA_SDK};
use crate::models::Category;

/// Tracks categories that were skipped for lack of authorization
pub mod tracker;

pub use tracker::PermissionTracker;

/// A single platform permission the user can grant.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadContacts,
    ReadSms,
    ReadCallLog,
    ReadExternalStorage,
    ReadMediaImages,
    ReadMediaVideo,
    ReadMediaAudio,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::ReadContacts,
        Permission::ReadSms,
        Permission::ReadCallLog,
        Permission::ReadExternalStorage,
        Permission::ReadMediaImages,
        Permission::ReadMediaVideo,
        Permission::ReadMediaAudio,
    ];

    /// Permissions any one of which authorizes a category at the given SDK level
    pub fn required_for(category: Category, sdk_level: u32) -> &'static [Permission] {
        match category {
            Category::Contacts => &[Permission::ReadContacts],
            Category::Messages => &[Permission::ReadSms],
            Category::CallHistory => &[Permission::ReadCallLog],
            Category::Media | Category::Documents => {
                if sdk_level >= FINE_GRAINED_MEDIA_SDK {
                    &[
                        Permission::ReadMediaImages,
                        Permission::ReadMediaVideo,
                        Permission::ReadMediaAudio,
                    ]
                } else {
                    &[Permission::ReadExternalStorage]
                }
            }
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ReadContacts => "read_contacts",
            Permission::ReadSms => "read_sms",
            Permission::ReadCallLog => "read_call_log",
            Permission::ReadExternalStorage => "read_external_storage",
            Permission::ReadMediaImages => "read_media_images",
            Permission::ReadMediaVideo => "read_media_video",
            Permission::ReadMediaAudio => "read_media_audio",
        };
        write!(f, "{}", name)
    }
}

/// Source of the current permission state.
#[cfg_attr(test, mockall::automock)]
pub trait PermissionProvider: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;

    /// Platform SDK level, which decides how storage access is checked
    fn sdk_level(&self) -> u32;
}

/// A fixed permission set, usually built from the export configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedPermissions {
    granted: BTreeSet<Permission>,
    sdk_level: u32,
}

impl GrantedPermissions {
    pub fn new(granted: impl IntoIterator<Item = Permission>, sdk_level: u32) -> Self {
        Self {
            granted: granted.into_iter().collect(),
            sdk_level,
        }
    }

    /// Nothing granted
    pub fn none() -> Self {
        Self::new([], DEFAULT_SDK_LEVEL)
    }

    /// Every permission granted
    pub fn all(sdk_level: u32) -> Self {
        Self::new(Permission::ALL, sdk_level)
    }

    pub fn granted(&self) -> impl Iterator<Item = &Permission> {
        self.granted.iter()
    }
}

impl PermissionProvider for GrantedPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    fn sdk_level(&self) -> u32 {
        self.sdk_level
    }
}

/// Outcome of the consent check for one category.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CategoryDecision {
    pub category: Category,
    pub granted: bool,
    pub required: Vec<Permission>,
}

/// Answers "may this category be read" for the collectors.
pub struct PermissionGate {
    provider: Box<dyn PermissionProvider>,
}

impl PermissionGate {
    pub fn new(provider: impl PermissionProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
        }
    }

    pub fn has_category_access(&self, category: Category) -> bool {
        let sdk_level = self.provider.sdk_level();
        Permission::required_for(category, sdk_level)
            .iter()
            .any(|p| self.provider.is_granted(*p))
    }

    /// Decide and log every category once, in collection order
    pub fn audit(&self) -> Vec<CategoryDecision> {
        let sdk_level = self.provider.sdk_level();
        info!("Consent audit (sdk level {}):", sdk_level);

        Category::ALL
            .iter()
            .map(|&category| {
                let required = Permission::required_for(category, sdk_level).to_vec();
                let granted = self.has_category_access(category);
                let names = required.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" | ");
                if granted {
                    info!("  {:<13} granted ({})", category.to_string(), names);
                } else {
                    warn!("  {:<13} not granted, will not be read ({})", category.to_string(), names);
                }
                CategoryDecision { category, granted, required }
            })
            .collect()
    }
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("sdk_level", &self.provider.sdk_level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_access_on_new_sdk_is_any_media_permission() {
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadMediaAudio], 34));
        assert!(gate.has_category_access(Category::Media));
        assert!(gate.has_category_access(Category::Documents));

        // The legacy permission no longer counts
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadExternalStorage], 33));
        assert!(!gate.has_category_access(Category::Media));
    }

    #[test]
    fn test_storage_access_on_old_sdk_uses_external_storage() {
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadExternalStorage], 30));
        assert!(gate.has_category_access(Category::Documents));

        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadMediaImages], 32));
        assert!(!gate.has_category_access(Category::Media));
    }

    #[test]
    fn test_single_permission_categories() {
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadSms], 34));
        assert!(gate.has_category_access(Category::Messages));
        assert!(!gate.has_category_access(Category::Contacts));
        assert!(!gate.has_category_access(Category::CallHistory));
    }

    #[test]
    fn test_gate_with_mock_provider() {
        let mut provider = MockPermissionProvider::new();
        provider.expect_sdk_level().return_const(34u32);
        provider
            .expect_is_granted()
            .returning(|p| p == Permission::ReadCallLog);

        let gate = PermissionGate::new(provider);
        assert!(gate.has_category_access(Category::CallHistory));
        assert!(!gate.has_category_access(Category::Media));
    }

    #[test]
    fn test_audit_reports_every_category() {
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadContacts], 34));
        let decisions = gate.audit();
        assert_eq!(decisions.len(), Category::ALL.len());
        assert!(decisions[0].granted);
        assert_eq!(decisions[0].category, Category::Contacts);
        assert!(decisions[1..].iter().all(|d| !d.granted));
        assert_eq!(decisions[3].required.len(), 3);
    }

    #[test]
    fn test_permission_names_round_trip_through_yaml() {
        let parsed: Vec<Permission> = serde_yaml::from_str("- read_contacts\n- read_media_video\n").unwrap();
        assert_eq!(parsed, vec![Permission::ReadContacts, Permission::ReadMediaVideo]);
        assert_eq!(Permission::ReadCallLog.to_string(), "read_call_log");
    }
}
