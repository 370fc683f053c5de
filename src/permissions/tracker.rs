//! Tracking and reporting of categories skipped for lack of authorization.

use log::warn;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::Category;

/// Categories that were not read because consent was missing or the
/// provider refused access.
#[derive(Debug, Clone, Default)]
pub struct PermissionTracker {
    denied: Arc<Mutex<BTreeSet<Category>>>,
}

impl PermissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget denials recorded by an earlier build
    pub async fn clear(&self) {
        self.denied.lock().await.clear();
    }

    pub async fn record_denied(&self, category: Category) {
        let mut denied = self.denied.lock().await;
        denied.insert(category);
    }

    /// Check if an error message indicates a permission problem
    pub fn is_permission_error(error_msg: &str) -> bool {
        let lower = error_msg.to_lowercase();
        lower.contains("permission denied")
            || lower.contains("not authorized")
            || lower.contains("was denied")
    }

    pub async fn denied_count(&self) -> usize {
        self.denied.lock().await.len()
    }

    /// Denied categories in collection order
    pub async fn denied_categories(&self) -> Vec<Category> {
        self.denied.lock().await.iter().copied().collect()
    }

    pub async fn report(&self) {
        let denied = self.denied.lock().await;
        if denied.is_empty() {
            return;
        }

        warn!(
            "{} categor{} not exported due to missing authorization:",
            denied.len(),
            if denied.len() == 1 { "y was" } else { "ies were" }
        );
        for category in denied.iter() {
            warn!("  • {}", category);
        }
        warn!("Grant the matching permissions under `consent.granted` in the export config to include them.");
    }
}
