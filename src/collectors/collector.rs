use log::{debug, warn};
use thiserror::Error;

use crate::models::Category;
use crate::permissions::{PermissionGate, PermissionTracker};
use crate::sources::{Cursor, DataSource, Query, SourceError};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("{0} is not authorized")]
    Unauthorized(Category),

    #[error("{category} source failed: {source}")]
    Source {
        category: Category,
        #[source]
        source: SourceError,
    },
}

impl CollectionError {
    pub fn category(&self) -> Category {
        match self {
            CollectionError::Unauthorized(category) => *category,
            CollectionError::Source { category, .. } => *category,
        }
    }

    /// True when the failure came from missing consent or a provider refusal,
    /// including OS-level permission errors surfaced as I/O failures
    pub fn is_authorization(&self) -> bool {
        match self {
            CollectionError::Unauthorized(_) => true,
            CollectionError::Source { source: SourceError::PermissionDenied(_), .. } => true,
            CollectionError::Source { source, .. } => PermissionTracker::is_permission_error(&source.to_string()),
        }
    }
}

/// Trait for per-category record collectors.
///
/// `try_collect` reports why nothing could be read; `collect` is the
/// infallible form used by the aggregator and always yields a sequence.
pub trait RecordCollector: Send + Sync {
    type Record: Send + 'static;

    fn category(&self) -> Category;

    fn try_collect(&self) -> Result<Vec<Self::Record>, CollectionError>;

    fn collect(&self) -> Vec<Self::Record> {
        match self.try_collect() {
            Ok(records) => records,
            Err(e @ CollectionError::Unauthorized(_)) => {
                debug!("Skipping collection: {}", e);
                Vec::new()
            }
            Err(e) => {
                warn!("Collection failed, continuing with no {} records: {}", self.category(), e);
                Vec::new()
            }
        }
    }
}

/// Fail with `Unauthorized` unless the gate allows the category
pub(crate) fn ensure_access(gate: &PermissionGate, category: Category) -> Result<(), CollectionError> {
    if gate.has_category_access(category) {
        Ok(())
    } else {
        Err(CollectionError::Unauthorized(category))
    }
}

/// Run a query, treating a missing cursor as an empty one
pub(crate) fn open_cursor(
    source: &dyn DataSource,
    query: &Query,
    category: Category,
) -> Result<Cursor, CollectionError> {
    match source.query(query) {
        Ok(Some(cursor)) => Ok(cursor),
        Ok(None) => {
            debug!("{} provider returned no cursor for {}", category, query.table);
            Ok(Cursor::new(Vec::new()))
        }
        Err(source) => Err(CollectionError::Source { category, source }),
    }
}
