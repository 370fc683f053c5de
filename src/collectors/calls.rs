use std::sync::Arc;

use log::info;

use crate::collectors::collector::{ensure_access, open_cursor, CollectionError, RecordCollector};
use crate::constants::MAX_CALLS;
use crate::models::{CallKind, CallRecord, Category};
use crate::permissions::PermissionGate;
use crate::sources::{columns, DataSource, Query, SortOrder, Table};

/// Reads the most recent call history entries, newest first.
pub struct CallHistoryCollector {
    source: Arc<dyn DataSource>,
    gate: Arc<PermissionGate>,
}

impl CallHistoryCollector {
    pub fn new(source: Arc<dyn DataSource>, gate: Arc<PermissionGate>) -> Self {
        Self { source, gate }
    }
}

impl RecordCollector for CallHistoryCollector {
    type Record = CallRecord;

    fn category(&self) -> Category {
        Category::CallHistory
    }

    fn try_collect(&self) -> Result<Vec<CallRecord>, CollectionError> {
        ensure_access(&self.gate, Category::CallHistory)?;

        let query = Query::table(Table::CallLog).sorted(SortOrder::descending(columns::DATE));
        let cursor = open_cursor(self.source.as_ref(), &query, Category::CallHistory)?;

        let calls: Vec<CallRecord> = cursor
            .take(MAX_CALLS)
            .map(|row| {
                CallRecord::new(
                    row.text_or_default(columns::NUMBER),
                    row.text(columns::CACHED_NAME),
                    row.int_or_zero(columns::DATE),
                    row.unsigned_or_zero(columns::DURATION),
                    CallKind::from_code(row.int_or_zero(columns::TYPE)),
                )
            })
            .collect();

        info!("Collected {} call history entries", calls.len());
        Ok(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{GrantedPermissions, Permission};
    use crate::sources::{ProviderStore, Row};

    fn call(number: &str, name: &str, date: i64, duration: i64, kind: i64) -> Row {
        Row::new()
            .with(columns::NUMBER, number)
            .with(columns::CACHED_NAME, name)
            .with(columns::DATE, date)
            .with(columns::DURATION, duration)
            .with(columns::TYPE, kind)
    }

    fn collector(store: ProviderStore, granted: &[Permission]) -> CallHistoryCollector {
        let gate = PermissionGate::new(GrantedPermissions::new(granted.iter().copied(), 34));
        CallHistoryCollector::new(Arc::new(store), Arc::new(gate))
    }

    #[test]
    fn test_calls_sorted_and_labelled() {
        let store = ProviderStore::new();
        store.insert_rows(
            Table::CallLog,
            vec![
                call("555-0101", "Ana", 100, 60, 1),
                call("555-0102", "", 300, 0, 3),
                call("555-0103", "Ben", 200, 12, 6),
            ],
        );

        let calls = collector(store, &[Permission::ReadCallLog]).try_collect().unwrap();
        let dates: Vec<i64> = calls.iter().map(|c| c.timestamp).collect();
        assert_eq!(dates, vec![300, 200, 100]);
        assert_eq!(calls[0].kind, CallKind::Missed);
        assert_eq!(calls[0].name(), None);
        assert_eq!(calls[1].kind, CallKind::Blocked);
        assert_eq!(calls[2].name(), Some("Ana"));
        assert_eq!(calls[2].duration, 60);
    }

    #[test]
    fn test_capped_at_limit() {
        let store = ProviderStore::new();
        store.insert_rows(
            Table::CallLog,
            (0..130).map(|i| call("555-0100", "", i, 1, 2)).collect(),
        );

        let calls = collector(store, &[Permission::ReadCallLog]).try_collect().unwrap();
        assert_eq!(calls.len(), MAX_CALLS);
    }

    #[test]
    fn test_unauthorized_is_empty() {
        let store = ProviderStore::new();
        store.insert_rows(Table::CallLog, vec![call("555-0101", "Ana", 100, 60, 1)]);
        assert!(collector(store, &[Permission::ReadContacts]).collect().is_empty());
    }
}
