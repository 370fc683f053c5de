use std::sync::Arc;

use log::info;

use crate::collectors::collector::{ensure_access, open_cursor, CollectionError, RecordCollector};
use crate::constants::MAX_MESSAGES;
use crate::models::{Category, MessageKind, MessageRecord};
use crate::permissions::PermissionGate;
use crate::sources::{columns, DataSource, Query, SortOrder, Table};

/// Reads the most recent text messages, newest first.
pub struct MessagesCollector {
    source: Arc<dyn DataSource>,
    gate: Arc<PermissionGate>,
}

impl MessagesCollector {
    pub fn new(source: Arc<dyn DataSource>, gate: Arc<PermissionGate>) -> Self {
        Self { source, gate }
    }
}

impl RecordCollector for MessagesCollector {
    type Record = MessageRecord;

    fn category(&self) -> Category {
        Category::Messages
    }

    fn try_collect(&self) -> Result<Vec<MessageRecord>, CollectionError> {
        ensure_access(&self.gate, Category::Messages)?;

        let query = Query::table(Table::Sms).sorted(SortOrder::descending(columns::DATE));
        let cursor = open_cursor(self.source.as_ref(), &query, Category::Messages)?;

        let messages: Vec<MessageRecord> = cursor
            .take(MAX_MESSAGES)
            .map(|row| MessageRecord {
                address: row.text_or_default(columns::ADDRESS),
                body: row.text_or_default(columns::BODY),
                timestamp: row.int_or_zero(columns::DATE),
                kind: MessageKind::from_code(row.int_or_zero(columns::TYPE)),
            })
            .collect();

        info!("Collected {} messages", messages.len());
        Ok(messages)
    }
}
