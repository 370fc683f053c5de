use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};

use crate::collectors::collector::{ensure_access, open_cursor, CollectionError, RecordCollector};
use crate::constants::MAX_CONTACTS;
use crate::models::{Category, ContactRecord};
use crate::permissions::PermissionGate;
use crate::sources::{columns, DataSource, Query, Table};

/// Reads phone entries with their first email, one record per phone number.
pub struct ContactsCollector {
    source: Arc<dyn DataSource>,
    gate: Arc<PermissionGate>,
}

impl ContactsCollector {
    pub fn new(source: Arc<dyn DataSource>, gate: Arc<PermissionGate>) -> Self {
        Self { source, gate }
    }

    fn first_email(&self, contact_id: Option<i64>) -> String {
        let Some(contact_id) = contact_id else {
            return String::new();
        };

        let query = Query::table(Table::Emails).filter_eq(columns::CONTACT_ID, contact_id);
        match self.source.query(&query) {
            Ok(Some(mut cursor)) => cursor
                .next()
                .map(|row| row.text_or_default(columns::EMAIL))
                .unwrap_or_default(),
            Ok(None) => String::new(),
            Err(e) => {
                debug!("Email lookup for contact {} failed: {}", contact_id, e);
                String::new()
            }
        }
    }
}

impl RecordCollector for ContactsCollector {
    type Record = ContactRecord;

    fn category(&self) -> Category {
        Category::Contacts
    }

    fn try_collect(&self) -> Result<Vec<ContactRecord>, CollectionError> {
        ensure_access(&self.gate, Category::Contacts)?;

        let cursor = open_cursor(self.source.as_ref(), &Query::table(Table::Phones), Category::Contacts)?;

        let mut seen = HashSet::new();
        let mut contacts = Vec::new();
        for row in cursor {
            let phone = row.text_or_default(columns::NUMBER);
            if !seen.insert(phone.clone()) {
                continue;
            }

            contacts.push(ContactRecord {
                name: row.text_or_default(columns::DISPLAY_NAME),
                email: self.first_email(row.int(columns::CONTACT_ID)),
                phone,
            });

            if contacts.len() >= MAX_CONTACTS {
                break;
            }
        }

        info!("Collected {} contacts", contacts.len());
        Ok(contacts)
    }
}
