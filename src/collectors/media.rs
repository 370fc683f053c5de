use std::sync::Arc;

use log::{info, warn};

use crate::collectors::collector::{ensure_access, open_cursor, CollectionError, RecordCollector};
use crate::constants::MAX_MEDIA_PER_KIND;
use crate::models::{Category, MediaFileRecord, MediaKind};
use crate::permissions::PermissionGate;
use crate::sources::{columns, DataSource, Query, Row, SortOrder, Table};

/// Reads the newest images, videos and audio files, each kind capped separately.
pub struct MediaCollector {
    source: Arc<dyn DataSource>,
    gate: Arc<PermissionGate>,
}

impl MediaCollector {
    pub fn new(source: Arc<dyn DataSource>, gate: Arc<PermissionGate>) -> Self {
        Self { source, gate }
    }

    fn table_for(kind: MediaKind) -> Table {
        match kind {
            MediaKind::Image => Table::Images,
            MediaKind::Video => Table::Video,
            MediaKind::Audio => Table::Audio,
        }
    }

    /// Collect one media stream
    pub fn collect_kind(&self, kind: MediaKind) -> Result<Vec<MediaFileRecord>, CollectionError> {
        let query = Query::table(Self::table_for(kind)).sorted(SortOrder::descending(columns::DATE_ADDED));
        let cursor = open_cursor(self.source.as_ref(), &query, Category::Media)?;

        Ok(cursor
            .take(MAX_MEDIA_PER_KIND)
            .map(|row| to_record(&row, kind))
            .collect())
    }
}

fn to_record(row: &Row, kind: MediaKind) -> MediaFileRecord {
    let mime_type = row
        .text(columns::MIME_TYPE)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| kind.default_mime().to_string());

    MediaFileRecord {
        path: row.text_or_default(columns::DATA),
        name: row.text_or_default(columns::DISPLAY_NAME),
        size: row.unsigned_or_zero(columns::SIZE),
        mime_type,
        date_added: row.int_or_zero(columns::DATE_ADDED),
    }
}

impl RecordCollector for MediaCollector {
    type Record = MediaFileRecord;

    fn category(&self) -> Category {
        Category::Media
    }

    fn try_collect(&self) -> Result<Vec<MediaFileRecord>, CollectionError> {
        ensure_access(&self.gate, Category::Media)?;

        let mut media = Vec::new();
        for kind in MediaKind::ALL {
            match self.collect_kind(kind) {
                Ok(records) => {
                    info!("Collected {} {} files", records.len(), kind);
                    media.extend(records);
                }
                Err(e) => warn!("Skipping {} files: {}", kind, e),
            }
        }

        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{GrantedPermissions, Permission};
    use crate::sources::ProviderStore;

    fn media_row(name: &str, date_added: i64, mime: Option<&str>) -> Row {
        let mut row = Row::new()
            .with(columns::DISPLAY_NAME, name)
            .with(columns::DATA, format!("/storage/emulated/0/DCIM/{}", name))
            .with(columns::SIZE, 1024)
            .with(columns::DATE_ADDED, date_added);
        if let Some(mime) = mime {
            row.set(columns::MIME_TYPE, mime);
        }
        row
    }

    fn collector(store: ProviderStore) -> MediaCollector {
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadMediaImages], 34));
        MediaCollector::new(Arc::new(store), Arc::new(gate))
    }

    #[test]
    fn test_each_kind_capped_independently() {
        let store = ProviderStore::new();
        store.insert_rows(
            Table::Images,
            (0..70).map(|i| media_row(&format!("img{}.jpg", i), i, Some("image/jpeg"))).collect(),
        );
        store.insert_rows(
            Table::Audio,
            (0..5).map(|i| media_row(&format!("clip{}.mp3", i), i, None)).collect(),
        );

        let media = collector(store).try_collect().unwrap();
        assert_eq!(media.len(), MAX_MEDIA_PER_KIND + 5);
        assert_eq!(media[0].name, "img69.jpg");
        assert!(media[MAX_MEDIA_PER_KIND..].iter().all(|m| m.mime_type == "audio/*"));
    }

    #[test]
    fn test_failing_kind_does_not_block_others() {
        let store = ProviderStore::new();
        store.insert_rows(Table::Video, vec![media_row("trip.mp4", 5, None)]);
        store.insert_rows(Table::Images, vec![media_row("cat.jpg", 1, None)]);
        store.deny(Table::Images);

        let media = collector(store).try_collect().unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].mime_type, "video/*");
    }

    #[test]
    fn test_requires_storage_access() {
        let store = ProviderStore::new();
        store.insert_rows(Table::Images, vec![media_row("cat.jpg", 1, None)]);
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadContacts], 34));
        let collector = MediaCollector::new(Arc::new(store), Arc::new(gate));
        assert!(collector.collect().is_empty());
    }
}
