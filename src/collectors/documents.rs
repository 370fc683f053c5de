//! Document discovery.
//!
//! Documents are found through several independent strategies that all feed
//! one accumulating [`DocumentSet`]. Index-based strategies dedup by file name,
//! the filesystem strategy dedups by path. A strategy that fails is logged and
//! the coordinator moves on to the next one.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::collectors::collector::{ensure_access, CollectionError, RecordCollector};
use crate::constants::{
    DOCUMENTS_FOLDER, DOCUMENT_EXTENSIONS, DOCUMENT_MIME_TYPES, DOWNLOAD_FOLDER, MAX_FILES_INDEX_SCAN,
};
use crate::models::{Category, DocumentRecord};
use crate::permissions::PermissionGate;
use crate::sources::{columns, Cursor, DataSource, Query, Row, SortOrder, SourceError, Table};
use crate::utils::mime::{extension_of, guess_mime};

/// One way of finding documents, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStrategy {
    /// Downloads index, newest first
    DownloadsIndex,
    /// Broad files index filtered by folder, or a filename search when the index is empty
    FilesIndex,
    /// One files-index query per document MIME type
    MimeScoped,
    /// Re-index the download folder; only runs while nothing has been found
    Reindex,
    /// Direct listing of the download and documents folders
    Filesystem,
}

impl DocumentStrategy {
    pub const ALL: [DocumentStrategy; 5] = [
        DocumentStrategy::DownloadsIndex,
        DocumentStrategy::FilesIndex,
        DocumentStrategy::MimeScoped,
        DocumentStrategy::Reindex,
        DocumentStrategy::Filesystem,
    ];
}

impl fmt::Display for DocumentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentStrategy::DownloadsIndex => "downloads index",
            DocumentStrategy::FilesIndex => "files index",
            DocumentStrategy::MimeScoped => "MIME search",
            DocumentStrategy::Reindex => "re-index",
            DocumentStrategy::Filesystem => "filesystem",
        };
        write!(f, "{}", name)
    }
}

/// True for the document extensions that are exported
pub fn is_document_extension(extension: &str) -> bool {
    DOCUMENT_EXTENSIONS.iter().any(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Accumulated documents with their dedup keys.
#[derive(Debug, Default)]
pub struct DocumentSet {
    records: Vec<DocumentRecord>,
    names: HashSet<String>,
    paths: HashSet<String>,
}

impl DocumentSet {
    /// Add a record found through an index; rejected if the name is known
    pub fn push_indexed(&mut self, record: DocumentRecord) -> bool {
        if self.names.contains(&record.name) {
            return false;
        }
        self.insert(record);
        true
    }

    /// Add a record found on the filesystem; rejected if the path is known
    pub fn push_file(&mut self, record: DocumentRecord) -> bool {
        if self.paths.contains(&record.path) {
            return false;
        }
        self.insert(record);
        true
    }

    fn insert(&mut self, record: DocumentRecord) {
        self.names.insert(record.name.clone());
        self.paths.insert(record.path.clone());
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<DocumentRecord> {
        self.records
    }
}

/// Runs the discovery strategies in order against one data source.
pub struct DocumentCollector {
    source: Arc<dyn DataSource>,
    gate: Arc<PermissionGate>,
    strategies: Vec<DocumentStrategy>,
}

impl DocumentCollector {
    pub fn new(source: Arc<dyn DataSource>, gate: Arc<PermissionGate>) -> Self {
        Self::with_strategies(source, gate, DocumentStrategy::ALL.to_vec())
    }

    pub fn with_strategies(
        source: Arc<dyn DataSource>,
        gate: Arc<PermissionGate>,
        strategies: Vec<DocumentStrategy>,
    ) -> Self {
        Self { source, gate, strategies }
    }

    fn run_strategy(&self, strategy: DocumentStrategy, found: &mut DocumentSet) -> Result<usize, SourceError> {
        match strategy {
            DocumentStrategy::DownloadsIndex => self.from_downloads_index(found),
            DocumentStrategy::FilesIndex => self.from_files_index(found),
            DocumentStrategy::MimeScoped => self.from_mime_queries(found),
            DocumentStrategy::Reindex => self.from_reindex(found),
            DocumentStrategy::Filesystem => Ok(self.from_filesystem(found)),
        }
    }

    fn cursor(&self, query: &Query) -> Result<Cursor, SourceError> {
        Ok(self.source.query(query)?.unwrap_or_else(|| Cursor::new(Vec::new())))
    }

    fn from_downloads_index(&self, found: &mut DocumentSet) -> Result<usize, SourceError> {
        let query = Query::table(Table::Downloads).sorted(SortOrder::descending(columns::DATE_ADDED));
        let mut added = 0;
        for row in self.cursor(&query)? {
            if let Some(record) = indexed_record(&row, Table::Downloads, true) {
                added += usize::from(found.push_indexed(record));
            }
        }
        Ok(added)
    }

    fn from_files_index(&self, found: &mut DocumentSet) -> Result<usize, SourceError> {
        let query = Query::table(Table::Files).sorted(SortOrder::descending(columns::DATE_ADDED));
        let cursor = match self.source.query(&query)? {
            Some(cursor) => cursor,
            None => return Ok(0),
        };

        if cursor.remaining() == 0 {
            debug!("Files index is empty, searching by file name");
            return Ok(self.search_by_filename(found));
        }

        let mut added = 0;
        for row in cursor.take(MAX_FILES_INDEX_SCAN) {
            let relative = row.text_or_default(columns::RELATIVE_PATH).to_lowercase();
            let in_target_folder = relative.contains(&format!("{}/", DOWNLOAD_FOLDER.to_lowercase()))
                || relative.contains(&format!("{}/", DOCUMENTS_FOLDER.to_lowercase()));
            if !in_target_folder {
                continue;
            }
            if let Some(record) = indexed_record(&row, Table::Files, true) {
                added += usize::from(found.push_indexed(record));
            }
        }
        Ok(added)
    }

    fn search_by_filename(&self, found: &mut DocumentSet) -> usize {
        let mut added = 0;
        for ext in DOCUMENT_EXTENSIONS {
            let query = Query::table(Table::Files).filter_like(columns::DISPLAY_NAME, &format!("%.{}", ext));
            match self.cursor(&query) {
                Ok(cursor) => {
                    for row in cursor {
                        if let Some(record) = indexed_record(&row, Table::Files, false) {
                            added += usize::from(found.push_indexed(record));
                        }
                    }
                }
                Err(e) => debug!("Filename search for .{} failed: {}", ext, e),
            }
        }
        added
    }

    fn from_mime_queries(&self, found: &mut DocumentSet) -> Result<usize, SourceError> {
        let mut added = 0;
        for mime in DOCUMENT_MIME_TYPES {
            let query = Query::table(Table::Files).filter_eq(columns::MIME_TYPE, *mime);
            match self.cursor(&query) {
                Ok(cursor) => {
                    for row in cursor {
                        if let Some(record) = indexed_record(&row, Table::Files, false) {
                            added += usize::from(found.push_indexed(record));
                        }
                    }
                }
                Err(e) => debug!("MIME search for {} failed: {}", mime, e),
            }
        }
        Ok(added)
    }

    fn from_reindex(&self, found: &mut DocumentSet) -> Result<usize, SourceError> {
        if !found.is_empty() {
            debug!("Skipping re-index, {} documents already found", found.len());
            return Ok(0);
        }

        let indexed = self.source.request_index(DOWNLOAD_FOLDER)?;
        let mut added = 0;
        for file in indexed {
            let file_name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let extension = extension_of(&file_name);
            if !is_document_extension(&extension) {
                continue;
            }

            let record = match self.source.lookup(&file.uri) {
                Ok(Some(row)) => {
                    let name = row.text(columns::DISPLAY_NAME).unwrap_or_else(|| file_name.clone());
                    DocumentRecord {
                        mime_type: mime_or_guess(&row, &name),
                        size: row.unsigned_or_zero(columns::SIZE),
                        path: file.uri.clone(),
                        name,
                    }
                }
                Ok(None) | Err(_) => match file.path.metadata() {
                    Ok(meta) if meta.is_file() => DocumentRecord {
                        path: file.uri.clone(),
                        mime_type: guess_mime(&file_name).to_string(),
                        name: file_name,
                        size: meta.len(),
                    },
                    _ => {
                        debug!("Cannot read re-indexed file {}", file.path.display());
                        continue;
                    }
                },
            };
            added += usize::from(found.push_indexed(record));
        }
        Ok(added)
    }

    fn from_filesystem(&self, found: &mut DocumentSet) -> usize {
        let mut added = 0;
        for root in self.source.storage_roots() {
            for folder in [DOWNLOAD_FOLDER, DOCUMENTS_FOLDER] {
                let dir = root.join(folder);
                if !dir.is_dir() {
                    continue;
                }
                added += list_folder(&dir, found);
            }
        }
        added
    }
}

/// Add every document directly inside `dir`
fn list_folder(dir: &Path, found: &mut DocumentSet) -> usize {
    let mut added = 0;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Cannot read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !is_document_extension(&extension_of(&name)) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let record = DocumentRecord {
            path: entry.path().to_string_lossy().to_string(),
            mime_type: guess_mime(&name).to_string(),
            name,
            size,
        };
        added += usize::from(found.push_file(record));
    }
    added
}

fn mime_or_guess(row: &Row, name: &str) -> String {
    row.text(columns::MIME_TYPE)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| guess_mime(name).to_string())
}

/// Build a record addressed by content URI from an index row.
/// With `check_extension`, rows outside the document allow-list are dropped.
fn indexed_record(row: &Row, table: Table, check_extension: bool) -> Option<DocumentRecord> {
    let name = row.text_or_default(columns::DISPLAY_NAME);
    if check_extension && !is_document_extension(&extension_of(&name)) {
        return None;
    }
    let path = table.row_uri(row.int_or_zero(columns::ID))?;

    Some(DocumentRecord {
        path,
        mime_type: mime_or_guess(row, &name),
        size: row.unsigned_or_zero(columns::SIZE),
        name,
    })
}

impl RecordCollector for DocumentCollector {
    type Record = DocumentRecord;

    fn category(&self) -> Category {
        Category::Documents
    }

    fn try_collect(&self) -> Result<Vec<DocumentRecord>, CollectionError> {
        ensure_access(&self.gate, Category::Documents)?;

        let mut found = DocumentSet::default();
        for strategy in &self.strategies {
            match self.run_strategy(*strategy, &mut found) {
                Ok(added) => debug!("Document strategy '{}' added {} documents", strategy, added),
                Err(e) => warn!("Document strategy '{}' failed: {}", strategy, e),
            }
        }

        info!("Collected {} documents", found.len());
        Ok(found.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{GrantedPermissions, Permission};
    use crate::sources::ProviderStore;
    use std::fs;
    use tempfile::TempDir;

    fn index_row(id: i64, name: &str, relative_path: &str, mime: &str) -> Row {
        Row::new()
            .with(columns::ID, id)
            .with(columns::DISPLAY_NAME, name)
            .with(columns::SIZE, 10)
            .with(columns::MIME_TYPE, mime)
            .with(columns::DATE_ADDED, id)
            .with(columns::RELATIVE_PATH, relative_path)
    }

    fn collector(store: ProviderStore, strategies: Vec<DocumentStrategy>) -> DocumentCollector {
        let gate = PermissionGate::new(GrantedPermissions::all(34));
        DocumentCollector::with_strategies(Arc::new(store), Arc::new(gate), strategies)
    }

    #[test]
    fn test_downloads_index_filters_extensions_and_infers_mime() {
        let store = ProviderStore::new();
        store.insert_rows(
            Table::Downloads,
            vec![
                index_row(1, "plan.PDF", "Download/", ""),
                index_row(2, "song.mp3", "Download/", "audio/mpeg"),
                index_row(3, "budget.xlsx", "Download/", ""),
            ],
        );

        let docs = collector(store, vec![DocumentStrategy::DownloadsIndex]).try_collect().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "budget.xlsx");
        assert_eq!(docs[0].path, "content://media/external/downloads/3");
        assert_eq!(docs[1].mime_type, "application/pdf");
    }

    #[test]
    fn test_files_index_keeps_target_folders_only() {
        let store = ProviderStore::new();
        store.insert_rows(
            Table::Files,
            vec![
                index_row(1, "a.txt", "Documents/notes/", "text/plain"),
                index_row(2, "b.txt", "DCIM/", "text/plain"),
                index_row(3, "c.doc", "download/", ""),
            ],
        );

        let docs = collector(store, vec![DocumentStrategy::FilesIndex]).try_collect().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["c.doc", "a.txt"]);
    }

    #[test]
    fn test_names_dedup_across_index_strategies() {
        let store = ProviderStore::new();
        store.insert_rows(Table::Downloads, vec![index_row(1, "report.pdf", "Download/", "application/pdf")]);
        store.insert_rows(Table::Files, vec![index_row(9, "report.pdf", "Download/", "application/pdf")]);

        let docs = collector(
            store,
            vec![DocumentStrategy::DownloadsIndex, DocumentStrategy::FilesIndex, DocumentStrategy::MimeScoped],
        )
        .try_collect()
        .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path, "content://media/external/downloads/1");
    }

    #[test]
    fn test_failed_strategy_does_not_stop_others() {
        let store = ProviderStore::new();
        store.insert_rows(Table::Files, vec![index_row(4, "memo.txt", "Documents/", "text/plain")]);
        store.insert_rows(Table::Downloads, vec![index_row(1, "x.pdf", "Download/", "")]);
        store.deny(Table::Downloads);

        let docs = collector(store, DocumentStrategy::ALL.to_vec()).try_collect().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "memo.txt");
    }

    #[test]
    fn test_reindex_and_filesystem_when_indexes_are_empty() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("Download")).unwrap();
        fs::create_dir_all(root.path().join("Documents/nested")).unwrap();
        fs::write(root.path().join("Download/lease.pdf"), b"%PDF-1.7").unwrap();
        fs::write(root.path().join("Download/photo.png"), b"png").unwrap();
        fs::write(root.path().join("Documents/cv.docx"), b"docx").unwrap();
        fs::write(root.path().join("Documents/nested/deep.txt"), b"deep").unwrap();

        let store = ProviderStore::new().with_storage_root(root.path());
        let docs = collector(store, DocumentStrategy::ALL.to_vec()).try_collect().unwrap();

        // lease.pdf via re-index (content URI) and again via the filesystem (path)
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.iter().filter(|n| **n == "lease.pdf").count(), 2);
        assert!(names.contains(&"cv.docx"));
        assert!(!names.contains(&"deep.txt"));
        assert!(!names.contains(&"photo.png"));
        assert!(docs[0].path.starts_with("content://"));
        assert_eq!(docs[0].size, 8);
    }

    #[test]
    fn test_reindex_skipped_when_documents_found() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("Download")).unwrap();
        fs::write(root.path().join("Download/late.pdf"), b"%PDF").unwrap();

        let store = ProviderStore::new().with_storage_root(root.path());
        store.insert_rows(Table::Downloads, vec![index_row(1, "early.pdf", "Download/", "")]);

        let docs = collector(store, vec![DocumentStrategy::DownloadsIndex, DocumentStrategy::Reindex])
            .try_collect()
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "early.pdf");
    }

    #[test]
    fn test_empty_files_index_yields_nothing() {
        let store = ProviderStore::new();
        store.insert_rows(Table::Files, Vec::new());

        let docs = collector(store, vec![DocumentStrategy::FilesIndex]).try_collect().unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_requires_storage_access() {
        let gate = PermissionGate::new(GrantedPermissions::new([Permission::ReadExternalStorage], 34));
        let store = ProviderStore::new();
        store.insert_rows(Table::Downloads, vec![index_row(1, "a.pdf", "Download/", "")]);
        let collector = DocumentCollector::new(Arc::new(store), Arc::new(gate));
        assert!(collector.collect().is_empty());
    }
}
