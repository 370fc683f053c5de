use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Cursor as ByteCursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info};
use walkdir::WalkDir;

use crate::sources::columns;
use crate::sources::{
    ContentResolver, Cursor, DataSource, IndexedFile, Query, Row, Selection, SourceError, Table, Value,
};
use crate::utils::mime::mime_for_extension;

/// In-memory provider tables with content resolution.
///
/// A table that was never loaded answers queries with no cursor, which the
/// collectors treat like an empty result. Tables can be marked as denied to
/// model a provider that refuses access even though the caller holds consent.
#[derive(Debug, Default)]
pub struct ProviderStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    denied: RwLock<HashSet<Table>>,
    storage_roots: Vec<PathBuf>,
}

impl ProviderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a device dump directory.
    ///
    /// Layout: `providers/<table>.json|yaml|yml` holding arrays of row objects,
    /// and an optional `storage/` directory used as the external storage root.
    /// Relative `_data` paths are resolved against the dump directory.
    pub fn from_dump_dir(dump_dir: &Path) -> Result<Self> {
        if !dump_dir.is_dir() {
            anyhow::bail!("Dump directory does not exist: {}", dump_dir.display());
        }

        let mut store = ProviderStore::new();
        let providers_dir = dump_dir.join("providers");

        for table in Table::ALL {
            if let Some(rows) = load_table(&providers_dir, table)? {
                let rows = rows
                    .into_iter()
                    .map(|row| resolve_data_path(row, dump_dir))
                    .collect::<Vec<_>>();
                debug!("Loaded {} rows into {}", rows.len(), table);
                store.insert_rows(table, rows);
            }
        }

        let storage = dump_dir.join("storage");
        if storage.is_dir() {
            store.storage_roots.push(storage);
        }

        info!("Loaded device dump from {}", dump_dir.display());
        Ok(store)
    }

    /// Add a storage root whose folders can be indexed and traversed
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_roots.push(root.into());
        self
    }

    /// Append rows to a table, creating it when missing
    pub fn insert_rows(&self, table: Table, rows: Vec<Row>) {
        if let Ok(mut tables) = self.tables.write() {
            tables.entry(table).or_default().extend(rows);
        }
    }

    /// Register the bytes served for a content URI
    pub fn insert_blob(&self, uri: &str, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(uri.to_string(), bytes.into());
        }
    }

    /// Make every query against `table` fail with a permission error
    pub fn deny(&self, table: Table) {
        if let Ok(mut denied) = self.denied.write() {
            denied.insert(table);
        }
    }

    fn read_tables(&self) -> Result<RwLockReadGuard<'_, HashMap<Table, Vec<Row>>>, SourceError> {
        self.tables
            .read()
            .map_err(|_| SourceError::Malformed("provider table lock poisoned".to_string()))
    }

    fn write_tables(&self) -> Result<RwLockWriteGuard<'_, HashMap<Table, Vec<Row>>>, SourceError> {
        self.tables
            .write()
            .map_err(|_| SourceError::Malformed("provider table lock poisoned".to_string()))
    }

    fn is_denied(&self, table: Table) -> bool {
        self.denied.read().map(|d| d.contains(&table)).unwrap_or(false)
    }

    fn primary_storage_root(&self) -> Option<&Path> {
        self.storage_roots.first().map(PathBuf::as_path)
    }
}

impl DataSource for ProviderStore {
    fn query(&self, query: &Query) -> Result<Option<Cursor>, SourceError> {
        if self.is_denied(query.table) {
            return Err(SourceError::PermissionDenied(query.table.to_string()));
        }

        let tables = self.read_tables()?;
        let Some(rows) = tables.get(&query.table) else {
            return Ok(None);
        };

        let mut matched: Vec<Row> = rows
            .iter()
            .filter(|row| query.selection.as_ref().map_or(true, |s| matches_selection(row, s)))
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| {
                let ordering = compare_column(a, b, &sort.column);
                if sort.descending { ordering.reverse() } else { ordering }
            });
        }

        Ok(Some(Cursor::new(matched)))
    }

    fn request_index(&self, folder: &str) -> Result<Vec<IndexedFile>, SourceError> {
        let root = self
            .primary_storage_root()
            .ok_or_else(|| SourceError::FolderNotFound(folder.to_string()))?;
        let dir = root.join(folder);
        if !dir.is_dir() {
            return Err(SourceError::FolderNotFound(dir.display().to_string()));
        }

        let mut tables = self.write_tables()?;
        let files = tables.entry(Table::Files).or_default();
        let known: HashSet<String> = files.iter().filter_map(|r| r.text(columns::DATA)).collect();
        let mut next_id = files.iter().filter_map(|r| r.int(columns::ID)).max().unwrap_or(0) + 1;
        let now_secs = Utc::now().timestamp();

        let mut indexed = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| SourceError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path().to_path_buf();
            let data = path.to_string_lossy().to_string();
            if known.contains(&data) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let extension = crate::utils::mime::extension_of(&name);

            let mut row = Row::new()
                .with(columns::ID, next_id)
                .with(columns::DISPLAY_NAME, name.as_str())
                .with(columns::SIZE, i64::try_from(size).unwrap_or(i64::MAX))
                .with(columns::DATE_ADDED, now_secs)
                .with(columns::DATA, data.as_str())
                .with(columns::RELATIVE_PATH, format!("{}/", folder));
            if let Some(mime) = mime_for_extension(&extension) {
                row.set(columns::MIME_TYPE, mime);
            }

            let uri = Table::Files
                .row_uri(next_id)
                .ok_or_else(|| SourceError::Malformed("files table is not addressable".to_string()))?;
            files.push(row);
            indexed.push(IndexedFile { path, uri });
            next_id += 1;
        }

        debug!("Indexed {} new files in {}", indexed.len(), dir.display());
        Ok(indexed)
    }

    fn lookup(&self, uri: &str) -> Result<Option<Row>, SourceError> {
        let (table, id) = parse_content_uri(uri).ok_or_else(|| SourceError::UnknownUri(uri.to_string()))?;
        if self.is_denied(table) {
            return Err(SourceError::PermissionDenied(table.to_string()));
        }

        let tables = self.read_tables()?;
        Ok(tables
            .get(&table)
            .and_then(|rows| rows.iter().find(|r| r.int(columns::ID) == Some(id)))
            .cloned())
    }

    fn storage_roots(&self) -> Vec<PathBuf> {
        self.storage_roots.clone()
    }
}

impl ContentResolver for ProviderStore {
    fn open(&self, uri: &str) -> io::Result<Box<dyn Read + Send>> {
        if let Some(bytes) = self.blobs.read().ok().and_then(|b| b.get(uri).cloned()) {
            return Ok(Box::new(ByteCursor::new(bytes)));
        }

        let row = self
            .lookup(uri)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("No row for {}", uri)))?;
        let data = row
            .text(columns::DATA)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("No backing file for {}", uri)))?;

        Ok(Box::new(File::open(data)?))
    }
}

/// Read one table from the providers directory, trying JSON then YAML
fn load_table(providers_dir: &Path, table: Table) -> Result<Option<Vec<Row>>> {
    let json_path = providers_dir.join(format!("{}.json", table.dump_name()));
    if json_path.is_file() {
        let content = fs::read_to_string(&json_path)
            .context(format!("Failed to read provider table: {}", json_path.display()))?;
        let rows = serde_json::from_str(&content)
            .context(format!("Failed to parse provider table: {}", json_path.display()))?;
        return Ok(Some(rows));
    }

    for ext in ["yaml", "yml"] {
        let yaml_path = providers_dir.join(format!("{}.{}", table.dump_name(), ext));
        if yaml_path.is_file() {
            let content = fs::read_to_string(&yaml_path)
                .context(format!("Failed to read provider table: {}", yaml_path.display()))?;
            let rows = serde_yaml::from_str(&content)
                .context(format!("Failed to parse provider table: {}", yaml_path.display()))?;
            return Ok(Some(rows));
        }
    }

    Ok(None)
}

/// Rewrite a relative `_data` column to an absolute path under the dump directory
fn resolve_data_path(mut row: Row, dump_dir: &Path) -> Row {
    if let Some(data) = row.text(columns::DATA) {
        let path = Path::new(&data);
        if !data.is_empty() && path.is_relative() {
            let resolved = dump_dir.join(path);
            row.set(columns::DATA, resolved.to_string_lossy().to_string());
        }
    }
    row
}

/// Split a content URI into its table and row id
fn parse_content_uri(uri: &str) -> Option<(Table, i64)> {
    let (base, id) = uri.rsplit_once('/')?;
    let id = id.parse().ok()?;
    let table = Table::ALL.into_iter().find(|t| t.content_uri() == Some(base))?;
    Some((table, id))
}

fn matches_selection(row: &Row, selection: &Selection) -> bool {
    match selection {
        Selection::Equals { column, value } => {
            let expected = match value {
                Value::Integer(n) => n.to_string(),
                Value::Text(s) => s.clone(),
                Value::Null => return row.text(column).is_none(),
            };
            row.text(column).as_deref() == Some(expected.as_str())
        }
        Selection::Like { column, pattern } => row
            .text(column)
            .map(|text| like_match(&text.to_lowercase(), &pattern.to_lowercase()))
            .unwrap_or(false),
    }
}

/// SQL LIKE semantics: `%` matches any run of characters, `_` exactly one
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '%' {
        p += 1;
    }
    p == pattern.len()
}

/// Compare two rows on a column: integers numerically, otherwise as text.
/// Rows missing the column sort before rows that have it.
fn compare_column(a: &Row, b: &Row, column: &str) -> Ordering {
    match (a.int(column), b.int(column)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.text(column).cmp(&b.text(column)),
    }
}
