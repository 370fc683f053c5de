//! Platform content-resolution layer.
//!
//! Collectors never touch storage directly. They describe what they need as a
//! [`Query`] against a named [`Table`] and iterate the returned [`Cursor`].
//! Content URIs produced by the indexes are resolved back to byte streams
//! through [`ContentResolver`].
//!
//! ```text
//!  Collector ──query──▶ DataSource ──▶ Cursor<Row>
//!  Delivery  ──open───▶ ContentResolver ──▶ Read
//! ```

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use thiserror::Error;

/// Provider rows and column values
pub mod row;

/// In-memory provider store and device dump loader
pub mod store;

pub use row::{Row, Value};
pub use store::ProviderStore;

/// Column names shared by the provider tables.
pub mod columns {
    pub const ID: &str = "_id";
    pub const CONTACT_ID: &str = "contact_id";
    pub const DISPLAY_NAME: &str = "display_name";
    pub const NUMBER: &str = "number";
    pub const ADDRESS: &str = "address";
    pub const BODY: &str = "body";
    pub const DATE: &str = "date";
    pub const TYPE: &str = "type";
    pub const CACHED_NAME: &str = "name";
    pub const DURATION: &str = "duration";
    pub const EMAIL: &str = "data1";
    pub const SIZE: &str = "_size";
    pub const MIME_TYPE: &str = "mime_type";
    pub const DATE_ADDED: &str = "date_added";
    pub const DATA: &str = "_data";
    pub const RELATIVE_PATH: &str = "relative_path";
}

/// Provider tables a collector can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Phones,
    Emails,
    Sms,
    CallLog,
    Images,
    Video,
    Audio,
    Downloads,
    Files,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Phones,
        Table::Emails,
        Table::Sms,
        Table::CallLog,
        Table::Images,
        Table::Video,
        Table::Audio,
        Table::Downloads,
        Table::Files,
    ];

    /// File stem used for this table in a device dump
    pub fn dump_name(&self) -> &'static str {
        match self {
            Table::Phones => "phones",
            Table::Emails => "emails",
            Table::Sms => "sms",
            Table::CallLog => "call_log",
            Table::Images => "images",
            Table::Video => "video",
            Table::Audio => "audio",
            Table::Downloads => "downloads",
            Table::Files => "files",
        }
    }

    /// Base content URI for rows of this table, if its rows are addressable
    pub fn content_uri(&self) -> Option<&'static str> {
        use crate::constants::*;
        match self {
            Table::Images => Some(IMAGES_CONTENT_URI),
            Table::Video => Some(VIDEO_CONTENT_URI),
            Table::Audio => Some(AUDIO_CONTENT_URI),
            Table::Downloads => Some(DOWNLOADS_CONTENT_URI),
            Table::Files => Some(FILES_CONTENT_URI),
            _ => None,
        }
    }

    /// Content URI of the row with the given id
    pub fn row_uri(&self, id: i64) -> Option<String> {
        self.content_uri().map(|base| format!("{}/{}", base, id))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump_name())
    }
}

/// Row filter applied by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Column equals value
    Equals { column: String, value: Value },
    /// SQL-style LIKE with `%` wildcards, case-insensitive
    Like { column: String, pattern: String },
}

/// Sort key applied by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SortOrder {
    pub column: String,
    pub descending: bool,
}

impl SortOrder {
    pub fn descending(column: &str) -> Self {
        Self { column: column.to_string(), descending: true }
    }

    pub fn ascending(column: &str) -> Self {
        Self { column: column.to_string(), descending: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub selection: Option<Selection>,
    pub sort: Option<SortOrder>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self { table, selection: None, sort: None }
    }

    pub fn filter_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.selection = Some(Selection::Equals { column: column.to_string(), value: value.into() });
        self
    }

    pub fn filter_like(mut self, column: &str, pattern: &str) -> Self {
        self.selection = Some(Selection::Like { column: column.to_string(), pattern: pattern.to_string() });
        self
    }

    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Forward-only row iterator returned by a query.
#[derive(Debug)]
pub struct Cursor {
    rows: std::vec::IntoIter<Row>,
}

impl Cursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows: rows.into_iter() }
    }

    /// Rows remaining in the cursor
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next()
    }
}

/// A file picked up by an on-demand re-index of a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub uri: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("access to {0} was denied by the provider")]
    PermissionDenied(String),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("unknown content uri: {0}")]
    UnknownUri(String),

    #[error("provider data is malformed: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Queryable structured storage (contacts, messages, calls, media and file indexes).
pub trait DataSource: Send + Sync {
    /// Run a query. `Ok(None)` means the provider returned no cursor at all.
    fn query(&self, query: &Query) -> Result<Option<Cursor>, SourceError>;

    /// Ask the provider to index a folder (relative to its storage root) and
    /// return the files it newly indexed.
    fn request_index(&self, folder: &str) -> Result<Vec<IndexedFile>, SourceError>;

    /// Look up the row addressed by a content URI
    fn lookup(&self, uri: &str) -> Result<Option<Row>, SourceError>;

    /// Storage roots whose well-known folders may be traversed directly
    fn storage_roots(&self) -> Vec<PathBuf>;
}

/// Opens byte streams for content URIs.
pub trait ContentResolver: Send + Sync {
    fn open(&self, uri: &str) -> std::io::Result<Box<dyn Read + Send>>;
}

/// True when a reference is a content URI rather than a filesystem path
pub fn is_content_uri(reference: &str) -> bool {
    reference.starts_with(crate::constants::CONTENT_SCHEME)
}
