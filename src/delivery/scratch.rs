use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::constants::SCRATCH_FILE_PREFIX;
use crate::sources::{is_content_uri, ContentResolver};
use crate::utils::hash::copy_with_sha256;

/// A materialized attachment on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchFile {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// Scratch directory for one delivery run, removed when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    next_index: usize,
}

impl ScratchDir {
    /// Create `<root>/<run-id>`
    pub fn create(root: &Path) -> Result<Self> {
        let path = root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&path)
            .context(format!("Failed to create scratch directory: {}", path.display()))?;
        debug!("Created scratch directory {}", path.display());
        Ok(Self { path, next_index: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the referenced content into a new scratch file, hashing it in
    /// the same pass.
    ///
    /// Content URIs are opened through the resolver; anything else is treated
    /// as a filesystem path and must exist as a regular file.
    pub fn materialize(&mut self, location: &str, name: &str, resolver: &dyn ContentResolver) -> io::Result<ScratchFile> {
        let reader: Box<dyn Read + Send> = if is_content_uri(location) {
            resolver.open(location)?
        } else {
            let source = Path::new(location);
            if !source.is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("File does not exist: {}", location),
                ));
            }
            Box::new(File::open(source)?)
        };

        let path = self.next_file_path(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        let (size, sha256) = copy_with_sha256(reader, &mut writer)?;
        writer.flush()?;

        Ok(ScratchFile { path, size, sha256 })
    }

    fn next_file_path(&mut self, name: &str) -> PathBuf {
        let safe_name: String = name
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
            .collect();
        let file_name = format!("{}_{}_{}", SCRATCH_FILE_PREFIX, self.next_index, safe_name);
        self.next_index += 1;
        self.path.join(file_name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch directory {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch directory {}: {}", self.path.display(), e),
        }
    }
}

/// Remove run directories left behind by earlier, interrupted runs.
/// Returns the number of directories removed.
pub fn purge_stale_scratch(root: &Path) -> Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(root).context(format!("Failed to read scratch root: {}", root.display()))? {
        let entry = entry?;
        let path = entry.path();
        let is_run_dir = path.is_dir()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| Uuid::parse_str(n).is_ok());
        if !is_run_dir {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove stale scratch directory {}: {}", path.display(), e),
        }
    }

    if removed > 0 {
        info!("Removed {} stale scratch director{}", removed, if removed == 1 { "y" } else { "ies" });
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ProviderStore, Row, Table};
    use crate::utils::hash::sha256_bytes;
    use tempfile::TempDir;

    #[test]
    fn test_scratch_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path()).unwrap();
            assert!(scratch.path().is_dir());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_materialize_content_uri_and_path() {
        let root = TempDir::new().unwrap();
        let source_file = root.path().join("notes.txt");
        fs::write(&source_file, b"plain file").unwrap();

        let store = ProviderStore::new();
        store.insert_rows(Table::Downloads, vec![Row::new().with("_id", 4)]);
        store.insert_blob("content://media/external/downloads/4", b"from resolver".to_vec());

        let mut scratch = ScratchDir::create(root.path()).unwrap();
        let first = scratch
            .materialize("content://media/external/downloads/4", "a/b.pdf", &store)
            .unwrap();
        let second = scratch
            .materialize(source_file.to_str().unwrap(), "notes.txt", &store)
            .unwrap();

        assert!(first.path.starts_with(scratch.path()));
        assert!(first.path.file_name().unwrap().to_str().unwrap().ends_with("a_b.pdf"));
        let mut content = String::new();
        File::open(&first.path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "from resolver");
        assert_eq!(first.size, 13);
        assert_eq!(first.sha256, sha256_bytes(b"from resolver"));
        assert_eq!(fs::read(&second.path).unwrap(), b"plain file");
        assert_eq!(second.sha256, sha256_bytes(b"plain file"));
    }

    #[test]
    fn test_materialize_missing_file_fails() {
        let root = TempDir::new().unwrap();
        let mut scratch = ScratchDir::create(root.path()).unwrap();
        let store = ProviderStore::new();
        assert!(scratch.materialize("/no/such/file.pdf", "file.pdf", &store).is_err());
        assert!(scratch
            .materialize("content://media/external/downloads/99", "x.pdf", &store)
            .is_err());
    }

    #[test]
    fn test_purge_only_removes_run_directories() {
        let root = TempDir::new().unwrap();
        let stale = root.path().join(Uuid::new_v4().to_string());
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("upload_0_a.pdf"), b"x").unwrap();
        fs::create_dir_all(root.path().join("keep-me")).unwrap();

        assert_eq!(purge_stale_scratch(root.path()).unwrap(), 1);
        assert!(!stale.exists());
        assert!(root.path().join("keep-me").exists());
        assert_eq!(purge_stale_scratch(&root.path().join("missing")).unwrap(), 0);
    }
}
