use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use sha2::{Digest, Sha256};

use crate::constants::HASH_BUFFER_SIZE;

/// Hex SHA-256 digest of a file's contents
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let reader = BufReader::new(File::open(path)?);
    copy_with_sha256(reader, &mut io::sink()).map(|(_, digest)| digest)
}

/// Copy `reader` into `writer`, hashing the bytes on the way through.
/// Returns the number of bytes copied and their hex SHA-256 digest.
pub fn copy_with_sha256<R: Read, W: Write>(mut reader: R, writer: &mut W) -> io::Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        writer.write_all(&buffer[..bytes_read])?;
        total += bytes_read as u64;
    }

    Ok((total, format!("{:x}", hasher.finalize())))
}

/// Hex SHA-256 digest of an in-memory buffer
pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const ABC_DIGEST: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_known_digest() {
        assert_eq!(sha256_bytes(b"abc"), ABC_DIGEST);
    }

    #[test]
    fn test_file_digest_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();
        assert_eq!(sha256_file(file.path()).unwrap(), ABC_DIGEST);
    }

    #[test]
    fn test_copy_hashes_what_it_writes() {
        let input = vec![7u8; HASH_BUFFER_SIZE * 2 + 3];
        let mut output = Vec::new();
        let (copied, digest) = copy_with_sha256(input.as_slice(), &mut output).unwrap();

        assert_eq!(copied, input.len() as u64);
        assert_eq!(output, input);
        assert_eq!(digest, sha256_bytes(&input));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(sha256_file(Path::new("/nonexistent/file")).is_err());
    }
}
