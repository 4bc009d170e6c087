//! Streaming content checksums
//!
//! Files are read in fixed-size chunks so memory use stays bounded no matter
//! how large the file is. Digests are stored as lower-case hex.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Size of each read while hashing
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Digest used for file checksums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, compatible with inventories written by other producers
    #[default]
    Sha256,
    /// BLAKE3, faster on large trees
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Hasher {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(bytes),
            Hasher::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha256(h) => format!("{:x}", h.finalize()),
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Hash everything a reader yields, one chunk at a time
pub fn checksum_reader<R: Read>(mut reader: R, algorithm: HashAlgorithm) -> io::Result<String> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize_hex())
}

/// Compute the checksum of a file's content
pub fn checksum_file(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    checksum_reader(file, algorithm)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_sha256_of_known_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("a.txt");
        fs::write(&file_path, "hello").unwrap();

        let sum = checksum_file(&file_path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(sum, HELLO_SHA256);
    }

    #[test]
    fn test_empty_input() {
        let sum = checksum_reader(io::empty(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(sum, EMPTY_SHA256);
    }

    #[test]
    fn test_content_larger_than_one_chunk() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let chunked = checksum_reader(&data[..], HashAlgorithm::Sha256).unwrap();
        let direct = format!("{:x}", Sha256::digest(&data));
        assert_eq!(chunked, direct);
    }

    #[test]
    fn test_blake3_matches_one_shot_hash() {
        let data = vec![42u8; CHUNK_SIZE + 1];
        let chunked = checksum_reader(&data[..], HashAlgorithm::Blake3).unwrap();
        assert_eq!(chunked, blake3::hash(&data).to_hex().to_string());
        assert_eq!(chunked.len(), 64);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = checksum_file(&temp_dir.path().join("gone.bin"), HashAlgorithm::Sha256);
        assert!(result.is_err());
    }

}
