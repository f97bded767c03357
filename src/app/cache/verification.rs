//! Streaming SHA-256 checks of cached files
//!
//! [`HashVerifier`] hashes a file in fixed-size chunks and compares the
//! lowercase hex digest with a registry hash. [`VerificationReport`]
//! collects per-entry [`FileCheck`] results for an offline cache audit.

use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::app::hash::Sha256Hash;
use crate::constants::files;

/// State of one cached file relative to its registry hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileCheck {
    Valid,
    Missing,
    Mismatch { actual: Sha256Hash },
    Unreadable { error: String },
}

impl FileCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, FileCheck::Valid)
    }
}

impl fmt::Display for FileCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCheck::Valid => f.write_str("valid"),
            FileCheck::Missing => f.write_str("not in cache"),
            FileCheck::Mismatch { actual } => write!(f, "hash mismatch (got {})", actual),
            FileCheck::Unreadable { error } => write!(f, "unreadable: {}", error),
        }
    }
}

/// A registry entry whose cached copy is not usable
#[derive(Debug, Clone, Serialize)]
pub struct VerificationFailure {
    pub filename: String,
    pub expected_hash: String,
    #[serde(flatten)]
    pub check: FileCheck,
}

/// Outcome of auditing every registry entry on disk
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub files_checked: usize,
    pub files_verified: usize,
    pub files_missing: usize,
    /// Present but mismatching or unreadable
    pub files_corrupt: usize,
    pub verification_time: Duration,
    pub failed_files: Vec<VerificationFailure>,
}

impl VerificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one entry's result; anything but `Valid` is kept as a failure
    pub fn record(&mut self, filename: &str, expected_hash: &str, check: FileCheck) {
        self.files_checked += 1;
        match &check {
            FileCheck::Valid => {
                self.files_verified += 1;
                return;
            }
            FileCheck::Missing => self.files_missing += 1,
            FileCheck::Mismatch { .. } | FileCheck::Unreadable { .. } => self.files_corrupt += 1,
        }
        self.failed_files.push(VerificationFailure {
            filename: filename.to_string(),
            expected_hash: expected_hash.to_string(),
            check,
        });
    }

    /// Entries that are missing or corrupt
    pub fn problem_count(&self) -> usize {
        self.files_missing + self.files_corrupt
    }

    /// Share of checked entries that verified, in percent
    pub fn success_rate(&self) -> f64 {
        if self.files_checked == 0 {
            return 0.0;
        }
        self.files_verified as f64 * 100.0 / self.files_checked as f64
    }

    pub fn is_successful(&self) -> bool {
        self.problem_count() == 0
    }
}

/// SHA-256 file hashing against registry digests
pub struct HashVerifier;

impl HashVerifier {
    /// Whether the file's digest equals `expected_hash` exactly
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or read
    pub async fn verify_file_hash(path: &Path, expected_hash: &str) -> io::Result<bool> {
        Ok(Self::calculate_file_hash(path).await?.matches(expected_hash))
    }

    /// Digest of a file, read `HASH_CHUNK_SIZE` bytes at a time
    pub async fn calculate_file_hash(path: &Path) -> io::Result<Sha256Hash> {
        let mut file = File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut chunk = vec![0u8; files::HASH_CHUNK_SIZE];

        let mut total = 0u64;
        loop {
            let n = file.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            total += n as u64;
        }

        let digest = Sha256Hash::from_hasher(hasher);
        debug!("{} ({} bytes) hashes to {}", path.display(), total, digest);
        Ok(digest)
    }

    /// Classify a cached file without failing on I/O problems
    pub async fn check_file(path: &Path, expected_hash: &str) -> FileCheck {
        match Self::calculate_file_hash(path).await {
            Ok(actual) if actual.matches(expected_hash) => FileCheck::Valid,
            Ok(actual) => FileCheck::Mismatch { actual },
            Err(e) if e.kind() == io::ErrorKind::NotFound => FileCheck::Missing,
            Err(e) => FileCheck::Unreadable {
                error: e.to_string(),
            },
        }
    }
}
