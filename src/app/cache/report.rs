//! Outcomes of fetch operations
//!
//! Single-key operations return a [`FetchOutcome`] or a
//! [`FetchError`](crate::errors::FetchError). Batch operations never fail as
//! a whole; they return a report holding one result per key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::FetchError;

/// How a single registry file was made available
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// File was present and matched its registry hash
    CacheHit { path: PathBuf },
    /// File was present and accepted without a hash check
    Unchecked { path: PathBuf },
    /// File was downloaded (and verified when hash-checking is on)
    Downloaded { path: PathBuf, bytes: u64 },
}

impl FetchOutcome {
    /// Local path of the file
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::CacheHit { path }
            | FetchOutcome::Unchecked { path }
            | FetchOutcome::Downloaded { path, .. } => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            FetchOutcome::CacheHit { path }
            | FetchOutcome::Unchecked { path }
            | FetchOutcome::Downloaded { path, .. } => path,
        }
    }

    /// Whether the network was used
    pub fn was_downloaded(&self) -> bool {
        matches!(self, FetchOutcome::Downloaded { .. })
    }
}

/// Per-year results of a range fetch
#[derive(Debug, Default)]
pub struct RangeReport {
    pub years: BTreeMap<u32, Result<Vec<PathBuf>, FetchError>>,
}

impl RangeReport {
    /// Extracted files per successful year
    pub fn succeeded(&self) -> impl Iterator<Item = (u32, &[PathBuf])> {
        self.years
            .iter()
            .filter_map(|(year, result)| {
                result.as_ref().ok().map(|files| (*year, files.as_slice()))
            })
    }

    /// Errors per failed year
    pub fn failed(&self) -> impl Iterator<Item = (u32, &FetchError)> {
        self.years
            .iter()
            .filter_map(|(year, result)| result.as_ref().err().map(|error| (*year, error)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Best-effort results of fetching every registry entry
#[derive(Debug, Default)]
pub struct FetchAllReport {
    /// Extracted file paths per archive entry
    pub extracted: BTreeMap<String, Vec<PathBuf>>,
    /// Local path per plain (non-archive) entry
    pub mappings: BTreeMap<String, PathBuf>,
    /// Error per failed entry
    pub failures: BTreeMap<String, FetchError>,
}

impl FetchAllReport {
    /// Entries that were made available
    pub fn success_count(&self) -> usize {
        self.extracted.len() + self.mappings.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Plain JSON view for machine-readable output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "extracted": self.extracted,
            "mappings": self.mappings,
            "failures": self
                .failures
                .iter()
                .map(|(filename, error)| (filename.clone(), failure_json(error)))
                .collect::<serde_json::Map<_, _>>(),
        })
    }
}

/// JSON description of a per-key failure
pub fn failure_json(error: &FetchError) -> serde_json::Value {
    serde_json::json!({
        "kind": error.kind(),
        "status": error.status(),
        "message": error.to_string(),
    })
}
