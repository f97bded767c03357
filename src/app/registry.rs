//! Registry (manifest) loading
//!
//! A registry is a flat text file with one dataset per line:
//!
//! ```text
//! 2018.zip     9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08  https://example.org/2018.zip
//! mapping.dict 2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae  https://example.org/mapping.dict
//! ```
//!
//! Parsing is deliberately lenient. Blank lines and lines with fewer than
//! three whitespace-separated fields are skipped, nothing is validated at
//! load time, and a filename that appears twice keeps its last entry.
//! Malformed hashes or URLs surface later as verification or download
//! failures.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::constants::files;
use crate::errors::{RegistryError, RegistryResult};

/// Kind of artifact a registry entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A zip archive that is extracted after download
    Archive,
    /// A plain file used as-is (e.g. the variable mapping)
    Plain,
}

/// One dataset known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    /// Unique, case-sensitive key and cache file name
    pub filename: String,
    /// Expected SHA-256 digest as written in the manifest
    pub expected_hash: String,
    /// Download location
    pub source_url: String,
}

impl RegistryEntry {
    /// Classify the entry by its file extension
    pub fn kind(&self) -> EntryKind {
        if is_archive_name(&self.filename) {
            EntryKind::Archive
        } else {
            EntryKind::Plain
        }
    }
}

/// Whether a filename names a zip archive
pub fn is_archive_name(filename: &str) -> bool {
    let ext = files::ARCHIVE_EXTENSION;
    filename.len() > ext.len()
        && filename
            .get(filename.len() - ext.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
}

/// Immutable filename → entry table
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<String, RegistryEntry>,
}

impl Registry {
    /// Load a registry from a manifest file
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unreadable` if the file cannot be opened or
    /// is not valid UTF-8. Malformed lines never fail the load.
    pub async fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| RegistryError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })?;

        let registry = Self::parse(&content);
        info!(
            "Loaded {} registry entries from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Parse manifest text
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let (Some(filename), Some(hash), Some(url)) =
                (fields.next(), fields.next(), fields.next())
            else {
                if !line.trim().is_empty() {
                    debug!("Skipping malformed registry line {}: {:?}", index + 1, line);
                }
                continue;
            };

            let entry = RegistryEntry {
                filename: filename.to_string(),
                expected_hash: hash.to_string(),
                source_url: url.to_string(),
            };
            if entries.insert(filename.to_string(), entry).is_some() {
                debug!(
                    "Registry line {} overrides earlier entry for {}",
                    index + 1,
                    filename
                );
            }
        }

        Self { entries }
    }

    /// Look up an entry by filename
    pub fn get(&self, filename: &str) -> Option<&RegistryEntry> {
        self.entries.get(filename)
    }

    /// Whether the registry knows a filename
    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by filename
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        entries.into_iter()
    }

    /// Filenames sorted
    pub fn filenames(&self) -> Vec<&str> {
        self.iter().map(|e| e.filename.as_str()).collect()
    }
}

impl FromIterator<RegistryEntry> for Registry {
    fn from_iter<I: IntoIterator<Item = RegistryEntry>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|entry| (entry.filename.clone(), entry))
            .collect();
        Self { entries }
    }
}
