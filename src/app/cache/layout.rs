//! Cache path derivation
//!
//! Every path in the cache is a pure function of the cache root and the
//! registry filename, so repeated runs and separate processes always agree
//! on where a dataset lives.

use std::path::{Component, Path, PathBuf};

use crate::constants::files;

/// Path layout under one cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<filename>`; only meaningful for keys that pass [`Self::is_safe_key`]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Whether a registry key names exactly one plain path component
    ///
    /// Rejects empty keys, `.`/`..`, absolute paths and anything containing
    /// a separator, so `file_path` always stays directly under the root.
    pub fn is_safe_key(filename: &str) -> bool {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => name == filename,
            _ => false,
        }
    }

    /// `<root>/<filename without its final 4 characters>.unzip`
    pub fn extract_dir(&self, filename: &str) -> PathBuf {
        self.root.join(Self::extract_dir_name(filename))
    }

    /// Extraction directory name for an archive filename
    ///
    /// Drops the last four characters (not bytes). Names of four characters
    /// or fewer keep their full text.
    pub fn extract_dir_name(filename: &str) -> String {
        let stem = filename
            .char_indices()
            .rev()
            .nth(files::EXTENSION_LEN - 1)
            .map(|(start, _)| &filename[..start])
            .filter(|stem| !stem.is_empty())
            .unwrap_or(filename);
        format!("{}{}", stem, files::EXTRACT_DIR_SUFFIX)
    }

    /// Registry filename of the archive for a dataset year
    pub fn archive_name(year: u32) -> String {
        format!("{}{}", year, files::ARCHIVE_EXTENSION)
    }
}
