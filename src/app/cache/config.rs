//! Cache configuration types and defaults
//!
//! This module contains the configuration for the fetch cache, including
//! the rules that turn an optional project directory and cache directory
//! into one concrete cache root.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{cache, files, workers};
use crate::errors::{CacheError, CacheResult};

/// Configuration for the fetch cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory; relative to `project_dir` when that is set
    pub cache_root: Option<PathBuf>,
    /// Top-level project directory; cache defaults to `<project>/data/fars`
    pub project_dir: Option<PathBuf>,
    /// Registry manifest; defaults to `<cache root>/registry.txt`
    pub registry_path: Option<PathBuf>,
    /// Verify cached and downloaded files against the registry hash
    pub check_hash: bool,
    /// Emit progress events during downloads and extraction
    pub show_progress: bool,
    /// Keys processed concurrently by batch operations
    pub max_concurrent: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: None,
            project_dir: None,
            registry_path: None,
            check_hash: cache::CHECK_HASH,
            show_progress: cache::SHOW_PROGRESS,
            max_concurrent: workers::DEFAULT_WORKER_COUNT,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root: Some(cache_root),
            ..Default::default()
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, project_dir: PathBuf) -> Self {
        self.project_dir = Some(project_dir);
        self
    }

    /// Set the registry manifest path
    pub fn with_registry_path(mut self, registry_path: PathBuf) -> Self {
        self.registry_path = Some(registry_path);
        self
    }

    /// Enable or disable hash checking
    pub fn with_check_hash(mut self, enabled: bool) -> Self {
        self.check_hash = enabled;
        self
    }

    /// Enable or disable progress reporting
    pub fn with_show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Set batch concurrency; zero is treated as one
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Resolve the cache root directory
    ///
    /// - project and cache dir: `<project>/<cache dir>`
    /// - project only: `<project>/data/fars`
    /// - cache dir only: `<cache dir>`
    /// - neither: `<OS cache dir>/fars`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NoDefaultDirectory` when neither directory is set
    /// and the platform has no cache directory.
    pub fn resolve_cache_root(&self) -> CacheResult<PathBuf> {
        match (&self.project_dir, &self.cache_root) {
            (Some(project), Some(cache_root)) => Ok(project.join(cache_root)),
            (Some(project), None) => Ok(project
                .join(cache::PROJECT_DATA_DIR)
                .join(cache::DEFAULT_DIR_NAME)),
            (None, Some(cache_root)) => Ok(cache_root.clone()),
            (None, None) => dirs::cache_dir()
                .map(|dir| dir.join(cache::DEFAULT_DIR_NAME))
                .ok_or(CacheError::NoDefaultDirectory),
        }
    }

    /// Registry manifest location for a resolved cache root
    pub fn resolve_registry_path(&self, cache_root: &std::path::Path) -> PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(|| cache_root.join(files::REGISTRY_FILE_NAME))
    }
}
