//! Fetch cache orchestration
//!
//! This module contains [`FetchCache`], which turns a registry key into a
//! verified local file: look the key up, reuse a cached copy when it checks
//! out, otherwise download it, verify it, and for archives extract it.
//!
//! Per-key state moves `NotPresent -> Downloading -> Verifying -> Valid` (or
//! `IntegrityMismatch`), `Present & Valid` skips straight to `Valid`, and a
//! valid archive continues `Extracting -> Extracted`. A mismatching file stays
//! on disk until the next fetch of that key replaces it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::app::archive::extract_archive;
use crate::app::cancel::CancelToken;
use crate::app::client::{ClientConfig, Downloader, HttpDownloader};
use crate::app::progress::{ProgressObserver, SharedObserver};
use crate::app::registry::{EntryKind, Registry, RegistryEntry};
use crate::constants::files;
use crate::errors::{CacheError, CacheResult, FetchError, FetchResult, Result};

use super::config::CacheConfig;
use super::layout::CacheLayout;
use super::report::{FetchAllReport, FetchOutcome, RangeReport};
use super::reservation::KeyLocks;
use super::verification::{FileCheck, HashVerifier, VerificationReport};

/// Verified fetch-and-cache engine over one registry
pub struct FetchCache<D: Downloader = HttpDownloader> {
    config: CacheConfig,
    layout: CacheLayout,
    registry: Registry,
    downloader: D,
    locks: KeyLocks,
    observer: Option<SharedObserver>,
    cancel: CancelToken,
}

/// What a batch fetch produced for one entry
enum Fetched {
    Extracted(Vec<PathBuf>),
    Plain(PathBuf),
}

impl FetchCache<HttpDownloader> {
    /// Create a cache with the default HTTP client
    ///
    /// Resolves and creates the cache root, then loads the registry from
    /// `config.registry_path` (default `<cache root>/registry.txt`).
    ///
    /// # Errors
    ///
    /// - `AppError::Cache` if the cache directory cannot be created
    /// - `AppError::Registry` if the registry cannot be read
    /// - `AppError::Download` if the HTTP client cannot be built
    pub async fn new(config: CacheConfig) -> Result<Self> {
        Self::with_client_config(config, &ClientConfig::default()).await
    }

    /// Create a cache with a custom HTTP client configuration
    pub async fn with_client_config(
        config: CacheConfig,
        client_config: &ClientConfig,
    ) -> Result<Self> {
        let cancel = CancelToken::new();
        let downloader = HttpDownloader::with_config(client_config)?;

        let cache_root = prepare_cache_root(&config).await?;
        let registry_path = config.resolve_registry_path(&cache_root);
        let registry = Registry::load(&registry_path).await?;

        Ok(Self::assemble(config, cache_root, registry, downloader))
    }
}

impl<D: Downloader> FetchCache<D> {
    /// Create a cache over an in-memory registry and a custom downloader
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the cache directory cannot be resolved or created
    pub async fn with_downloader(
        config: CacheConfig,
        registry: Registry,
        downloader: D,
    ) -> CacheResult<Self> {
        let cache_root = prepare_cache_root(&config).await?;
        Ok(Self::assemble(config, cache_root, registry, downloader))
    }

    fn assemble(
        config: CacheConfig,
        cache_root: PathBuf,
        registry: Registry,
        downloader: D,
    ) -> Self {
        info!(
            "Initialized fetch cache at {} with {} registry entries",
            cache_root.display(),
            registry.len()
        );
        Self {
            config,
            layout: CacheLayout::new(cache_root),
            registry,
            downloader,
            locks: KeyLocks::new(),
            observer: None,
            cancel: CancelToken::new(),
        }
    }

    /// Attach a progress observer; it only receives events while
    /// `show_progress` is enabled
    pub fn with_progress(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the token checked between download chunks and archive members
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Local cache root; every dataset lives directly under it
    pub fn cache_root(&self) -> &Path {
        self.layout.root()
    }

    pub fn show_progress(&self) -> bool {
        self.config.show_progress
    }

    pub fn check_hash(&self) -> bool {
        self.config.check_hash
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Make one registry file available locally
    ///
    /// # Errors
    ///
    /// - `FetchError::UnknownResource` if `filename` is not in the registry
    /// - `FetchError::UnsafeKey` if `filename` is not a plain file name
    /// - `FetchError::CacheIo` if a cached copy cannot be read or the
    ///   download cannot be written
    /// - `FetchError::RemoteFetchFailed` if the request or transfer fails
    /// - `FetchError::IntegrityMismatch` if the downloaded file has the wrong hash
    /// - `FetchError::Cancelled` if the cancel token fires mid-download
    pub async fn fetch_one(&self, filename: &str) -> FetchResult<FetchOutcome> {
        let entry = self.entry(filename)?;
        let _guard = self.locks.acquire(filename).await;
        self.resolve(entry).await
    }

    /// Fetch and extract the archive of one dataset year (`"{year}.zip"`)
    ///
    /// Returns every file in the year's extraction directory.
    pub async fn fetch_year(&self, year: u32) -> FetchResult<Vec<PathBuf>> {
        self.fetch_extracted(&CacheLayout::archive_name(year)).await
    }

    /// Fetch every year in `start..=end`; an inverted range yields an empty report
    ///
    /// Years run concurrently up to `max_concurrent` and one failing year
    /// never stops the others.
    pub async fn fetch_range(&self, start: u32, end: u32) -> RangeReport {
        if start > end {
            debug!("Empty year range {}..={}", start, end);
            return RangeReport::default();
        }

        info!("Fetching years {} to {}", start, end);
        let years: BTreeMap<u32, FetchResult<Vec<PathBuf>>> = stream::iter(start..=end)
            .map(|year| async move {
                let result = self.fetch_year(year).await;
                if let Err(e) = &result {
                    warn!("Year {} failed: {}", year, e);
                }
                (year, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        RangeReport { years }
    }

    /// Fetch every registry entry, extracting archives
    ///
    /// Best effort: failures are logged and recorded per entry.
    pub async fn fetch_all(&self) -> FetchAllReport {
        info!("Fetching all {} registry entries", self.registry.len());

        let results: Vec<(String, FetchResult<Fetched>)> = stream::iter(self.registry.iter())
            .map(|entry| async move {
                let result = match entry.kind() {
                    EntryKind::Archive => self
                        .fetch_extracted(&entry.filename)
                        .await
                        .map(Fetched::Extracted),
                    EntryKind::Plain => self
                        .fetch_one(&entry.filename)
                        .await
                        .map(|outcome| Fetched::Plain(outcome.into_path())),
                };
                (entry.filename.clone(), result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        let mut report = FetchAllReport::default();
        for (filename, result) in results {
            match result {
                Ok(Fetched::Extracted(paths)) => {
                    report.extracted.insert(filename, paths);
                }
                Ok(Fetched::Plain(path)) => {
                    report.mappings.insert(filename, path);
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", filename, e);
                    report.failures.insert(filename, e);
                }
            }
        }

        info!(
            "Fetch all finished: {} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
        report
    }

    /// Fetch the variable mapping file
    pub async fn fetch_mapping(&self) -> FetchResult<PathBuf> {
        self.fetch_one(files::MAPPING_FILE_NAME)
            .await
            .map(FetchOutcome::into_path)
    }

    /// Check every registry entry on disk without touching the network
    pub async fn verify_cache(&self) -> VerificationReport {
        let start = Instant::now();
        let mut report = VerificationReport::new();

        for entry in self.registry.iter() {
            let check = if CacheLayout::is_safe_key(&entry.filename) {
                let path = self.layout.file_path(&entry.filename);
                HashVerifier::check_file(&path, &entry.expected_hash).await
            } else {
                FileCheck::Unreadable {
                    error: "registry key is not a plain file name".to_string(),
                }
            };
            if !check.is_valid() {
                debug!("{}: {}", entry.filename, check);
            }
            report.record(&entry.filename, &entry.expected_hash, check);
        }

        report.verification_time = start.elapsed();
        info!(
            "Verified {} files: {} ok, {} missing, {} corrupt",
            report.files_checked,
            report.files_verified,
            report.files_missing,
            report.files_corrupt
        );
        report
    }

    fn entry(&self, filename: &str) -> FetchResult<&RegistryEntry> {
        let entry = self
            .registry
            .get(filename)
            .ok_or_else(|| FetchError::UnknownResource {
                filename: filename.to_string(),
            })?;
        // Keys become paths under the cache root and must not leave it
        if !CacheLayout::is_safe_key(filename) {
            return Err(FetchError::UnsafeKey {
                filename: filename.to_string(),
            });
        }
        Ok(entry)
    }

    fn concurrency(&self) -> usize {
        self.config.max_concurrent.max(1)
    }

    fn progress(&self) -> Option<&dyn ProgressObserver> {
        if self.config.show_progress {
            self.observer.as_deref()
        } else {
            None
        }
    }

    async fn fetch_extracted(&self, filename: &str) -> FetchResult<Vec<PathBuf>> {
        let entry = self.entry(filename)?;
        let _guard = self.locks.acquire(filename).await;
        let outcome = self.resolve(entry).await?;
        self.extract(filename, outcome.path()).await
    }

    /// Verify-or-download one entry; caller holds the key lock
    async fn resolve(&self, entry: &RegistryEntry) -> FetchResult<FetchOutcome> {
        let filename = entry.filename.as_str();
        let path = self.layout.file_path(filename);

        let cached = fs::try_exists(&path)
            .await
            .map_err(|source| FetchError::CacheIo {
                filename: filename.to_string(),
                source,
            })?;
        if cached {
            if !self.config.check_hash {
                debug!("Using cached {} without hash check", filename);
                return Ok(FetchOutcome::Unchecked { path });
            }

            let valid = HashVerifier::verify_file_hash(&path, &entry.expected_hash)
                .await
                .map_err(|source| FetchError::CacheIo {
                    filename: filename.to_string(),
                    source,
                })?;
            if valid {
                debug!("Cache hit for {}", filename);
                return Ok(FetchOutcome::CacheHit { path });
            }
            warn!(
                "Cached {} does not match its registry hash, re-downloading",
                filename
            );
        }

        info!("Downloading {} from {}", filename, entry.source_url);
        let summary = self
            .downloader
            .download(&entry.source_url, &path, self.progress(), &self.cancel)
            .await
            .map_err(|e| FetchError::from_download(filename, e))?;

        if self.config.check_hash {
            let actual = HashVerifier::calculate_file_hash(&path)
                .await
                .map_err(|source| FetchError::CacheIo {
                    filename: filename.to_string(),
                    source,
                })?;
            if !actual.matches(&entry.expected_hash) {
                error!(
                    "Hash mismatch for {}: expected {}, got {}",
                    filename, entry.expected_hash, actual
                );
                return Err(FetchError::IntegrityMismatch {
                    filename: filename.to_string(),
                    expected: entry.expected_hash.clone(),
                    actual: actual.to_hex(),
                });
            }
        }

        Ok(FetchOutcome::Downloaded {
            path,
            bytes: summary.bytes_written,
        })
    }

    async fn extract(&self, filename: &str, archive: &Path) -> FetchResult<Vec<PathBuf>> {
        let dest = self.layout.extract_dir(filename);
        let observer = if self.config.show_progress {
            self.observer.clone()
        } else {
            None
        };

        let files = extract_archive(archive, &dest, observer, &self.cancel)
            .await
            .map_err(|e| FetchError::from_archive(filename, e))?;
        debug!("{} extracted to {} ({} files)", filename, dest.display(), files.len());
        Ok(files)
    }
}

/// Resolve the cache root and create it (and the project directory)
async fn prepare_cache_root(config: &CacheConfig) -> CacheResult<PathBuf> {
    let cache_root = config.resolve_cache_root()?;

    let mut required = Vec::with_capacity(2);
    if let Some(project) = &config.project_dir {
        required.push(project.clone());
    }
    required.push(cache_root.clone());

    for dir in required {
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| {
                error!("Failed to create directory {}: {}", dir.display(), source);
                CacheError::DirectoryNotAccessible {
                    path: dir.clone(),
                    source,
                }
            })?;
    }

    Ok(cache_root)
}

impl<D: Downloader> std::fmt::Debug for FetchCache<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("cache_root", &self.layout.root())
            .field("registry_entries", &self.registry.len())
            .field("check_hash", &self.config.check_hash)
            .field("show_progress", &self.config.show_progress)
            .finish()
    }
}
