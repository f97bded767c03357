//! Core application logic for FARS Fetcher
//!
//! This module contains the fetch pipeline: registry loading, hashing, the
//! HTTP downloader, archive extraction and the cache that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fars_fetcher::app::{CacheConfig, FetchCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = FetchCache::new(CacheConfig::default()).await?;
//!
//! let mapping = cache.fetch_mapping().await?;
//! println!("Variable mapping at {}", mapping.display());
//!
//! let report = cache.fetch_all().await;
//! println!("{} entries ready, {} failed", report.success_count(), report.failure_count());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cache;
pub mod cancel;
pub mod client;
pub mod hash;
pub mod progress;
pub mod registry;

// Re-export main public API
pub use archive::{extract_archive, list_extracted};
pub use cache::{
    CacheConfig, CacheLayout, FetchAllReport, FetchCache, FetchOutcome, FileCheck, HashVerifier,
    RangeReport, VerificationFailure, VerificationReport,
};
pub use cancel::CancelToken;
pub use client::{ClientConfig, DownloadSummary, Downloader, HttpDownloader};
pub use hash::Sha256Hash;
pub use progress::{NoProgress, ProgressEvent, ProgressObserver, SharedObserver};
pub use registry::{EntryKind, Registry, RegistryEntry};

pub use crate::errors::FetchError;
