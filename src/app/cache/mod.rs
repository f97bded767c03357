//! Verified fetch-and-cache engine
//!
//! This module turns registry keys into verified local files. Cached copies
//! are reused when their SHA-256 matches the registry, everything else is
//! downloaded and checked, and zip archives are unpacked into a
//! deterministic directory next to them.
//!
//! # Key Features
//!
//! - **Deterministic layout**: `<root>/<filename>` and `<root>/<stem>.unzip`
//! - **Single download per key**: concurrent requests for one file share it
//! - **Streaming verification**: files are hashed in fixed-size chunks
//! - **Best-effort batches**: range and full fetches report per-key results
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and cache root resolution
//! - [`layout`] - Cache path derivation
//! - [`reservation`] - Per-key locks preventing duplicate downloads
//! - [`verification`] - Hash verification and integrity reports
//! - [`report`] - Fetch outcomes and batch reports
//! - [`manager`] - The [`FetchCache`] orchestrator
//!
//! # Examples
//!
//! ```rust,no_run
//! use fars_fetcher::app::cache::{CacheConfig, FetchCache};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::with_cache_root(PathBuf::from("/data/fars"));
//! let cache = FetchCache::new(config).await?;
//!
//! let files = cache.fetch_year(2018).await?;
//! println!("{} files extracted under {}", files.len(), cache.cache_root().display());
//!
//! let report = cache.fetch_range(2015, 2017).await;
//! for (year, error) in report.failed() {
//!     eprintln!("{}: {}", year, error);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod layout;
pub mod manager;
pub mod report;
pub mod reservation;
pub mod verification;

#[cfg(test)]
mod tests;

// Re-export main public API
pub use config::CacheConfig;
pub use layout::CacheLayout;
pub use manager::FetchCache;
pub use report::{FetchAllReport, FetchOutcome, RangeReport};
pub use reservation::KeyLocks;
pub use verification::{FileCheck, HashVerifier, VerificationFailure, VerificationReport};
