//! One-line import for library users
//!
//! ```rust,no_run
//! use fars_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = FetchCache::new(CacheConfig::with_cache_root(PathBuf::from("/data/fars"))).await?;
//!
//!     let report = cache.fetch_range(2015, 2018).await;
//!     for (year, error) in report.failed() {
//!         eprintln!("{}: {}", year, error);
//!     }
//!     Ok(())
//! }
//! ```

pub use crate::errors::{AppError, FetchError, Result};

pub use crate::app::{
    CacheConfig, CancelToken, ClientConfig, Downloader, FetchAllReport, FetchCache, FetchOutcome,
    FileCheck, HttpDownloader, ProgressEvent, ProgressObserver, RangeReport, Registry,
    RegistryEntry, Sha256Hash, SharedObserver, VerificationReport,
};

pub use crate::constants::MAPPING_FILE_NAME;

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
