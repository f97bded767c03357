//! Application constants for FARS Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Cache directory override
    pub const CACHE_DIR: &str = "FARS_CACHE_DIR";

    /// Project directory override
    pub const PROJECT_DIR: &str = "FARS_PROJECT_DIR";

    /// Registry file override
    pub const REGISTRY: &str = "FARS_REGISTRY";

    /// Hash-checking toggle ("true"/"false", "1"/"0")
    pub const CHECK_HASH: &str = "FARS_CHECK_HASH";

    /// Progress display toggle ("true"/"false", "1"/"0")
    pub const SHOW_PROGRESS: &str = "FARS_SHOW_PROGRESS";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Browser-like user agent; the NHTSA file server rejects bare clients
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/123.0";

    /// Accept header sent with every request
    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

    /// Accept-Language header sent with every request
    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Maximum time to wait for any single read from the socket
    pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// File and layout constants
pub mod files {
    /// Extension identifying archive entries in the registry
    pub const ARCHIVE_EXTENSION: &str = ".zip";

    /// Suffix of per-archive extraction directories
    pub const EXTRACT_DIR_SUFFIX: &str = ".unzip";

    /// Number of trailing characters stripped from an archive filename
    /// to form its extraction directory name
    pub const EXTENSION_LEN: usize = 4;

    /// Registry key of the categorical variable mapping artifact
    pub const MAPPING_FILE_NAME: &str = "mapping.dict";

    /// Default registry file name, looked up inside the cache root
    pub const REGISTRY_FILE_NAME: &str = "registry.txt";

    /// Read size for streaming hash computation (64KB)
    pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

    /// Interval at which download volume is logged (1MB)
    pub const DOWNLOAD_LOG_INTERVAL: u64 = 1024 * 1024;
}

/// Cache location constants
pub mod cache {
    /// Directory name used under the OS cache directory
    pub const DEFAULT_DIR_NAME: &str = "fars";

    /// Cache location relative to a project directory
    pub const PROJECT_DATA_DIR: &str = "data";

    /// Hash-checking is on unless explicitly disabled
    pub const CHECK_HASH: bool = true;

    /// Progress reporting is on unless explicitly disabled
    pub const SHOW_PROGRESS: bool = true;
}

/// Worker and concurrency configuration
pub mod workers {
    /// Default number of keys fetched concurrently in batch operations
    pub const DEFAULT_WORKER_COUNT: usize = 4;

    /// Maximum recommended concurrent keys
    pub const MAX_WORKER_COUNT: usize = 16;
}

/// Progress reporting
pub mod progress {
    /// Minimum interval between byte-progress events (milliseconds)
    pub const UPDATE_FREQUENCY_MS: u64 = 100;
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_FILE_NAME: &str = "fars-fetcher.toml";

    /// Application directory name under the user config directory
    pub const APP_DIR_NAME: &str = "fars-fetcher";

    /// Configuration file name inside the application directory
    pub const FILE_NAME: &str = "config.toml";
}

// Re-export commonly used constants for convenience
pub use files::{EXTRACT_DIR_SUFFIX, MAPPING_FILE_NAME, REGISTRY_FILE_NAME};
pub use http::USER_AGENT;
pub use workers::DEFAULT_WORKER_COUNT;
