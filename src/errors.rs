//! Error types for FARS Fetcher
//!
//! This module defines the error types for every component of the fetch
//! pipeline. Each fetch failure carries the registry key it belongs to so
//! callers can report which dataset failed and why without string-matching
//! log output.

use std::path::PathBuf;
use thiserror::Error;

/// Registry (manifest) loading errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Manifest file missing or unreadable
    #[error("Registry file could not be read: {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network failure, timeout or redirect loop reported by the HTTP client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server responded with HTTP {status}")]
    Status { status: u16 },

    /// I/O error while writing the target file
    #[error("File I/O error during download")]
    Io(#[from] std::io::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Download was cancelled between chunks
    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// HTTP status associated with the failure, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloadError::Status { status } => Some(*status),
            DownloadError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the failure was a timeout on connect or read
    pub fn is_timeout(&self) -> bool {
        matches!(self, DownloadError::Http(e) if e.is_timeout())
    }
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Archive cannot be opened or parsed
    #[error("Archive is corrupt or unreadable: {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// I/O error while writing extracted members
    #[error("File I/O error during extraction")]
    Io(#[from] std::io::Error),

    /// Extraction was cancelled between members
    #[error("Extraction cancelled")]
    Cancelled,
}

/// Per-key fetch errors raised by the fetch cache
#[derive(Error, Debug)]
pub enum FetchError {
    /// Requested filename is absent from the registry
    #[error("{filename}: not found in registry")]
    UnknownResource { filename: String },

    /// Registry key would resolve outside the cache root
    #[error("{filename}: registry key is not a plain file name")]
    UnsafeKey { filename: String },

    /// Remote resource could not be retrieved
    #[error("{filename}: download failed: {source}")]
    RemoteFetchFailed {
        filename: String,
        #[source]
        source: DownloadError,
    },

    /// Freshly downloaded file does not match the registry hash
    #[error("{filename}: hash verification failed. Expected: {expected}, got: {actual}")]
    IntegrityMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// Downloaded archive could not be unpacked
    #[error("{filename}: extraction failed: {source}")]
    ArchiveCorrupt {
        filename: String,
        #[source]
        source: ArchiveError,
    },

    /// Local cache file could not be read, checked or written
    #[error("{filename}: cache file I/O failed: {source}")]
    CacheIo {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Operation was cancelled before completion
    #[error("{filename}: cancelled")]
    Cancelled { filename: String },
}

impl FetchError {
    /// Registry key the failure belongs to
    pub fn filename(&self) -> &str {
        match self {
            FetchError::UnknownResource { filename }
            | FetchError::UnsafeKey { filename }
            | FetchError::RemoteFetchFailed { filename, .. }
            | FetchError::IntegrityMismatch { filename, .. }
            | FetchError::ArchiveCorrupt { filename, .. }
            | FetchError::CacheIo { filename, .. }
            | FetchError::Cancelled { filename } => filename,
        }
    }

    /// Short machine-friendly name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::UnknownResource { .. } => "unknown_resource",
            FetchError::UnsafeKey { .. } => "unsafe_key",
            FetchError::RemoteFetchFailed { .. } => "remote_fetch_failed",
            FetchError::IntegrityMismatch { .. } => "integrity_mismatch",
            FetchError::ArchiveCorrupt { .. } => "archive_corrupt",
            FetchError::CacheIo { .. } => "cache_io",
            FetchError::Cancelled { .. } => "cancelled",
        }
    }

    /// HTTP status for remote failures that got a response
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RemoteFetchFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    pub(crate) fn from_download(filename: &str, source: DownloadError) -> Self {
        match source {
            DownloadError::Cancelled => FetchError::Cancelled {
                filename: filename.to_string(),
            },
            // Writing the local file failed; the remote side was fine
            DownloadError::Io(source) => FetchError::CacheIo {
                filename: filename.to_string(),
                source,
            },
            source => FetchError::RemoteFetchFailed {
                filename: filename.to_string(),
                source,
            },
        }
    }

    pub(crate) fn from_archive(filename: &str, source: ArchiveError) -> Self {
        match source {
            ArchiveError::Cancelled => FetchError::Cancelled {
                filename: filename.to_string(),
            },
            source => FetchError::ArchiveCorrupt {
                filename: filename.to_string(),
                source,
            },
        }
    }
}

/// Cache management errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory could not be created or accessed
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No cache location could be determined for this platform
    #[error("Could not determine a default cache directory for this system")]
    NoDefaultDirectory,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read or written
    #[error("Configuration file I/O failed: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format in {path}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration file already exists and force flag not set
    #[error("Configuration file already exists: {path}. Use --force to overwrite")]
    AlreadyExists { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Fetch error for a single key
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Download error outside of a keyed fetch
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Archive error outside of a keyed fetch
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable by retrying the same call
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Fetch(FetchError::RemoteFetchFailed { source, .. })
            | AppError::Download(source) => match source {
                DownloadError::Http(_) => true,
                DownloadError::Status { status } => *status == 429 || *status >= 500,
                _ => false,
            },
            AppError::Fetch(FetchError::IntegrityMismatch { .. }) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Registry(_) => "registry",
            AppError::Fetch(_) => "fetch",
            AppError::Download(_) => "download",
            AppError::Archive(_) => "archive",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Registry result type alias
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Archive result type alias
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
