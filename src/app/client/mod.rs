//! HTTP download client
//!
//! The fetch cache talks to the network only through the [`Downloader`]
//! trait. [`HttpDownloader`] is the production implementation on top of
//! reqwest; tests substitute an in-memory implementation to count and
//! script downloads.
//!
//! The module is organized into:
//! - `config`: HTTP client configuration and building
//! - `download`: streaming download into a target file

use std::future::Future;
use std::path::Path;

use reqwest::Client;

use crate::app::cancel::CancelToken;
use crate::app::progress::ProgressObserver;
use crate::errors::DownloadResult;

pub mod config;
pub mod download;

pub use config::ClientConfig;
pub use download::{DownloadHandler, DownloadSummary};

/// Retrieves a remote resource into a local file
pub trait Downloader: Send + Sync {
    /// Download `url` into `target`, reporting progress to `observer` when given.
    ///
    /// Implementations must follow redirects, bound every network call with a
    /// timeout, stream rather than buffer the body, map non-2xx responses to
    /// `DownloadError::Status`, and leave partial files in place on failure.
    /// Once `cancel` is tripped the transfer stops with `DownloadError::Cancelled`.
    fn download(
        &self,
        url: &str,
        target: &Path,
        observer: Option<&dyn ProgressObserver>,
        cancel: &CancelToken,
    ) -> impl Future<Output = DownloadResult<DownloadSummary>> + Send;
}

/// reqwest-backed downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Creates a downloader with the default client configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Http` if the TLS backend cannot be initialized
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Creates a downloader with custom client configuration
    pub fn with_config(config: &ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        tracing::debug!(
            "Created HTTP downloader (connect timeout {:?}, read timeout {:?})",
            config.connect_timeout,
            config.read_timeout
        );
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        target: &Path,
        observer: Option<&dyn ProgressObserver>,
        cancel: &CancelToken,
    ) -> DownloadResult<DownloadSummary> {
        DownloadHandler::new(&self.client, cancel)
            .download_file(url, target, observer)
            .await
    }
}
