//! Streaming file downloads
//!
//! The response body is written chunk by chunk straight into the target
//! file, so memory use does not grow with the dataset size. A failed or
//! cancelled transfer leaves whatever was written in place; the fetch cache
//! re-verifies and re-downloads on the next call.

use std::path::Path;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::app::cancel::CancelToken;
use crate::app::progress::{ProgressEvent, ProgressObserver};
use crate::constants::{files, progress};
use crate::errors::{DownloadError, DownloadResult};

/// Outcome of a completed download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Bytes written to the target file
    pub bytes_written: u64,
    /// Final HTTP status after redirects
    pub status: u16,
    /// Announced Content-Length, if any
    pub content_length: Option<u64>,
}

/// File download operations handler
pub struct DownloadHandler<'a> {
    client: &'a Client,
    cancel: &'a CancelToken,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler borrowing the shared client
    pub fn new(client: &'a Client, cancel: &'a CancelToken) -> Self {
        Self { client, cancel }
    }

    /// Downloads `url` into `destination`, truncating any existing file
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL cannot be parsed
    /// - The request fails, times out or exceeds the redirect limit
    /// - The server answers with a non-success status
    /// - Writing the file fails
    /// - The cancel token is tripped mid-transfer
    pub async fn download_file(
        &self,
        url: &str,
        destination: &Path,
        observer: Option<&dyn ProgressObserver>,
    ) -> DownloadResult<DownloadSummary> {
        let parsed_url = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })?;
        if self.cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        debug!("Sending request to {}", parsed_url);
        let response = self.client.get(parsed_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length();
        debug!(
            "Response {} from {}, content length: {:?}",
            status,
            response.url(),
            content_length
        );

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let filename = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());

        // Byte progress is only meaningful against a known total
        let mut reporter = match (observer, content_length) {
            (Some(observer), Some(total)) => Some(ByteProgress::new(observer, &filename, total)),
            _ => None,
        };
        if let Some(reporter) = &reporter {
            reporter.started();
        }

        let mut file = File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut bytes_written = 0u64;

        while let Some(chunk) = stream.next().await {
            if self.cancel.is_cancelled() {
                file.flush().await?;
                debug!(
                    "Download of {} cancelled after {} bytes",
                    filename, bytes_written
                );
                return Err(DownloadError::Cancelled);
            }

            let chunk = chunk?;
            file.write_all(&chunk).await?;

            let before = bytes_written;
            bytes_written += chunk.len() as u64;
            let interval = files::DOWNLOAD_LOG_INTERVAL;
            if bytes_written / interval > before / interval {
                debug!(
                    "Downloaded {:.2} MB of {} so far",
                    bytes_written as f64 / (1024.0 * 1024.0),
                    filename
                );
            }

            if let Some(reporter) = reporter.as_mut() {
                reporter.advance(bytes_written);
            }
        }

        file.flush().await?;

        if let Some(reporter) = reporter.as_mut() {
            reporter.finish(bytes_written);
        }

        info!("Download completed: {} ({} bytes)", filename, bytes_written);
        Ok(DownloadSummary {
            bytes_written,
            status: status.as_u16(),
            content_length,
        })
    }
}

/// Rate-limited byte progress emitter
struct ByteProgress<'a> {
    observer: &'a dyn ProgressObserver,
    filename: String,
    total: u64,
    last_emit: Instant,
    interval: Duration,
}

impl<'a> ByteProgress<'a> {
    fn new(observer: &'a dyn ProgressObserver, filename: &str, total: u64) -> Self {
        Self {
            observer,
            filename: filename.to_string(),
            total,
            last_emit: Instant::now(),
            interval: Duration::from_millis(progress::UPDATE_FREQUENCY_MS),
        }
    }

    fn started(&self) {
        self.observer.on_event(&ProgressEvent::DownloadStarted {
            filename: self.filename.clone(),
            total_bytes: Some(self.total),
        });
    }

    fn advance(&mut self, bytes_done: u64) {
        if self.last_emit.elapsed() >= self.interval {
            self.emit(bytes_done);
        }
    }

    fn finish(&mut self, bytes_done: u64) {
        self.emit(bytes_done);
        self.observer.on_event(&ProgressEvent::DownloadFinished {
            filename: self.filename.clone(),
            bytes: bytes_done,
        });
    }

    fn emit(&mut self, bytes_done: u64) {
        self.last_emit = Instant::now();
        self.observer.on_event(&ProgressEvent::Downloaded {
            filename: self.filename.clone(),
            bytes_done,
            bytes_total: self.total,
        });
    }
}
