//! Push-based progress reporting
//!
//! The fetch pipeline never draws anything itself. It pushes
//! [`ProgressEvent`]s to a [`ProgressObserver`], which the CLI renders with
//! progress bars and tests record into a vector. Events are advisory only;
//! dropping them never changes the outcome of a fetch.

use std::sync::Arc;

/// Observable progress of a download or extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A download has started; `total_bytes` is the announced Content-Length
    DownloadStarted {
        filename: String,
        total_bytes: Option<u64>,
    },
    /// Bytes transferred so far
    Downloaded {
        filename: String,
        bytes_done: u64,
        bytes_total: u64,
    },
    /// Download completed
    DownloadFinished { filename: String, bytes: u64 },
    /// Extraction has started
    ExtractionStarted { filename: String, items_total: usize },
    /// Archive members unpacked so far
    Extracted {
        filename: String,
        items_done: usize,
        items_total: usize,
    },
    /// Extraction completed
    ExtractionFinished { filename: String, files: usize },
}

impl ProgressEvent {
    /// File the event refers to
    pub fn filename(&self) -> &str {
        match self {
            ProgressEvent::DownloadStarted { filename, .. }
            | ProgressEvent::Downloaded { filename, .. }
            | ProgressEvent::DownloadFinished { filename, .. }
            | ProgressEvent::ExtractionStarted { filename, .. }
            | ProgressEvent::Extracted { filename, .. }
            | ProgressEvent::ExtractionFinished { filename, .. } => filename,
        }
    }
}

/// Receiver of progress events
pub trait ProgressObserver: Send + Sync {
    /// Called synchronously from the fetch pipeline; keep it cheap
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Shared observer handle
pub type SharedObserver = Arc<dyn ProgressObserver>;
