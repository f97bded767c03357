//! Terminal progress display for fetch operations
//!
//! [`ProgressDisplay`] is a [`ProgressObserver`] that renders one indicatif
//! bar per file in flight: a byte bar while downloading and a member bar
//! while extracting. Bars are removed once their file is done, so
//! concurrent range fetches show only active work.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::app::progress::{ProgressEvent, ProgressObserver};
use crate::constants::progress;

const DOWNLOAD_TEMPLATE: &str =
    "{spinner:.green} {prefix:>12} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const EXTRACT_TEMPLATE: &str = "{spinner:.green} {prefix:>12} [{bar:30.green/white}] {pos}/{len} files";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix:>12} {msg}";

/// Multi-bar renderer for fetch progress events
pub struct ProgressDisplay {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    download_style: ProgressStyle,
    extract_style: ProgressStyle,
    spinner_style: ProgressStyle,
}

impl ProgressDisplay {
    /// Draw to stderr; indicatif hides output when stderr is not a terminal
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Render nothing while still tracking bar state
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
            download_style: style(DOWNLOAD_TEMPLATE, ProgressStyle::default_bar)
                .progress_chars("##-"),
            extract_style: style(EXTRACT_TEMPLATE, ProgressStyle::default_bar)
                .progress_chars("##-"),
            spinner_style: style(SPINNER_TEMPLATE, ProgressStyle::default_spinner),
        }
    }

    /// Print a line above the bars without tearing them
    pub fn println(&self, message: impl AsRef<str>) {
        if self.multi.println(message.as_ref()).is_err() {
            eprintln!("{}", message.as_ref());
        }
    }

    /// Number of bars currently shown
    pub fn active_bars(&self) -> usize {
        self.bars().len()
    }

    /// Drop any bars left behind by failed fetches
    pub fn clear(&self) {
        for (_, bar) in self.bars().drain() {
            bar.finish_and_clear();
        }
    }

    fn start_bar(&self, filename: &str, bar: ProgressBar) {
        bar.set_prefix(filename.to_string());
        bar.enable_steady_tick(Duration::from_millis(progress::UPDATE_FREQUENCY_MS));
        let bar = self.multi.add(bar);
        if let Some(previous) = self.bars().insert(filename.to_string(), bar) {
            previous.finish_and_clear();
        }
    }

    fn finish_bar(&self, filename: &str) {
        if let Some(bar) = self.bars().remove(filename) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    fn with_bar(&self, filename: &str, update: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.bars().get(filename) {
            update(bar);
        }
    }

    fn bars(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProgressBar>> {
        self.bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressDisplay {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::DownloadStarted {
                filename,
                total_bytes: Some(total),
            } => {
                let bar = ProgressBar::new(*total).with_style(self.download_style.clone());
                self.start_bar(filename, bar);
            }
            ProgressEvent::DownloadStarted {
                filename,
                total_bytes: None,
            } => {
                let bar = ProgressBar::new_spinner().with_style(self.spinner_style.clone());
                bar.set_message("downloading");
                self.start_bar(filename, bar);
            }
            ProgressEvent::Downloaded {
                filename,
                bytes_done,
                ..
            } => self.with_bar(filename, |bar| bar.set_position(*bytes_done)),
            ProgressEvent::DownloadFinished { filename, .. } => self.finish_bar(filename),
            ProgressEvent::ExtractionStarted {
                filename,
                items_total,
            } => {
                let bar =
                    ProgressBar::new(*items_total as u64).with_style(self.extract_style.clone());
                self.start_bar(filename, bar);
            }
            ProgressEvent::Extracted {
                filename,
                items_done,
                ..
            } => self.with_bar(filename, |bar| bar.set_position(*items_done as u64)),
            ProgressEvent::ExtractionFinished { filename, .. } => self.finish_bar(filename),
        }
    }
}

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    fallback().template(template).unwrap_or_else(|_| fallback())
}
