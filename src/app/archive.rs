//! Zip extraction and inventory
//!
//! Extraction runs on the blocking thread pool because the zip reader is
//! synchronous. After unpacking, the destination directory is walked and
//! every regular file in it is reported, including files that were there
//! before. Callers are expected to give each archive its own directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::app::cancel::CancelToken;
use crate::app::progress::{ProgressEvent, SharedObserver};
use crate::errors::{ArchiveError, ArchiveResult};

/// Unpack `archive` into `dest` and list the resulting files
///
/// `dest` and its parents are created if missing. Partial extraction is not
/// rolled back on failure.
///
/// # Errors
///
/// - `ArchiveError::Corrupt` if the archive cannot be opened or parsed, or a
///   member name would escape `dest`
/// - `ArchiveError::Io` if writing a member fails
/// - `ArchiveError::Cancelled` if `cancel` is tripped between members
pub async fn extract_archive(
    archive: &Path,
    dest: &Path,
    observer: Option<SharedObserver>,
    cancel: &CancelToken,
) -> ArchiveResult<Vec<PathBuf>> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let cancel = cancel.clone();

    tokio::task::spawn_blocking(move || {
        unpack(&archive, &dest, observer.as_ref(), &cancel)?;
        list_extracted(&dest)
    })
    .await
    .map_err(|e| ArchiveError::Io(io::Error::new(io::ErrorKind::Other, e)))?
}

/// Every regular file under `dest`, sorted
///
/// # Errors
///
/// Returns `ArchiveError::Io` if the directory cannot be walked
pub fn list_extracted(dest: &Path) -> ArchiveResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dest) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn unpack(
    archive_path: &Path,
    dest: &Path,
    observer: Option<&SharedObserver>,
    cancel: &CancelToken,
) -> ArchiveResult<()> {
    let corrupt = |reason: String| ArchiveError::Corrupt {
        path: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| corrupt(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;
    fs::create_dir_all(dest)?;

    let filename = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let items_total = archive.len();

    info!(
        "Extracting {} ({} members) into {}",
        filename,
        items_total,
        dest.display()
    );
    if let Some(observer) = observer {
        observer.on_event(&ProgressEvent::ExtractionStarted {
            filename: filename.clone(),
            items_total,
        });
    }

    for index in 0..items_total {
        if cancel.is_cancelled() {
            debug!("Extraction of {} cancelled at member {}", filename, index);
            return Err(ArchiveError::Cancelled);
        }

        let mut member = archive
            .by_index(index)
            .map_err(|e| corrupt(e.to_string()))?;
        let relative = member
            .enclosed_name()
            .ok_or_else(|| corrupt(format!("unsafe member path {:?}", member.name())))?;
        let out_path = dest.join(relative);

        if member.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            io::copy(&mut member, &mut out).map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData => corrupt(e.to_string()),
                _ => ArchiveError::Io(e),
            })?;
        }

        if let Some(observer) = observer {
            observer.on_event(&ProgressEvent::Extracted {
                filename: filename.clone(),
                items_done: index + 1,
                items_total,
            });
        }
    }

    if let Some(observer) = observer {
        observer.on_event(&ProgressEvent::ExtractionFinished {
            filename,
            files: items_total,
        });
    }
    Ok(())
}
