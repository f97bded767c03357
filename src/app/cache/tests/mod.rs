//! Orchestration tests for the fetch cache
//!
//! These tests drive [`FetchCache`] with an in-memory downloader that serves
//! scripted bodies and counts every call, so cache hits and re-downloads can
//! be asserted without a network.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::app::cache::{CacheConfig, CacheLayout, FetchCache, FetchOutcome, FileCheck};
use crate::app::cancel::CancelToken;
use crate::app::client::{DownloadSummary, Downloader};
use crate::app::hash::Sha256Hash;
use crate::app::progress::{ProgressEvent, ProgressObserver, SharedObserver};
use crate::app::registry::{Registry, RegistryEntry};
use crate::errors::{AppError, DownloadError, DownloadResult, FetchError};

enum MockResponse {
    Body(Vec<u8>),
    Status(u16),
}

/// Downloader that serves scripted responses by URL
#[derive(Default)]
struct MockDownloader {
    responses: HashMap<String, MockResponse>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockDownloader {
    fn serve(mut self, filename: &str, body: &[u8]) -> Self {
        self.responses
            .insert(url_for(filename), MockResponse::Body(body.to_vec()));
        self
    }

    fn fail(mut self, filename: &str, status: u16) -> Self {
        self.responses
            .insert(url_for(filename), MockResponse::Status(status));
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downloader for MockDownloader {
    async fn download(
        &self,
        url: &str,
        target: &Path,
        observer: Option<&dyn ProgressObserver>,
        cancel: &CancelToken,
    ) -> DownloadResult<DownloadSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        match self.responses.get(url) {
            Some(MockResponse::Body(body)) => {
                tokio::fs::write(target, body).await?;
                if let Some(observer) = observer {
                    observer.on_event(&ProgressEvent::DownloadFinished {
                        filename: url.rsplit('/').next().unwrap_or(url).to_string(),
                        bytes: body.len() as u64,
                    });
                }
                Ok(DownloadSummary {
                    bytes_written: body.len() as u64,
                    status: 200,
                    content_length: Some(body.len() as u64),
                })
            }
            Some(MockResponse::Status(status)) => Err(DownloadError::Status { status: *status }),
            None => Err(DownloadError::Status { status: 404 }),
        }
    }
}

fn url_for(filename: &str) -> String {
    format!("https://mock.test/files/{}", filename)
}

fn entry(filename: &str, content: &[u8]) -> RegistryEntry {
    RegistryEntry {
        filename: filename.to_string(),
        expected_hash: Sha256Hash::digest(content).to_hex(),
        source_url: url_for(filename),
    }
}

fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

async fn cache_with(
    temp_dir: &TempDir,
    registry: Registry,
    downloader: MockDownloader,
) -> FetchCache<MockDownloader> {
    let config = CacheConfig::with_cache_root(temp_dir.path().join("cache"));
    FetchCache::with_downloader(config, registry, downloader)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_fetch_one_twice_downloads_once() {
    let temp_dir = TempDir::new().unwrap();
    let content = b"mapping content";
    let registry = Registry::from_iter([entry("mapping.dict", content)]);
    let downloader = MockDownloader::default().serve("mapping.dict", content);
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let first = cache.fetch_one("mapping.dict").await.unwrap();
    let second = cache.fetch_one("mapping.dict").await.unwrap();

    let expected_path = cache.cache_root().join("mapping.dict");
    assert_eq!(
        first,
        FetchOutcome::Downloaded {
            path: expected_path.clone(),
            bytes: content.len() as u64,
        }
    );
    assert_eq!(second, FetchOutcome::CacheHit { path: expected_path });
    assert_eq!(cache.downloader().calls(), 1);
}

#[tokio::test]
async fn test_tampered_file_is_redownloaded() {
    let temp_dir = TempDir::new().unwrap();
    let content = b"genuine bytes";
    let registry = Registry::from_iter([entry("2010.zip", content)]);
    let downloader = MockDownloader::default().serve("2010.zip", content);
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let path = cache.fetch_one("2010.zip").await.unwrap().into_path();
    std::fs::write(&path, b"tampered").unwrap();

    let outcome = cache.fetch_one("2010.zip").await.unwrap();
    assert!(outcome.was_downloaded());
    assert_eq!(std::fs::read(&path).unwrap(), content);
    assert_eq!(cache.downloader().calls(), 2);
}

#[tokio::test]
async fn test_hash_check_disabled_accepts_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([entry("2011.zip", b"expected")]);
    let config = CacheConfig::with_cache_root(temp_dir.path().join("cache")).with_check_hash(false);
    let cache = FetchCache::with_downloader(config, registry, MockDownloader::default())
        .await
        .unwrap();

    let path = cache.cache_root().join("2011.zip");
    std::fs::write(&path, b"anything at all").unwrap();

    let outcome = cache.fetch_one("2011.zip").await.unwrap();
    assert_eq!(outcome, FetchOutcome::Unchecked { path });
    assert_eq!(cache.downloader().calls(), 0);
    assert!(!cache.check_hash());
}

#[tokio::test]
async fn test_hash_check_disabled_skips_post_download_verification() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([entry("mapping.dict", b"expected")]);
    let config = CacheConfig::with_cache_root(temp_dir.path().join("cache")).with_check_hash(false);
    let downloader = MockDownloader::default().serve("mapping.dict", b"different");
    let cache = FetchCache::with_downloader(config, registry, downloader)
        .await
        .unwrap();

    let outcome = cache.fetch_one("mapping.dict").await.unwrap();
    assert!(outcome.was_downloaded());
}

#[tokio::test]
async fn test_matching_local_archive_is_cache_hit() {
    let temp_dir = TempDir::new().unwrap();
    let archive = zip_bytes(&[("ACCIDENT.CSV", b"case")]);
    let registry = Registry::from_iter([entry("2018.zip", &archive)]);
    let cache = cache_with(&temp_dir, registry, MockDownloader::default()).await;

    std::fs::write(cache.cache_root().join("2018.zip"), &archive).unwrap();

    let outcome = cache.fetch_one("2018.zip").await.unwrap();
    assert_eq!(
        outcome,
        FetchOutcome::CacheHit {
            path: temp_dir.path().join("cache").join("2018.zip"),
        }
    );
    assert_eq!(cache.downloader().calls(), 0);
}

#[tokio::test]
async fn test_unknown_resource() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_with(&temp_dir, Registry::default(), MockDownloader::default()).await;

    let error = cache.fetch_one("1900.zip").await.unwrap_err();
    assert!(matches!(error, FetchError::UnknownResource { .. }));
    assert_eq!(error.filename(), "1900.zip");
    assert_eq!(error.kind(), "unknown_resource");
    assert_eq!(cache.downloader().calls(), 0);
}

#[tokio::test]
async fn test_remote_failure_carries_status() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([entry("2012.zip", b"x")]);
    let downloader = MockDownloader::default().fail("2012.zip", 503);
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let error = cache.fetch_one("2012.zip").await.unwrap_err();
    assert!(matches!(error, FetchError::RemoteFetchFailed { .. }));
    assert_eq!(error.status(), Some(503));
    assert_eq!(error.filename(), "2012.zip");
}

#[tokio::test]
async fn test_integrity_mismatch_after_download() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([entry("2013.zip", b"expected")]);
    let downloader = MockDownloader::default().serve("2013.zip", b"corrupted in transit");
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let error = cache.fetch_one("2013.zip").await.unwrap_err();
    match &error {
        FetchError::IntegrityMismatch {
            filename,
            expected,
            actual,
        } => {
            assert_eq!(filename, "2013.zip");
            assert_eq!(expected, &Sha256Hash::digest(b"expected").to_hex());
            assert_eq!(actual, &Sha256Hash::digest(b"corrupted in transit").to_hex());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The mismatching file stays on disk; the next fetch downloads again
    assert!(cache.cache_root().join("2013.zip").exists());
    let _ = cache.fetch_one("2013.zip").await;
    assert_eq!(cache.downloader().calls(), 2);
}

#[tokio::test]
async fn test_fetch_year_extracts_into_deterministic_directory() {
    let temp_dir = TempDir::new().unwrap();
    let archive = zip_bytes(&[("ACCIDENT.CSV", b"a"), ("PERSON.CSV", b"p")]);
    let registry = Registry::from_iter([entry("2018.zip", &archive)]);
    let downloader = MockDownloader::default().serve("2018.zip", &archive);
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let files = cache.fetch_year(2018).await.unwrap();
    let extract_dir = cache.cache_root().join("2018.unzip");
    assert_eq!(
        files,
        vec![extract_dir.join("ACCIDENT.CSV"), extract_dir.join("PERSON.CSV")]
    );
    assert_eq!(cache.layout().extract_dir("2018.zip"), extract_dir);

    // Second call reuses the verified archive
    let again = cache.fetch_year(2018).await.unwrap();
    assert_eq!(again, files);
    assert_eq!(cache.downloader().calls(), 1);
}

#[tokio::test]
async fn test_extraction_directory_is_stable_across_instances() {
    let temp_dir = TempDir::new().unwrap();
    let archive = zip_bytes(&[("data.csv", b"1")]);

    for _ in 0..2 {
        let registry = Registry::from_iter([entry("F.zip", &archive)]);
        let downloader = MockDownloader::default().serve("F.zip", &archive);
        let cache = cache_with(&temp_dir, registry, downloader).await;

        let report = cache.fetch_all().await;
        assert!(report.is_complete_success());
        assert_eq!(
            report.extracted["F.zip"],
            vec![temp_dir.path().join("cache").join("F.unzip").join("data.csv")]
        );
    }
}

#[tokio::test]
async fn test_corrupt_archive_reports_archive_error() {
    let temp_dir = TempDir::new().unwrap();
    let bogus = b"not a zip archive";
    let registry = Registry::from_iter([entry("2014.zip", bogus)]);
    let downloader = MockDownloader::default().serve("2014.zip", bogus);
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let error = cache.fetch_year(2014).await.unwrap_err();
    assert!(matches!(error, FetchError::ArchiveCorrupt { .. }));
    assert_eq!(error.kind(), "archive_corrupt");
}

#[tokio::test]
async fn test_fetch_all_is_best_effort() {
    let temp_dir = TempDir::new().unwrap();
    let archive = zip_bytes(&[("ACCIDENT.CSV", b"ok")]);
    let mapping = b"mapping";
    let registry = Registry::from_iter([
        entry("2018.zip", &archive),
        entry("2019.zip", b"never served"),
        entry("mapping.dict", mapping),
    ]);
    let downloader = MockDownloader::default()
        .serve("2018.zip", &archive)
        .fail("2019.zip", 404)
        .serve("mapping.dict", mapping);
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let report = cache.fetch_all().await;

    assert_eq!(report.extracted.len(), 1);
    assert_eq!(
        report.extracted["2018.zip"],
        vec![cache.cache_root().join("2018.unzip").join("ACCIDENT.CSV")]
    );
    assert_eq!(
        report.mappings["mapping.dict"],
        cache.cache_root().join("mapping.dict")
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures["2019.zip"].status(), Some(404));
    assert!(!cache.cache_root().join("mapping.unzip").exists());
}

#[tokio::test]
async fn test_fetch_range_collects_per_year_results() {
    let temp_dir = TempDir::new().unwrap();
    let archive = zip_bytes(&[("A.CSV", b"a")]);
    let registry = Registry::from_iter([entry("2016.zip", &archive), entry("2018.zip", &archive)]);
    let downloader = MockDownloader::default()
        .serve("2016.zip", &archive)
        .serve("2018.zip", &archive);
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let report = cache.fetch_range(2016, 2018).await;

    assert_eq!(report.len(), 3);
    assert_eq!(report.succeeded().count(), 2);
    let failures: Vec<_> = report.failed().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 2017);
    assert!(matches!(failures[0].1, FetchError::UnknownResource { .. }));
}

#[tokio::test]
async fn test_inverted_range_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_with(&temp_dir, Registry::default(), MockDownloader::default()).await;

    let report = cache.fetch_range(2020, 2010).await;
    assert!(report.is_empty());
    assert_eq!(cache.downloader().calls(), 0);
}

#[tokio::test]
async fn test_concurrent_same_key_downloads_once() {
    let temp_dir = TempDir::new().unwrap();
    let content = b"shared";
    let registry = Registry::from_iter([entry("2015.zip", content)]);
    let downloader = MockDownloader::default()
        .serve("2015.zip", content)
        .with_delay(Duration::from_millis(50));
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let (first, second, third) = tokio::join!(
        cache.fetch_one("2015.zip"),
        cache.fetch_one("2015.zip"),
        cache.fetch_one("2015.zip")
    );

    let outcomes = [first.unwrap(), second.unwrap(), third.unwrap()];
    assert_eq!(outcomes.iter().filter(|o| o.was_downloaded()).count(), 1);
    assert_eq!(cache.downloader().calls(), 1);
}

#[tokio::test]
async fn test_fetch_mapping() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([entry("mapping.dict", b"{}")]);
    let downloader = MockDownloader::default().serve("mapping.dict", b"{}");
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let path = cache.fetch_mapping().await.unwrap();
    assert_eq!(path, cache.cache_root().join("mapping.dict"));
}

#[tokio::test]
async fn test_fetch_mapping_missing_from_registry() {
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_with(&temp_dir, Registry::default(), MockDownloader::default()).await;

    let error = cache.fetch_mapping().await.unwrap_err();
    assert_eq!(error.filename(), "mapping.dict");
}

#[tokio::test]
async fn test_verify_cache_makes_no_downloads() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([
        entry("good.zip", b"good"),
        entry("bad.zip", b"bad"),
        entry("gone.zip", b"gone"),
    ]);
    let cache = cache_with(&temp_dir, registry, MockDownloader::default()).await;
    std::fs::write(cache.cache_root().join("good.zip"), b"good").unwrap();
    std::fs::write(cache.cache_root().join("bad.zip"), b"tampered").unwrap();

    let report = cache.verify_cache().await;

    assert_eq!(report.files_checked, 3);
    assert_eq!(report.files_verified, 1);
    assert_eq!(report.files_missing, 1);
    assert_eq!(report.files_corrupt, 1);
    let checks: HashMap<_, _> = report
        .failed_files
        .iter()
        .map(|f| (f.filename.as_str(), &f.check))
        .collect();
    assert_eq!(
        checks["bad.zip"],
        &FileCheck::Mismatch {
            actual: Sha256Hash::digest(b"tampered")
        }
    );
    assert_eq!(checks["gone.zip"], &FileCheck::Missing);
    assert_eq!(cache.downloader().calls(), 0);
}

#[tokio::test]
async fn test_progress_events_follow_show_progress() {
    let archive = zip_bytes(&[("A.CSV", b"a")]);

    for show_progress in [true, false] {
        let temp_dir = TempDir::new().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let observer: SharedObserver = Arc::new(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(event.clone());
        });

        let config = CacheConfig::with_cache_root(temp_dir.path().to_path_buf())
            .with_show_progress(show_progress);
        let registry = Registry::from_iter([entry("2017.zip", &archive)]);
        let downloader = MockDownloader::default().serve("2017.zip", &archive);
        let cache = FetchCache::with_downloader(config, registry, downloader)
            .await
            .unwrap()
            .with_progress(observer);

        cache.fetch_year(2017).await.unwrap();

        let events = events.lock().unwrap();
        if show_progress {
            assert!(events
                .iter()
                .any(|e| matches!(e, ProgressEvent::DownloadFinished { .. })));
            assert!(events
                .iter()
                .any(|e| matches!(e, ProgressEvent::ExtractionFinished { files: 1, .. })));
        } else {
            assert!(events.is_empty());
        }
    }
}

#[tokio::test]
async fn test_cancelled_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let archive = zip_bytes(&[("A.CSV", b"a")]);
    let registry = Registry::from_iter([entry("2016.zip", &archive)]);
    let cache = cache_with(&temp_dir, registry, MockDownloader::default()).await;
    std::fs::write(cache.cache_root().join("2016.zip"), &archive).unwrap();

    cache.cancel_token().cancel();
    let error = cache.fetch_year(2016).await.unwrap_err();
    assert!(matches!(error, FetchError::Cancelled { .. }));
    assert_eq!(cache.downloader().calls(), 0);
    assert!(!cache.cache_root().join("2016.unzip").join("A.CSV").exists());
}

#[tokio::test]
async fn test_replaced_cancel_token_reaches_downloads() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([entry("mapping.dict", b"map")]);
    let downloader = MockDownloader::default().serve("mapping.dict", b"map");
    let cancel = CancelToken::new();
    let cache = cache_with(&temp_dir, registry, downloader)
        .await
        .with_cancel_token(cancel.clone());

    cancel.cancel();
    let error = cache.fetch_one("mapping.dict").await.unwrap_err();
    assert!(matches!(error, FetchError::Cancelled { .. }));
    assert!(!cache.cache_root().join("mapping.dict").exists());
}

#[tokio::test]
async fn test_keys_that_escape_the_cache_root_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::from_iter([
        entry("../escaped.dict", b"outside"),
        entry("../escaped.zip", b"outside"),
        entry("mapping.dict", b"map"),
    ]);
    let downloader = MockDownloader::default()
        .serve("../escaped.dict", b"outside")
        .serve("../escaped.zip", b"outside")
        .serve("mapping.dict", b"map");
    let cache = cache_with(&temp_dir, registry, downloader).await;

    let error = cache.fetch_one("../escaped.dict").await.unwrap_err();
    assert!(matches!(error, FetchError::UnsafeKey { .. }));
    assert_eq!(error.filename(), "../escaped.dict");
    assert!(!temp_dir.path().join("escaped.dict").exists());

    let report = cache.fetch_all().await;
    assert!(matches!(
        report.failures["../escaped.zip"],
        FetchError::UnsafeKey { .. }
    ));
    assert!(report.mappings.contains_key("mapping.dict"));
    assert_eq!(cache.downloader().calls(), 1);

    let audit = cache.verify_cache().await;
    assert_eq!(audit.files_corrupt, 2);
    assert_eq!(audit.files_verified, 1);
}

#[tokio::test]
async fn test_project_dir_layout_is_created() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("study");
    let config = CacheConfig::default().with_project_dir(project.clone());

    let cache = FetchCache::with_downloader(config, Registry::default(), MockDownloader::default())
        .await
        .unwrap();

    assert_eq!(cache.cache_root(), project.join("data").join("fars"));
    assert!(cache.cache_root().is_dir());
    assert!(cache.show_progress());
    assert_eq!(CacheLayout::archive_name(2018), "2018.zip");
}

#[tokio::test]
async fn test_new_loads_registry_from_cache_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("cache");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(
        root.join("registry.txt"),
        "2018.zip abc https://example.org/2018.zip\nmalformed line\n",
    )
    .unwrap();

    let cache = FetchCache::new(CacheConfig::with_cache_root(root.clone()))
        .await
        .unwrap();
    assert_eq!(cache.registry().len(), 1);
    assert!(cache.registry().contains("2018.zip"));
    assert_eq!(cache.cache_root(), root);
}

#[tokio::test]
async fn test_new_without_registry_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig::with_cache_root(temp_dir.path().join("empty"));

    let result = FetchCache::new(config).await;
    assert!(matches!(result, Err(AppError::Registry(_))));
}
