//! Command handlers for FARS Fetcher CLI
//!
//! This module implements the command handlers that connect parsed CLI
//! arguments to the fetch cache. Each handler prints per-key results and
//! returns an error when any key failed, so the process exits non-zero.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::app::{
    CacheConfig, CacheLayout, EntryKind, FetchCache, FetchError, FetchOutcome, FileCheck,
    Registry, VerificationReport,
};
use crate::cli::progress::ProgressDisplay;
use crate::cli::signals::cancel_on_signal;
use crate::cli::{
    validate_workers, AllArgs, ConfigAction, ConfigArgs, FetchArgs, GlobalArgs, RangeArgs,
    VerifyArgs, YearArgs,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// An opened cache plus the progress display attached to it
struct Session {
    cache: FetchCache,
    display: Option<Arc<ProgressDisplay>>,
}

impl Session {
    /// Build the cache from configuration and hook up progress and Ctrl+C
    async fn open(config: &AppConfig) -> Result<Self> {
        let (cache_config, client_config) = config.to_runtime_config();
        let mut cache = FetchCache::with_client_config(cache_config, &client_config).await?;

        let display = if cache.show_progress() {
            let display = Arc::new(ProgressDisplay::new());
            cache = cache.with_progress(display.clone());
            Some(display)
        } else {
            None
        };

        cancel_on_signal(cache.cancel_token().clone());
        debug!("Opened session on {}", cache.cache_root().display());
        Ok(Self { cache, display })
    }

    /// Remove leftover bars before printing results
    fn finish_progress(&self) {
        if let Some(display) = &self.display {
            display.clear();
        }
    }
}

/// Handle the fetch command
pub async fn handle_fetch(config: &AppConfig, args: &FetchArgs) -> Result<()> {
    let session = Session::open(config).await?;
    let start = Instant::now();

    let mut failures = 0;
    for filename in &args.filenames {
        let result = session.cache.fetch_one(filename).await;
        session.finish_progress();
        match result {
            Ok(outcome) => println!("✅ {}", describe_outcome(filename, &outcome)),
            Err(e) => {
                failures += 1;
                print_failure(&e);
            }
        }
    }

    info!(
        "Fetched {} files in {:.2}s",
        args.filenames.len(),
        start.elapsed().as_secs_f64()
    );
    batch_result(failures, args.filenames.len())
}

/// Handle the year command
pub async fn handle_year(config: &AppConfig, args: &YearArgs) -> Result<()> {
    let session = Session::open(config).await?;
    let result = session.cache.fetch_year(args.year).await;
    session.finish_progress();

    let files = result?;
    let extract_dir = session
        .cache
        .layout()
        .extract_dir(&CacheLayout::archive_name(args.year));
    println!(
        "✅ {}: {} files in {}",
        args.year,
        files.len(),
        extract_dir.display()
    );
    for file in &files {
        debug!("  {}", file.display());
    }
    Ok(())
}

/// Handle the range command
pub async fn handle_range(config: &AppConfig, args: &RangeArgs) -> Result<()> {
    let config = with_workers(config, args.workers)?;
    let session = Session::open(&config).await?;
    let start = Instant::now();

    let report = session.cache.fetch_range(args.start, args.end).await;
    session.finish_progress();

    if report.is_empty() {
        println!("No years in range {}..={}", args.start, args.end);
        return Ok(());
    }

    for (year, result) in &report.years {
        match result {
            Ok(files) => println!("✅ {}: {} files", year, files.len()),
            Err(e) => print_failure(e),
        }
    }
    println!(
        "\n{} of {} years available ({:.1}s)",
        report.len() - report.failure_count(),
        report.len(),
        start.elapsed().as_secs_f64()
    );

    batch_result(report.failure_count(), report.len())
}

/// Handle the all command
pub async fn handle_all(config: &AppConfig, args: &AllArgs) -> Result<()> {
    let config = with_workers(config, args.workers)?;
    let session = Session::open(&config).await?;

    let report = session.cache.fetch_all().await;
    session.finish_progress();

    if args.json {
        println!("{}", to_pretty_json(&report.to_json())?);
    } else {
        for (filename, files) in &report.extracted {
            println!("✅ {}: {} files", filename, files.len());
        }
        for (filename, path) in &report.mappings {
            println!("✅ {}: {}", filename, path.display());
        }
        for error in report.failures.values() {
            print_failure(error);
        }
        println!(
            "\n{} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
    }

    batch_result(
        report.failure_count(),
        report.success_count() + report.failure_count(),
    )
}

/// Handle the mapping command
pub async fn handle_mapping(config: &AppConfig) -> Result<()> {
    let session = Session::open(config).await?;
    let result = session.cache.fetch_mapping().await;
    session.finish_progress();

    let path = result?;
    println!("{}", path.display());
    Ok(())
}

/// Handle the verify command
pub async fn handle_verify(config: &AppConfig, args: &VerifyArgs) -> Result<()> {
    let session = Session::open(config).await?;
    let report = session.cache.verify_cache().await;

    if args.json {
        let value = serde_json::to_value(&report)
            .map_err(|e| AppError::generic(format!("Failed to encode report: {}", e)))?;
        println!("{}", to_pretty_json(&value)?);
    } else {
        print_verification_report(&report);
    }

    if report.is_successful() {
        Ok(())
    } else {
        Err(AppError::generic(format!(
            "{} of {} cached files failed verification",
            report.problem_count(),
            report.files_checked
        )))
    }
}

/// Handle the info command
///
/// Works without a readable registry so it can be used to diagnose setup.
pub async fn handle_info(config: &AppConfig) -> Result<()> {
    let (cache_config, client_config) = config.to_runtime_config();
    let cache_root = cache_config.resolve_cache_root()?;
    let registry_path = cache_config.resolve_registry_path(&cache_root);

    println!("💾 Cache Information");
    println!("===================");
    println!("Location:       {}", cache_root.display());
    println!("Registry:       {}", registry_path.display());
    match Registry::load(&registry_path).await {
        Ok(registry) => {
            let archives = registry.iter().filter(|e| e.kind() == EntryKind::Archive).count();
            println!(
                "Entries:        {} ({} archives, {} plain)",
                registry.len(),
                archives,
                registry.len() - archives
            );
        }
        Err(e) => println!("Entries:        unavailable ({})", e),
    }
    print_settings(&cache_config);
    println!(
        "Timeouts:       connect {}s, read {}s",
        client_config.connect_timeout.as_secs(),
        client_config.read_timeout.as_secs()
    );
    Ok(())
}

/// Handle configuration management
pub async fn handle_config(global: &GlobalArgs, args: &ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init { force } => {
            let path = global
                .config
                .clone()
                .or_else(AppConfig::default_config_path)
                .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

            AppConfig::write_default(&path, force).await?;
            println!("📁 Created default configuration file:");
            println!("   {}", path.display());
            Ok(())
        }
    }
}

fn with_workers(config: &AppConfig, workers: Option<usize>) -> Result<AppConfig> {
    let mut config = config.clone();
    if let Some(workers) = workers {
        config.cache.max_concurrent = validate_workers(workers).map_err(AppError::generic)?;
    }
    Ok(config)
}

fn describe_outcome(filename: &str, outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::CacheHit { path } => {
            format!("{}: cached and verified ({})", filename, path.display())
        }
        FetchOutcome::Unchecked { path } => {
            format!("{}: cached, not verified ({})", filename, path.display())
        }
        FetchOutcome::Downloaded { path, bytes } => format!(
            "{}: downloaded {:.1} MB ({})",
            filename,
            *bytes as f64 / (1024.0 * 1024.0),
            path.display()
        ),
    }
}

fn print_failure(error: &FetchError) {
    eprintln!("❌ [{}] {}", error.kind(), error);
}

fn batch_result(failures: usize, total: usize) -> Result<()> {
    if failures == 0 {
        Ok(())
    } else {
        Err(AppError::generic(format!(
            "{} of {} fetches failed",
            failures, total
        )))
    }
}

fn print_settings(cache_config: &CacheConfig) {
    println!("Hash checking:  {}", on_off(cache_config.check_hash));
    println!("Progress bars:  {}", on_off(cache_config.show_progress));
    println!("Concurrency:    {}", cache_config.max_concurrent);
    if let Some(project) = &cache_config.project_dir {
        println!("Project:        {}", project.display());
    }
}

fn print_verification_report(report: &VerificationReport) {
    println!("🔍 Cache Verification");
    println!("====================");
    println!("Checked:  {}", report.files_checked);
    println!("Verified: {}", report.files_verified);
    println!("Missing:  {}", report.files_missing);
    println!("Corrupt:  {}", report.files_corrupt);
    println!("Time:     {:.2}s", report.verification_time.as_secs_f64());

    if !report.failed_files.is_empty() {
        println!();
        for failure in &report.failed_files {
            println!("  ❌ {}: {}", failure.filename, failure.check);
            if !matches!(failure.check, FileCheck::Missing) {
                println!("     expected {}", failure.expected_hash);
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn to_pretty_json(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::generic(format!("Failed to encode JSON: {}", e)))
}
