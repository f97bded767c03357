//! Command-line argument parsing for FARS Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Global
//! flags override the config file and environment; subcommands map onto the
//! fetch cache operations.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::constants::workers;

/// FARS Fetcher - download and verify FARS dataset archives
#[derive(Parser, Debug)]
#[command(
    name = "fars-fetcher",
    version,
    about = "Download, verify and unpack FARS dataset archives",
    long_about = "Fetches dataset files listed in a registry manifest into a local cache.
Cached files are checked against their SHA-256 hashes and only downloaded again when
missing or damaged. Yearly zip archives are unpacked next to the cached archive."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Project directory; the cache defaults to <DIR>/data/fars
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Registry manifest path
    #[arg(long, global = true, value_name = "FILE")]
    pub registry: Option<PathBuf>,

    /// Accept cached files without checking their hash
    #[arg(long, global = true)]
    pub no_hash_check: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch registry files by name
    Fetch(FetchArgs),

    /// Fetch and unpack the archive for one year
    Year(YearArgs),

    /// Fetch and unpack every year in an inclusive range
    Range(RangeArgs),

    /// Fetch every registry entry, unpacking archives
    All(AllArgs),

    /// Fetch the variable mapping file
    Mapping,

    /// Verify cached files against the registry without downloading
    Verify(VerifyArgs),

    /// Show cache location, settings and registry size
    Info,

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Registry filenames (e.g. "2018.zip", "mapping.dict")
    #[arg(value_name = "FILENAME", required = true)]
    pub filenames: Vec<String>,
}

/// Arguments for the year command
#[derive(Args, Debug, Clone)]
pub struct YearArgs {
    /// Dataset year
    #[arg(value_name = "YEAR")]
    pub year: u32,
}

/// Arguments for the range command
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// First year (inclusive)
    #[arg(value_name = "START")]
    pub start: u32,

    /// Last year (inclusive)
    #[arg(value_name = "END")]
    pub end: u32,

    /// Number of concurrent fetches
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,
}

/// Arguments for the all command
#[derive(Args, Debug, Clone)]
pub struct AllArgs {
    /// Number of concurrent fetches
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl GlobalArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.cache_dir {
            config.cache.cache_root = Some(dir.clone());
        }
        if let Some(dir) = &self.project_dir {
            config.cache.project_dir = Some(dir.clone());
        }
        if let Some(path) = &self.registry {
            config.cache.registry = Some(path.clone());
        }
        if self.no_hash_check {
            config.cache.check_hash = false;
        }
        if self.no_progress || self.quiet {
            config.cache.show_progress = false;
        }
    }
}

/// Check a worker count from the command line
pub fn validate_workers(workers: usize) -> Result<usize, String> {
    if workers == 0 || workers > workers::MAX_WORKER_COUNT {
        return Err(format!(
            "Number of workers must be between 1 and {}",
            workers::MAX_WORKER_COUNT
        ));
    }
    Ok(workers)
}
