//! FARS Fetcher CLI application
//!
//! Command-line interface for fetching, verifying and unpacking FARS dataset
//! archives into a local cache.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library (module is public but not re-exported)
use fars_fetcher::cli::{
    handle_all, handle_config, handle_fetch, handle_info, handle_mapping, handle_range,
    handle_verify, handle_year, Cli, Commands,
};
use fars_fetcher::config::AppConfig;
use fars_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // `config init` must work even when the existing file is broken
    if let Commands::Config(args) = &cli.command {
        init_logging(&cli, "warn");
        return handle_config(&cli.global, args).await;
    }

    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    cli.global.apply_to(&mut config);
    init_logging(&cli, &config.logging.level);

    info!("FARS Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Fetch(args) => handle_fetch(&config, args).await,
        Commands::Year(args) => handle_year(&config, args).await,
        Commands::Range(args) => handle_range(&config, args).await,
        Commands::All(args) => handle_all(&config, args).await,
        Commands::Mapping => handle_mapping(&config).await,
        Commands::Verify(args) => handle_verify(&config, args).await,
        Commands::Info => handle_info(&config).await,
        Commands::Config(args) => handle_config(&cli.global, args).await,
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, default_level: &str) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| default_level.to_string());

    let filter = EnvFilter::from_default_env();
    let filter = match format!("fars_fetcher={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
