//! Command-line interface components
//!
//! This module contains CLI-specific code for the FARS Fetcher application,
//! including argument parsing, command handlers, progress display and
//! signal handling.

pub mod args;
pub mod commands;
pub mod progress;
pub mod signals;

pub use args::{
    validate_workers, AllArgs, Cli, Commands, ConfigAction, ConfigArgs, FetchArgs, GlobalArgs,
    RangeArgs, VerifyArgs, YearArgs,
};
pub use commands::{
    handle_all, handle_config, handle_fetch, handle_info, handle_mapping, handle_range,
    handle_verify, handle_year,
};
pub use progress::ProgressDisplay;
pub use signals::cancel_on_signal;
