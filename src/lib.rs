//! FARS Fetcher Library
//!
//! Fetches dataset archives listed in a registry manifest into a local
//! cache, verifies them by SHA-256, and unpacks yearly zip archives into
//! deterministic directories.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
