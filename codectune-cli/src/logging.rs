//! Logging setup.
//!
//! Uses the standard `log` facade with `env_logger` as the backend. The
//! level is controlled through the RUST_LOG environment variable:
//! - RUST_LOG=info (default): normal operation
//! - RUST_LOG=debug: search and cache decisions
//! - RUST_LOG=trace: very verbose debugging

use env_logger::Builder;
use log::LevelFilter;

/// Initializes env_logger, defaulting to info when RUST_LOG is unset.
pub fn init() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}
