//! Shared helpers for meterlink binaries
//!
//! - logging bootstrap (console + optional daily rolling file)

pub mod logging;

pub use logging::{get_log_root, init, init_log_root, init_with_config, LogConfig};
