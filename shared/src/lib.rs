//! Shared data structures and utilities for the connection load generator
//!
//! This crate contains the load configuration types, their defaults and
//! validation, and small helpers used by the `loadgen` binary.

pub mod config;
pub mod defaults;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{LoadConfig, ScheduleMode, TransportKind};
pub use utils::{format_duration, parse_duration, split_host_port};

/// Result type alias used throughout the shared crate
pub type Result<T> = anyhow::Result<T>;

/// Configuration errors. Any of these is fatal before dialing starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests;
