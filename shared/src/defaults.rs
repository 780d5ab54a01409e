//! Default values for configuration parameters
//!
//! This module centralizes all default value functions used by the configuration
//! structures. These functions are used by serde when deserializing configuration
//! files that don't specify certain optional fields.

use crate::config::{ScheduleMode, TransportKind};
use std::time::Duration;

/// Default transport (TLS)
pub fn default_transport() -> TransportKind {
    TransportKind::Tls
}

/// Default number of dial attempts (100)
pub fn default_max_connections() -> u32 {
    100
}

/// Default connection rate (0 = unconstrained)
pub fn default_rate() -> u32 {
    0
}

/// Default hold duration before teardown (5 minutes)
pub fn default_hold() -> Duration {
    Duration::from_secs(5 * 60)
}

/// Default scheduling mode (sequential)
pub fn default_mode() -> ScheduleMode {
    ScheduleMode::Sequential
}

/// Result channel capacity used in concurrent mode (1000)
pub fn default_channel_buffer_size() -> usize {
    1000
}

// Transport constants

/// TCP keep-alive probe interval applied to every dialed socket
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(10);

// Progress reporting constants

/// Batches larger than this only log a sample of successful attempts
pub const PROGRESS_SAMPLING_THRESHOLD: u32 = 100;

/// Fraction of the batch between two sampled progress lines (5%)
pub const PROGRESS_SAMPLE_FRACTION: f64 = 0.05;
