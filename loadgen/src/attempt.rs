//! Dial attempt records

use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;

/// One finalized dial attempt. Never mutated after the dial resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct DialAttempt {
    /// Sequence index, 1..=max_connections
    pub index: u32,
    pub started_at: Instant,
    pub finished_at: Instant,
    pub outcome: AttemptOutcome,
}

/// How a dial attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success {
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
    },
    Failure {
        cause: String,
    },
}

impl DialAttempt {
    /// Time the dial itself took
    pub fn duration(&self) -> Duration {
        self.finished_at.saturating_duration_since(self.started_at)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success { .. })
    }
}
