//! Dial scheduling
//!
//! Drives exactly `max_connections` dial attempts through a [`Dialer`], either
//! one after another or all at once, and collects the outcome of each into a
//! [`DialAttempt`] and, on success, a [`ConnectionRegistry`] entry.
//!
//! Sequential mode runs on the caller's task and applies the rate pause between
//! consecutive attempts. Concurrent mode spawns one task per attempt with no
//! cap. Each task sends its result over an MPSC channel to the scheduler, which
//! is the only writer of the registry and the progress output.
//!
//! In concurrent mode the rate governor paces each task on its own: a task
//! sleeps out the rest of its interval after dialing. All tasks start at once,
//! so the aggregate connection rate is not bounded by the configured rate.
//! The phase ends when the last result reaches the collector; pacing sleeps
//! still pending at that point are cancelled.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use shared::{LoadConfig, ScheduleMode};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::attempt::{AttemptOutcome, DialAttempt};
use crate::governor::RateGovernor;
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::report::ProgressReporter;
use crate::transport::{DialError, Dialer, Established};

/// Result of the dial phase
#[derive(Debug)]
pub struct DialPhase<C> {
    /// One record per attempt, in resolution order
    pub attempts: Vec<DialAttempt>,
    /// Connections that opened successfully
    pub registry: ConnectionRegistry<C>,
    /// Time from the first attempt start to the last resolution
    pub elapsed: Duration,
}

impl<C> DialPhase<C> {
    pub fn succeeded(&self) -> usize {
        self.attempts.iter().filter(|a| a.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.succeeded()
    }
}

/// A dial result travelling from a concurrent task to the collector
struct RawResult<C> {
    index: u32,
    started_at: Instant,
    finished_at: Instant,
    result: Result<Established<C>, DialError>,
}

/// Runs one batch of dial attempts
pub struct DialScheduler<D: Dialer> {
    dialer: Arc<D>,
    max_connections: u32,
    governor: RateGovernor,
    mode: ScheduleMode,
    channel_buffer_size: usize,
}

impl<D: Dialer> DialScheduler<D> {
    pub fn new(
        dialer: D,
        max_connections: u32,
        governor: RateGovernor,
        mode: ScheduleMode,
        channel_buffer_size: usize,
    ) -> Self {
        Self {
            dialer: Arc::new(dialer),
            max_connections,
            governor,
            mode,
            channel_buffer_size: channel_buffer_size.max(1),
        }
    }

    /// Build a scheduler from a validated configuration
    pub fn from_config(dialer: D, config: &LoadConfig) -> Self {
        Self::new(
            dialer,
            config.max_connections,
            RateGovernor::new(config.rate),
            config.mode,
            config.channel_buffer_size,
        )
    }

    #[cfg(test)]
    pub fn dialer(&self) -> &D {
        &self.dialer
    }

    /// Run all attempts and return once every one of them has resolved
    pub async fn run<W: Write>(&self, reporter: &mut ProgressReporter<W>) -> DialPhase<D::Connection> {
        info!(
            mode = %self.mode,
            attempts = self.max_connections,
            min_interval_ms = self
                .governor
                .min_interval_per_attempt()
                .map(|d| d.as_secs_f64() * 1000.0),
            "Starting dial phase"
        );

        let batch_start = reporter.begin();
        let phase = match self.mode {
            ScheduleMode::Sequential => self.run_sequential(batch_start, reporter).await,
            ScheduleMode::Concurrent => self.run_concurrent(batch_start, reporter).await,
        };

        reporter.dial_summary(phase.succeeded(), phase.failed(), phase.elapsed);
        info!(
            succeeded = phase.succeeded(),
            failed = phase.failed(),
            elapsed_ms = phase.elapsed.as_millis() as u64,
            "Dial phase complete"
        );
        phase
    }

    async fn run_sequential<W: Write>(
        &self,
        batch_start: Instant,
        reporter: &mut ProgressReporter<W>,
    ) -> DialPhase<D::Connection> {
        let mut attempts = Vec::with_capacity(self.max_connections as usize);
        let mut registry = ConnectionRegistry::new();

        for index in 1..=self.max_connections {
            let started_at = Instant::now();
            let result = self.dialer.dial().await;
            let finished_at = Instant::now();

            let attempt = finalize(
                RawResult {
                    index,
                    started_at,
                    finished_at,
                    result,
                },
                &mut registry,
            );
            reporter.record(&attempt);
            attempts.push(attempt);

            if index < self.max_connections {
                self.governor.pace(finished_at - started_at).await;
            }
        }

        DialPhase {
            attempts,
            registry,
            elapsed: batch_start.elapsed(),
        }
    }

    async fn run_concurrent<W: Write>(
        &self,
        batch_start: Instant,
        reporter: &mut ProgressReporter<W>,
    ) -> DialPhase<D::Connection> {
        let (result_sender, mut result_receiver) =
            mpsc::channel::<RawResult<D::Connection>>(self.channel_buffer_size);
        let mut tasks = JoinSet::new();

        for index in 1..=self.max_connections {
            let dialer = Arc::clone(&self.dialer);
            let result_sender = result_sender.clone();
            let governor = self.governor;

            tasks.spawn(async move {
                let started_at = Instant::now();
                let result = dialer.dial().await;
                let finished_at = Instant::now();

                let raw = RawResult {
                    index,
                    started_at,
                    finished_at,
                    result,
                };
                if result_sender.send(raw).await.is_err() {
                    warn!(index, "Result collector gone, dropping dial result");
                }
                drop(result_sender);

                governor.pace(finished_at - started_at).await;
            });
        }
        // The collector loop ends once every task has dropped its sender
        drop(result_sender);
        debug!(tasks = tasks.len(), "Spawned dial tasks");

        let mut attempts = Vec::with_capacity(self.max_connections as usize);
        let mut registry = ConnectionRegistry::new();
        while let Some(raw) = result_receiver.recv().await {
            let attempt = finalize(raw, &mut registry);
            reporter.record(&attempt);
            attempts.push(attempt);
        }
        let elapsed = batch_start.elapsed();

        // Every result is in; what is left in the tasks is rate pacing
        tasks.abort_all();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    error!(error = %e, "Dial task panicked");
                }
            }
        }

        DialPhase {
            attempts,
            registry,
            elapsed,
        }
    }
}

/// Turn a raw dial result into its attempt record, registering the connection on success
fn finalize<C>(raw: RawResult<C>, registry: &mut ConnectionRegistry<C>) -> DialAttempt {
    let outcome = match raw.result {
        Ok(established) => {
            let outcome = AttemptOutcome::Success {
                local_addr: established.local_addr,
                remote_addr: established.remote_addr,
            };
            registry.push(ConnectionHandle {
                index: raw.index,
                connection: established.connection,
                local_addr: established.local_addr,
                remote_addr: established.remote_addr,
            });
            outcome
        }
        Err(e) => {
            debug!(index = raw.index, error = %e, "Dial attempt failed");
            AttemptOutcome::Failure {
                cause: e.to_string(),
            }
        }
    };

    DialAttempt {
        index: raw.index,
        started_at: raw.started_at,
        finished_at: raw.finished_at,
        outcome,
    }
}
