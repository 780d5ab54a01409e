//! Progress output
//!
//! Renders the line-oriented text the generator prints on stdout: phase
//! framing, one line per resolved dial attempt (sampled for large batches),
//! the batch summary and teardown results. Diagnostics go through `tracing`
//! instead; this writer carries the product output only.

use std::io::Write;
use std::time::Duration;

use shared::defaults::{PROGRESS_SAMPLE_FRACTION, PROGRESS_SAMPLING_THRESHOLD};
use shared::format_duration;
use tokio::time::Instant;
use tracing::warn;

use crate::attempt::{AttemptOutcome, DialAttempt};
use crate::transport::CloseError;

/// Every how many attempts a success line is printed, `None` when every attempt is
///
/// Batches above 100 attempts print roughly every 5%.
pub fn sampling_step(total: u32) -> Option<u32> {
    if total <= PROGRESS_SAMPLING_THRESHOLD {
        return None;
    }
    let step = (f64::from(total) * PROGRESS_SAMPLE_FRACTION).floor() as u32;
    Some(step.max(1))
}

/// Whether the attempt with this index gets a progress line. Failures always do.
pub fn should_report(index: u32, total: u32, success: bool) -> bool {
    if !success {
        return true;
    }
    match sampling_step(total) {
        Some(step) => index % step == 0,
        None => true,
    }
}

/// Attempts per second, 0.0 until measurable time has passed
pub fn running_rate(resolved: u32, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        f64::from(resolved) / secs
    } else {
        0.0
    }
}

/// Render the progress line for one attempt
///
/// The percentage follows the attempt index. The running rate uses
/// `resolved`, the number of attempts resolved so far, over `elapsed`, the
/// time since the batch started; in concurrent mode it can differ from the index.
pub fn render_attempt(attempt: &DialAttempt, total: u32, resolved: u32, elapsed: Duration) -> String {
    let percent = f64::from(attempt.index) / f64::from(total) * 100.0;
    let stats = format!(
        "({} / {} {:.1}%, took {}) (rate: {:.1}/s, time: {})",
        attempt.index,
        total,
        percent,
        format_duration(attempt.duration()),
        running_rate(resolved, elapsed),
        format_duration(elapsed),
    );

    match &attempt.outcome {
        AttemptOutcome::Success {
            local_addr,
            remote_addr,
        } => format!("{} -> {} {}", local_addr, remote_addr, stats),
        AttemptOutcome::Failure { cause } => format!("{} {}", cause, stats),
    }
}

/// Writes progress text for one batch
#[derive(Debug)]
pub struct ProgressReporter<W: Write> {
    out: W,
    total: u32,
    batch_start: Instant,
    resolved: u32,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W, total: u32) -> Self {
        Self {
            out,
            total,
            batch_start: Instant::now(),
            resolved: 0,
        }
    }

    /// Mark the start of the dial phase; elapsed times are measured from here
    pub fn begin(&mut self) -> Instant {
        self.batch_start = Instant::now();
        self.resolved = 0;
        self.line("Opening connections...");
        self.batch_start
    }

    /// Record a resolved attempt and print its line if the sampling rule allows
    pub fn record(&mut self, attempt: &DialAttempt) {
        self.resolved += 1;
        if should_report(attempt.index, self.total, attempt.is_success()) {
            let elapsed = attempt
                .finished_at
                .saturating_duration_since(self.batch_start);
            let line = render_attempt(attempt, self.total, self.resolved, elapsed);
            self.line(&line);
        }
    }

    /// Number of attempts recorded since `begin`
    #[cfg(test)]
    pub fn resolved(&self) -> u32 {
        self.resolved
    }

    pub fn dial_summary(&mut self, succeeded: usize, failed: usize, elapsed: Duration) {
        let line = format!(
            "Opened {} of {} connections ({} failed) in {}",
            succeeded,
            self.total,
            failed,
            format_duration(elapsed)
        );
        self.line(&line);
    }

    pub fn waiting(&mut self, hold: Duration) {
        let line = format!("\nWaiting for {}...\n", format_duration(hold));
        self.line(&line);
    }

    pub fn closing(&mut self) {
        self.line("Closing connections...");
    }

    /// Report one close. Errors always print, confirmations follow the sampling rule.
    pub fn record_close(&mut self, index: u32, result: &Result<(), CloseError>) {
        match result {
            Ok(()) => {
                if should_report(index, self.total, true) {
                    let line = format!("closed #{}", index);
                    self.line(&line);
                }
            }
            Err(e) => {
                let line = format!("close #{} failed: {}", index, e);
                self.line(&line);
            }
        }
    }

    pub fn teardown_summary(&mut self, closed: usize, failed: usize) {
        let line = format!("Closed {} connections ({} close errors)", closed, failed);
        self.line(&line);
    }

    pub fn done(&mut self) {
        self.line("Done.");
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed to write progress output");
        }
    }
}
