//! Connection registry and teardown
//!
//! The registry owns every successfully opened connection from the moment its
//! dial resolves until teardown closes it. It has a single owner: in
//! concurrent mode dial tasks hand their results to the collector over a
//! channel and only the collector appends, so no entry can be lost to racing
//! writers.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, info};

use crate::report::ProgressReporter;
use crate::transport::{CloseError, Closeable};

/// An open connection and the attempt that created it
#[derive(Debug)]
pub struct ConnectionHandle<C> {
    pub index: u32,
    pub connection: C,
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
}

/// Append-only set of open connections awaiting teardown
#[derive(Debug)]
pub struct ConnectionRegistry<C> {
    handles: Vec<ConnectionHandle<C>>,
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn push(&mut self, handle: ConnectionHandle<C>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Attempt indices of the registered connections, in registration order
    #[cfg(test)]
    pub fn indices(&self) -> Vec<u32> {
        self.handles.iter().map(|h| h.index).collect()
    }
}

impl<C> IntoIterator for ConnectionRegistry<C> {
    type Item = ConnectionHandle<C>;
    type IntoIter = std::vec::IntoIter<ConnectionHandle<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.into_iter()
    }
}

/// What happened during teardown
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Handles a close was attempted on
    pub attempted: usize,
    /// Handles that closed cleanly
    pub closed: usize,
    /// Attempt index and error for every handle that failed to close
    pub errors: Vec<(u32, CloseError)>,
}

/// Keep the registry open for `hold`, then close everything in it
pub async fn hold_then_teardown<C, W>(
    registry: ConnectionRegistry<C>,
    hold: Duration,
    reporter: &mut ProgressReporter<W>,
) -> TeardownReport
where
    C: Closeable,
    W: Write,
{
    reporter.waiting(hold);
    info!(hold_ms = hold.as_millis() as u64, open = registry.len(), "Holding connections");
    tokio::time::sleep(hold).await;
    teardown(registry, reporter).await
}

/// Close every handle exactly once
///
/// A failed close is reported and recorded; the remaining handles are still
/// closed. Nothing is retried.
pub async fn teardown<C, W>(
    registry: ConnectionRegistry<C>,
    reporter: &mut ProgressReporter<W>,
) -> TeardownReport
where
    C: Closeable,
    W: Write,
{
    reporter.closing();
    if registry.is_empty() {
        debug!("No open connections to close");
    } else {
        info!(count = registry.len(), "Closing connections");
    }

    let mut report = TeardownReport::default();
    for handle in registry {
        report.attempted += 1;
        let result = handle.connection.close().await;
        reporter.record_close(handle.index, &result);
        match result {
            Ok(()) => {
                debug!(
                    index = handle.index,
                    local = %handle.local_addr,
                    remote = %handle.remote_addr,
                    "Connection closed"
                );
                report.closed += 1;
            }
            Err(e) => report.errors.push((handle.index, e)),
        }
    }

    reporter.teardown_summary(report.closed, report.errors.len());
    info!(
        closed = report.closed,
        errors = report.errors.len(),
        "Teardown complete"
    );
    report
}
