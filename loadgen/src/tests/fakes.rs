//! In-memory dialer and connection used by scheduler, registry and generator tests

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::transport::{CloseError, Closeable, DialError, Dialer, Established};

/// Connection that counts closes and can be told to fail them
#[derive(Debug)]
pub struct FakeConnection {
    pub id: u32,
    pub fail_close: bool,
    pub closed: Arc<Mutex<Vec<u32>>>,
}

impl Closeable for FakeConnection {
    fn close(self) -> impl Future<Output = Result<(), CloseError>> + Send {
        async move {
            self.closed
                .lock()
                .expect("closed list poisoned")
                .push(self.id);
            if self.fail_close {
                Err(CloseError::Io(std::io::Error::other(format!(
                    "close of {} failed",
                    self.id
                ))))
            } else {
                Ok(())
            }
        }
    }
}

/// Dialer whose n-th call (1-based) fails when n is in `fail_calls`
#[derive(Debug, Default)]
pub struct FakeDialer {
    pub delay: Duration,
    pub fail_calls: HashSet<u32>,
    pub fail_close_ids: HashSet<u32>,
    pub calls: AtomicU32,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub closed: Arc<Mutex<Vec<u32>>>,
}

impl FakeDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, calls: impl IntoIterator<Item = u32>) -> Self {
        self.fail_calls = calls.into_iter().collect();
        self
    }

    pub fn failing_close(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.fail_close_ids = ids.into_iter().collect();
        self
    }

    /// Handle on the ids closed so far, usable after the dialer moved into a scheduler
    pub fn closed_log(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.closed)
    }
}

impl Dialer for FakeDialer {
    type Connection = FakeConnection;

    fn dial(
        &self,
    ) -> impl Future<Output = Result<Established<FakeConnection>, DialError>> + Send {
        async move {
            let id = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_calls.contains(&id) {
                return Err(DialError::Connect(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )));
            }

            let port = 40000 + (id % 20000) as u16;
            Ok(Established {
                connection: FakeConnection {
                    id,
                    fail_close: self.fail_close_ids.contains(&id),
                    closed: Arc::clone(&self.closed),
                },
                local_addr: SocketAddr::from(([127, 0, 0, 1], port)),
                remote_addr: SocketAddr::from(([127, 0, 0, 1], 443)),
            })
        }
    }
}
