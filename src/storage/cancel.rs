//! Caller-controlled cancellation of in-flight queries.
//!
//! A [`Cancellation`] is a shared flag plus an optional deadline. While a
//! query runs it is polled from SQLite's progress handler; returning `true`
//! there makes SQLite abort the statement with `SQLITE_INTERRUPT`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::error::BazaarError;

/// Virtual machine instructions between cancellation checks.
const PROGRESS_OPS: i32 = 1_000;

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl Cancellation {
    /// Never times out; only [`Cancellation::cancel`] stops it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
            timeout: Some(timeout),
        }
    }

    /// Cancel every query observing this handle or a clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn timed_out(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn stop_reason(&self) -> Option<BazaarError> {
        if self.is_cancelled() {
            Some(BazaarError::Cancelled)
        } else if self.timed_out() {
            let ms = self.timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
            Some(BazaarError::Timeout(ms))
        } else {
            None
        }
    }

    /// Fail fast if cancelled or past the deadline.
    pub fn check(&self) -> crate::Result<()> {
        self.stop_reason().map_or(Ok(()), Err)
    }

    /// Translate a storage error, recognising interrupts caused by this handle.
    #[must_use]
    pub fn map_err(&self, err: rusqlite::Error) -> BazaarError {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted) {
            if let Some(reason) = self.stop_reason() {
                return reason;
            }
        }
        BazaarError::Database(err)
    }

    /// Watch `conn` until the returned guard is dropped.
    #[must_use]
    pub fn watch<'c>(&self, conn: &'c Connection) -> WatchGuard<'c> {
        let watcher = self.clone();
        let _ = conn.progress_handler(
            PROGRESS_OPS,
            Some(move || watcher.is_cancelled() || watcher.timed_out()),
        );
        WatchGuard { conn }
    }
}

/// Removes the progress handler on drop.
pub struct WatchGuard<'c> {
    conn: &'c Connection,
}

impl Drop for WatchGuard<'_> {
    fn drop(&mut self) {
        let _ = self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}
