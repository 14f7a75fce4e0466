//! Bounded-concurrency gate for file operations.
//!
//! Every directory scan and artifact read performed by the tile service holds
//! a permit, so server load never exceeds a fixed number of simultaneous file
//! operations.
//!
//! ```ignore
//! let limiter = IoLimiter::new(32, "artifact_io");
//! let _permit = limiter.acquire().await?;
//! // file operation happens here; permit released on drop
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};
use tracing::trace;

use crate::config::DEFAULT_MAX_FILE_OPERATIONS;

/// Semaphore-based limiter with in-flight and peak counters.
#[derive(Debug)]
pub struct IoLimiter {
    /// Semaphore controlling concurrent operations
    semaphore: Semaphore,

    /// Maximum permits (for stats/debugging)
    max_permits: usize,

    /// Current number of in-flight operations
    in_flight: AtomicUsize,

    /// Peak concurrent operations observed
    peak_in_flight: AtomicUsize,

    /// Label for this limiter
    label: String,
}

impl IoLimiter {
    /// Creates a limiter allowing `max_concurrent` operations (at least one).
    pub fn new(max_concurrent: usize, label: impl Into<String>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Semaphore::new(max_concurrent),
            max_permits: max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            label: label.into(),
        }
    }

    /// Waits for a permit. The permit is released when dropped.
    pub async fn acquire(&self) -> Result<IoPermit<'_>, AcquireError> {
        if self.semaphore.available_permits() == 0 {
            trace!(limiter = %self.label, max = self.max_permits, "Waiting for I/O permit");
        }
        let permit = self.semaphore.acquire().await?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_peak(current);

        Ok(IoPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    fn update_peak(&self, current: usize) {
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Peak number of concurrent operations observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for IoLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_OPERATIONS, "file_io")
    }
}

/// Held while a file operation is in progress.
pub struct IoPermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for IoPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_new_limiter() {
        let limiter = IoLimiter::new(8, "test");
        assert_eq!(limiter.max_concurrent(), 8);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.available_permits(), 8);
    }

    #[test]
    fn test_zero_is_raised_to_one() {
        assert_eq!(IoLimiter::new(0, "test").max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let limiter = IoLimiter::new(2, "test");

        let p1 = limiter.acquire().await.unwrap();
        let p2 = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 2);
        assert_eq!(limiter.available_permits(), 0);

        drop(p1);
        assert_eq!(limiter.in_flight(), 1);
        assert_eq!(limiter.available_permits(), 1);

        drop(p2);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.peak_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_limit() {
        let limiter = Arc::new(IoLimiter::new(3, "test"));

        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let _permit = limiter.acquire().await.unwrap();
                    tokio::time::sleep(Duration::from_millis(10)).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(limiter.peak_in_flight(), 3);
        assert_eq!(limiter.in_flight(), 0);
    }
}
