//! Per-client request throttling.
//!
//! Each client address keeps only the instant of its last accepted request.
//! A request arriving less than `1 / requests_per_second` after that instant
//! is rejected without updating the record. Entries are never evicted.

use std::net::IpAddr;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::config::DEFAULT_REQUESTS_PER_SECOND;

/// A request was rejected; the client may retry after `retry_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled {
    pub retry_after: Duration,
}

/// Minimum-interval limiter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_accepted: DashMap<IpAddr, Instant>,
}

impl RateLimiter {
    /// Limiter allowing `requests_per_second` requests per client (at least one).
    pub fn new(requests_per_second: u32) -> Self {
        Self::with_interval(Duration::from_secs(1) / requests_per_second.max(1))
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: DashMap::new(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Accept or reject a request from `client`.
    pub fn check(&self, client: IpAddr) -> Result<(), Throttled> {
        let now = Instant::now();

        match self.last_accepted.entry(client) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.duration_since(*entry.get());
                if elapsed < self.min_interval {
                    let retry_after = self.min_interval - elapsed;
                    debug!(client = %client, ?retry_after, "Request throttled");
                    return Err(Throttled { retry_after });
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }
        Ok(())
    }

    /// Number of distinct clients seen.
    pub fn tracked_clients(&self) -> usize {
        self.last_accepted.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn test_interval_from_ceiling() {
        assert_eq!(RateLimiter::new(10).min_interval(), Duration::from_millis(100));
        assert_eq!(RateLimiter::new(0).min_interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_requests_inside_interval() {
        let limiter = RateLimiter::new(10);

        assert!(limiter.check(CLIENT).is_ok());
        tokio::time::advance(Duration::from_millis(40)).await;

        let throttled = limiter.check(CLIENT).unwrap_err();
        assert_eq!(throttled.retry_after, Duration::from_millis(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepts_spaced_requests() {
        let limiter = RateLimiter::new(10);

        assert!(limiter.check(CLIENT).is_ok());
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(limiter.check(CLIENT).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_reset_window() {
        let limiter = RateLimiter::new(10);

        limiter.check(CLIENT).unwrap();
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(limiter.check(CLIENT).is_err());
        tokio::time::advance(Duration::from_millis(50)).await;

        // 110ms since the last accepted request
        assert!(limiter.check(CLIENT).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(10);

        assert!(limiter.check(CLIENT).is_ok());
        assert!(limiter.check(OTHER).is_ok());
        assert!(limiter.check(CLIENT).is_err());
        assert_eq!(limiter.tracked_clients(), 2);
    }
}
