use std::time::Duration;

use crate::config::ProcessingSettings;

/// Retry behavior of the [`Downloader`](super::Downloader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts against the primary transport.
    pub max_attempts: u32,
    /// Base of the exponential backoff.
    pub backoff_unit: Duration,
    /// Upper bound on each transport call.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &ProcessingSettings) -> Self {
        Self {
            max_attempts: settings.max_retries,
            backoff_unit: settings.backoff_unit(),
            attempt_timeout: settings.attempt_timeout(),
        }
    }

    /// Sleep after failed attempt `attempt` (1-based): `unit * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(20));
        self.backoff_unit.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    #[test]
    fn test_backoff_for() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_unit_scales() {
        let policy = RetryPolicy {
            backoff_unit: Duration::from_millis(10),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_for(2), Duration::from_millis(40));
    }

    #[test]
    fn test_from_settings() {
        let mut config = ConfigFile::default();
        config.processing.max_retries = 5;
        config.processing.timeout = 30;
        config.processing.backoff_unit_ms = 250;

        let policy = RetryPolicy::from_settings(&config.processing);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
        assert_eq!(policy.backoff_unit, Duration::from_millis(250));
    }
}
