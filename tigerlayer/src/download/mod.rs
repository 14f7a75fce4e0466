//! Downloader with exponential backoff and single-shot fallback.
//!
//! The primary transport is tried up to `max_attempts` times. Failed attempt
//! `n` (counting from 1) is followed by a sleep of `backoff_unit * 2^n` when
//! another attempt remains. Once the primary is exhausted the secondary
//! transport, if any, gets exactly one attempt.

mod policy;

pub use policy::RetryPolicy;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError};

/// Bytes of one remote file plus the protocol that delivered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub protocol: String,
}

/// Download failure after the whole policy has run.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Primary exhausted and no fallback transport configured.
    #[error("Primary transport failed after {attempts} attempts: {last}")]
    PrimaryExhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    /// Primary exhausted and the single fallback attempt failed too.
    #[error(
        "All transports failed (primary after {attempts} attempts: {primary}; secondary: {secondary})"
    )]
    AllTransportsFailed {
        attempts: u32,
        primary: TransportError,
        secondary: TransportError,
    },
}

impl DownloadError {
    /// Whether the fallback transport was tried.
    pub fn secondary_attempted(&self) -> bool {
        matches!(self, DownloadError::AllTransportsFailed { .. })
    }
}

/// Fetches files through a primary transport with fallback.
#[derive(Clone)]
pub struct Downloader {
    primary: Arc<dyn Transport>,
    secondary: Option<Arc<dyn Transport>>,
    policy: RetryPolicy,
}

impl Downloader {
    pub fn new(primary: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            primary,
            secondary: None,
            policy,
        }
    }

    pub fn with_fallback(mut self, secondary: Arc<dyn Transport>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Protocol of the last transport tried before `error`.
    pub fn failed_protocol(&self, error: &DownloadError) -> &str {
        match (&self.secondary, error.secondary_attempted()) {
            (Some(secondary), true) => secondary.protocol(),
            _ => self.primary.protocol(),
        }
    }

    /// Fetch `<directory>/<filename>`.
    pub async fn fetch(&self, directory: &str, filename: &str) -> Result<Fetched, DownloadError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        let primary_error = loop {
            match self.attempt(self.primary.as_ref(), directory, filename).await {
                Ok(bytes) => {
                    debug!(
                        directory,
                        filename,
                        attempt,
                        protocol = self.primary.protocol(),
                        "Download succeeded"
                    );
                    return Ok(Fetched {
                        bytes,
                        protocol: self.primary.protocol().to_string(),
                    });
                }
                Err(e) if attempt < max_attempts => {
                    let backoff = self.policy.backoff_for(attempt);
                    warn!(
                        directory,
                        filename,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Download attempt failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => break e,
            }
        };

        let Some(secondary) = &self.secondary else {
            warn!(directory, filename, attempts = attempt, error = %primary_error, "Primary transport exhausted");
            return Err(DownloadError::PrimaryExhausted {
                attempts: attempt,
                last: primary_error,
            });
        };

        info!(
            directory,
            filename,
            attempts = attempt,
            error = %primary_error,
            fallback = secondary.protocol(),
            "Primary transport exhausted, trying fallback"
        );

        match self.attempt(secondary.as_ref(), directory, filename).await {
            Ok(bytes) => Ok(Fetched {
                bytes,
                protocol: secondary.protocol().to_string(),
            }),
            Err(secondary_error) => {
                warn!(
                    directory,
                    filename,
                    primary = %primary_error,
                    secondary = %secondary_error,
                    "All transports failed"
                );
                Err(DownloadError::AllTransportsFailed {
                    attempts: attempt,
                    primary: primary_error,
                    secondary: secondary_error,
                })
            }
        }
    }

    /// One transport call bounded by the per-attempt timeout.
    async fn attempt(
        &self,
        transport: &dyn Transport,
        directory: &str,
        filename: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let timeout = self.policy.attempt_timeout;
        match tokio::time::timeout(timeout, transport.fetch(directory, filename)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Transport replaying scripted results and recording call times.
    struct ScriptedTransport {
        name: &'static str,
        script: Mutex<VecDeque<Result<Vec<u8>, String>>>,
        calls: Mutex<Vec<Instant>>,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(name: &'static str, script: Vec<Result<Vec<u8>, String>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Self::new(name, Vec::new())
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                script: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                delay,
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn protocol(&self) -> &str {
            self.name
        }

        fn fetch<'a>(
            &'a self,
            directory: &'a str,
            filename: &'a str,
        ) -> BoxFuture<'a, Result<Vec<u8>, TransportError>> {
            Box::pin(async move {
                self.calls.lock().push(Instant::now());
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                let next = self.script.lock().pop_front();
                next.unwrap_or_else(|| Err("unavailable".to_string()))
                    .map_err(|message| TransportError::Transfer {
                        protocol: "mock",
                        path: format!("{directory}/{filename}"),
                        message,
                    })
            })
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_success_first_try() {
        let primary = ScriptedTransport::new("ftp", vec![Ok(b"zip".to_vec())]);
        let secondary = ScriptedTransport::failing("https");
        let downloader = Downloader::new(primary.clone(), policy()).with_fallback(secondary.clone());

        let fetched = downloader.fetch("COUNTY", "a.zip").await.unwrap();

        assert_eq!(fetched.bytes, b"zip");
        assert_eq!(fetched.protocol, "ftp");
        assert_eq!(primary.call_times().len(), 1);
        assert!(secondary.call_times().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_then_fallback_exactly_once() {
        let primary = ScriptedTransport::failing("ftp");
        let secondary = ScriptedTransport::new("https", vec![Ok(b"mirror".to_vec())]);
        let downloader = Downloader::new(primary.clone(), policy()).with_fallback(secondary.clone());
        let start = Instant::now();

        let fetched = downloader.fetch("COUNTY", "a.zip").await.unwrap();

        assert_eq!(fetched.protocol, "https");
        let calls = primary.call_times();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0] - start, Duration::ZERO);
        assert_eq!(calls[1] - calls[0], Duration::from_secs(2));
        assert_eq!(calls[2] - calls[1], Duration::from_secs(4));

        let fallback = secondary.call_times();
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0], calls[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_retry() {
        let primary = ScriptedTransport::new(
            "ftp",
            vec![Err("reset".to_string()), Ok(b"ok".to_vec())],
        );
        let downloader = Downloader::new(primary.clone(), policy());

        let fetched = downloader.fetch("STATE", "s.zip").await.unwrap();

        assert_eq!(fetched.bytes, b"ok");
        assert_eq!(primary.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_transports_fail() {
        let primary = ScriptedTransport::failing("ftp");
        let secondary = ScriptedTransport::new("https", vec![Err("404".to_string())]);
        let downloader = Downloader::new(primary, policy()).with_fallback(secondary.clone());

        let err = downloader.fetch("COUNTY", "a.zip").await.unwrap_err();

        assert!(err.secondary_attempted());
        match &err {
            DownloadError::AllTransportsFailed {
                attempts,
                primary,
                secondary,
            } => {
                assert_eq!(*attempts, 3);
                assert!(primary.to_string().contains("unavailable"));
                assert!(secondary.to_string().contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("unavailable") && message.contains("404"));
        assert_eq!(secondary.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_exhausted_without_fallback() {
        let primary = ScriptedTransport::failing("ftp");
        let downloader = Downloader::new(primary.clone(), policy());

        let err = downloader.fetch("COUNTY", "a.zip").await.unwrap_err();

        assert!(!err.secondary_attempted());
        assert!(matches!(err, DownloadError::PrimaryExhausted { attempts: 3, .. }));
        assert_eq!(primary.call_times().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout() {
        let primary = ScriptedTransport::slow("ftp", Duration::from_secs(600));
        let secondary = ScriptedTransport::new("https", vec![Ok(b"late".to_vec())]);
        let policy = RetryPolicy {
            max_attempts: 1,
            attempt_timeout: Duration::from_secs(10),
            ..RetryPolicy::default()
        };
        let downloader = Downloader::new(primary, policy).with_fallback(secondary);
        let start = Instant::now();

        let fetched = downloader.fetch("ROADS", "r.zip").await.unwrap();

        assert_eq!(fetched.protocol, "https");
        assert_eq!(Instant::now() - start, Duration::from_secs(10));
    }
}
