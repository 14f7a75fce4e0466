use std::time::Duration;
use thiserror::Error;

/// Failure of a single transport call.
///
/// All variants are treated as transient by the downloader.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection to {host} failed: {message}")]
    Connect { host: String, message: String },

    #[error("{protocol} transfer of {path} failed: {message}")]
    Transfer {
        protocol: &'static str,
        path: String,
        message: String,
    },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport task failed: {0}")]
    Task(String),
}
