//! HTTPS transport backed by an async reqwest client.

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use super::{remote_path, Transport, TransportError};

const PROTOCOL: &str = "https";

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("tigerlayer/", env!("CARGO_PKG_VERSION"));

/// Secondary transport: plain GET against the dataset mirror.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpsTransport {
    /// Creates a transport for `https://<host><base_path>`.
    pub fn new(host: &str, base_path: &str, timeout: Duration) -> Result<Self, TransportError> {
        Self::with_base_url(format!("https://{}{}", host, base_path), timeout)
    }

    /// Creates a transport rooted at an explicit URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Connect {
                host: base_url.clone(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, base_url })
    }

    /// URL of one remote file.
    pub fn url_for(&self, directory: &str, filename: &str) -> String {
        remote_path(&remote_path(&self.base_url, directory), filename)
    }

    async fn get(&self, url: String) -> Result<Vec<u8>, TransportError> {
        trace!(url = %url, "HTTP GET request starting");

        let response = match self.client.get(&url).send().await {
            Ok(resp) => {
                debug!(
                    url = %url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = %url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(TransportError::Transfer {
                    protocol: PROTOCOL,
                    path: url,
                    message: e.to_string(),
                });
            }
        };

        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        match response.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => Err(TransportError::Transfer {
                protocol: PROTOCOL,
                path: url,
                message: format!("Failed to read response: {}", e),
            }),
        }
    }
}

impl Transport for HttpsTransport {
    fn protocol(&self) -> &str {
        PROTOCOL
    }

    fn fetch<'a>(
        &'a self,
        directory: &'a str,
        filename: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, TransportError>> {
        Box::pin(self.get(self.url_for(directory, filename)))
    }
}
