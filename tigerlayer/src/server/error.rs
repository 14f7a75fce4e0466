//! Tile service errors and their HTTP mapping.

use std::net::IpAddr;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::boundary::BoundaryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested artifact does not exist or names a path outside the layer
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("rate limit exceeded for {client}, retry in {retry_after:?}")]
    RateLimited {
        client: IpAddr,
        retry_after: Duration,
    },

    #[error("invalid viewport: {0}")]
    InvalidViewport(String),

    #[error(transparent)]
    Boundaries(#[from] BoundaryError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file operation gate was closed
    #[error("file operations unavailable")]
    Unavailable,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::InvalidViewport(_) => StatusCode::BAD_REQUEST,
            ServiceError::Boundaries(_) | ServiceError::Io { .. } | ServiceError::Unavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return ServiceError::NotFound(path.into());
        }
        ServiceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let retry_after = match &self {
            ServiceError::RateLimited { retry_after, .. } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };

        let mut response = (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response();

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
