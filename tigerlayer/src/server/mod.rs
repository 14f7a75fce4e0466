//! Spatial tile-lookup service.
//!
//! [`TileService`] composes the per-client [`RateLimiter`], the
//! [`QueryCache`], the lazily loaded [`SpatialIndex`](crate::spatial::SpatialIndex)
//! and an [`IoLimiter`] gate over directory scans and artifact reads.
//! [`http`] exposes it over axum.

mod error;
pub mod http;
mod io_limiter;
mod query_cache;
mod rate_limiter;
mod service;

pub use error::{ErrorBody, ServiceError};
pub use io_limiter::{IoLimiter, IoPermit};
pub use query_cache::{QueryCache, QueryCacheStats, ViewportKey};
pub use rate_limiter::{RateLimiter, Throttled};
pub use service::TileService;
