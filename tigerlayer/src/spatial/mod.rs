//! Spatial lookup of artifact buckets.
//!
//! [`SpatialIndex`] lazily loads a layer's boundary description exactly once
//! and answers "which bucket codes intersect this viewport" queries against
//! the cached [`BoundaryMap`](crate::boundary::BoundaryMap).

mod bounds;
mod index;

pub use bounds::{Bounds, Viewport};
pub use index::SpatialIndex;
