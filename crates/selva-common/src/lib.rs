//! # Selva Common
//!
//! Common types, utilities, and shared abstractions for the Selva encounter core.
//!
//! This crate provides foundational types used across all Selva crates:
//! - Planar geometry (vectors, bounding boxes, segment distance)
//! - ID types (EntityId and a deterministic allocator)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use prelude::*;
