//! Core geometry types for the Octoslide collision library.
//!
//! This crate provides the value types shared by the collision index:
//! - Axis-aligned boxes with slab ray tests and octant subdivision
//! - Segment rays whose direction carries the segment length
//! - The epsilon family used by every geometric test
//! - Common error types

pub mod error;
pub mod math;

pub use error::{Error, Result};
pub use math::{Aabb, BoxEdge, BoxFace, BoxRayHit, Ray};

/// Library-wide constants
pub mod constants {
    /// Tolerance shared by every geometric test (parallel rays, barycentric
    /// bounds, degenerate edges).
    pub const EPSILON: f32 = 1e-5;
    /// Box edges whose outward direction is further than this cosine from the
    /// sweep direction cannot lead the sweep and are skipped (about 135 degrees).
    pub const EDGE_CULL_COS: f32 = -0.707;
    /// Number of children of an internal octree node.
    pub const OCTANTS: usize = 8;
}
