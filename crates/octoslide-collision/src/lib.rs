//! Octree collision index and sliding movement for static meshes.
//!
//! A [`MeshCollisionSource`] is built once from a mesh provider's vertex
//! positions and triangle indices. Movement callers then resolve per-tick
//! motion with [`CollisionIndex::point_move`] and [`CollisionIndex::box_move`],
//! or issue one-shot nearest-hit queries.
//!
//! The `profiling` feature adds trace-level `tracing` spans to queries,
//! movement and mesh builds.

pub mod config;
pub mod index;
pub mod mesh;
pub mod movement;
pub mod object;
pub mod octree;
pub mod triangle;

use glam::Vec3;

pub use config::CollisionConfig;
pub use index::CollisionIndex;
pub use mesh::MeshCollisionSource;
pub use movement::{MoveRequest, MoveResult};
pub use object::{Collider, CollisionShape, DynamicObject, ObjectId};
pub use octree::{NodeId, Octree};
pub use triangle::Triangle;

/// Nearest contact reported by a ray or sweep query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance travelled along the query direction before contact
    pub distance: f32,
    /// Contact point on the obstacle
    pub position: Vec3,
    /// Unit surface normal facing against the motion
    pub normal: Vec3,
}

impl Hit {
    /// Keep whichever of `self` and `other` is nearer.
    #[inline]
    pub fn nearest(self, other: Option<Self>) -> Self {
        match other {
            Some(other) if other.distance < self.distance => other,
            _ => self,
        }
    }
}
