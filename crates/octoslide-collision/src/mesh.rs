//! Collision index built from a static level mesh.

use glam::Vec3;
use octoslide_core::{Aabb, Error, Ray, Result};

use crate::config::CollisionConfig;
use crate::index::CollisionIndex;
use crate::movement::{MoveRequest, MoveResult};
use crate::object::ObjectId;
use crate::triangle::Triangle;
use crate::Hit;

/// Static mesh plus the collision index built over it.
///
/// Owns the vertex positions; triangles in the index refer to them by index.
#[derive(Debug)]
pub struct MeshCollisionSource {
    positions: Vec<Vec3>,
    index: CollisionIndex,
    triangle_count: usize,
}

impl MeshCollisionSource {
    /// Build from vertex positions and a triangle list (3 indices per triangle).
    ///
    /// Fails on an empty mesh, a ragged index buffer, out-of-range indices or
    /// non-finite positions.
    #[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
    pub fn new(positions: Vec<Vec3>, indices: &[u32], config: CollisionConfig) -> Result<Self> {
        validate(&positions, indices)?;

        let mut bounds = Aabb::empty();
        for &p in &positions {
            bounds.add_point(p);
        }

        let triangle_count = indices.len() / 3;
        let mut index = CollisionIndex::with_capacity(bounds, config, triangle_count)?;
        for tri in indices.chunks_exact(3) {
            index.insert_triangle(Triangle::new([tri[0], tri[1], tri[2]], &positions));
        }

        tracing::info!(
            triangles = triangle_count,
            vertices = positions.len(),
            depth = config.depth,
            "built mesh collision index"
        );
        tracing::debug!(
            ?bounds,
            leaves = index.leaf_count(),
            references = index.octree().reference_count(),
            "octree occupancy"
        );

        Ok(Self {
            positions,
            index,
            triangle_count,
        })
    }

    /// Build from a flat `[x, y, z, x, y, z, ...]` position buffer.
    pub fn from_flat(positions: &[f32], indices: &[u32], config: CollisionConfig) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(Error::MisalignedPositions {
                len: positions.len(),
            });
        }
        let positions: &[Vec3] = bytemuck::cast_slice(positions);
        Self::new(positions.to_vec(), indices, config)
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Number of mesh triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Bounds of the mesh.
    pub fn bounds(&self) -> &Aabb {
        self.index.bounds()
    }

    /// The collision index.
    pub fn index(&self) -> &CollisionIndex {
        &self.index
    }

    /// Mutable access to the index, e.g. to add dynamic obstacles.
    pub fn index_mut(&mut self) -> &mut CollisionIndex {
        &mut self.index
    }

    /// Nearest hit along a ray segment.
    pub fn ray_intersect(&mut self, ray: &Ray) -> Option<Hit> {
        self.index.ray_intersect(ray, &self.positions)
    }

    /// Nearest hit of a box swept along a ray segment.
    pub fn box_intersect(&mut self, shape: &Aabb, ray: &Ray) -> Option<Hit> {
        self.index.box_intersect(shape, ray, &self.positions)
    }

    /// Resolve point movement against the mesh.
    pub fn point_move(&mut self, request: &MoveRequest) -> MoveResult {
        self.index.point_move(request, &self.positions)
    }

    /// Resolve box movement against the mesh.
    pub fn box_move(&mut self, shape: &Aabb, request: &MoveRequest) -> MoveResult {
        self.index.box_move(shape, request, &self.positions)
    }

    /// Objects whose bounds overlap `region`.
    pub fn get_elements(&mut self, region: &Aabb) -> Vec<ObjectId> {
        self.index.get_elements(region)
    }
}

fn validate(positions: &[Vec3], indices: &[u32]) -> Result<()> {
    if positions.is_empty() || indices.is_empty() {
        return Err(Error::EmptyMesh {
            vertices: positions.len(),
            indices: indices.len(),
        });
    }
    if indices.len() % 3 != 0 {
        return Err(Error::MalformedIndexBuffer { len: indices.len() });
    }
    if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
        return Err(Error::NonFiniteVertex { index });
    }
    for (triangle, tri) in indices.chunks_exact(3).enumerate() {
        if let Some(&index) = tri.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(Error::IndexOutOfRange {
                triangle,
                index,
                vertex_count: positions.len(),
            });
        }
    }
    Ok(())
}
