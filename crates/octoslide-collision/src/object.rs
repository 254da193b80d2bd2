//! Entries stored in the collision index.

use glam::Vec3;
use octoslide_core::{Aabb, Ray};

use crate::octree::NodeId;
use crate::triangle::Triangle;
use crate::Hit;

/// Handle to an object in a [`crate::CollisionIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    /// Raw slot number
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Capabilities every index entry provides.
pub trait Collider {
    /// Bounds used for octree placement and query culling.
    fn bounds(&self) -> &Aabb;

    /// Nearest front-facing contact along `ray`.
    fn ray_intersect(&self, ray: &Ray, positions: &[Vec3]) -> Option<Hit>;

    /// Nearest contact of `shape`, placed at the ray origin, swept along `ray`.
    fn box_intersect(&self, shape: &Aabb, ray: &Ray, positions: &[Vec3]) -> Option<Hit>;

    /// Called once for every leaf the entry is stored in.
    fn on_inserted(&mut self, _leaf: NodeId) {}
}

impl Collider for Triangle {
    fn bounds(&self) -> &Aabb {
        Triangle::bounds(self)
    }

    fn ray_intersect(&self, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        Triangle::ray_intersect(self, ray, positions)
    }

    fn box_intersect(&self, shape: &Aabb, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        Triangle::box_intersect(self, shape, ray, positions)
    }
}

/// Movable box obstacle.
///
/// Remembers the leaves it was inserted into so removal only touches those.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicObject {
    bounds: Aabb,
    leaves: Vec<NodeId>,
}

impl DynamicObject {
    /// Create an obstacle that has not been inserted yet.
    pub fn new(bounds: Aabb) -> Self {
        Self {
            bounds,
            leaves: Vec::new(),
        }
    }

    /// Leaves currently holding this object.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    pub(crate) fn take_leaves(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.leaves)
    }

    pub(crate) fn set_bounds(&mut self, bounds: Aabb) {
        self.bounds = bounds;
    }
}

impl Collider for DynamicObject {
    fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    fn ray_intersect(&self, ray: &Ray, _positions: &[Vec3]) -> Option<Hit> {
        let direction = ray.unit_direction();
        let entry = self.bounds.ray_intersect(ray.origin, direction)?;
        if entry.starts_inside() {
            return None;
        }
        Some(Hit {
            distance: entry.near,
            position: ray.origin + direction * entry.near,
            normal: entry.face.normal(),
        })
    }

    fn box_intersect(&self, shape: &Aabb, ray: &Ray, _positions: &[Vec3]) -> Option<Hit> {
        let direction = ray.unit_direction();
        // Minkowski difference: the swept box reduces to a point
        let expanded = Aabb::new(self.bounds.min - shape.max, self.bounds.max - shape.min);
        let entry = expanded.ray_intersect(ray.origin, direction)?;
        if entry.starts_inside() {
            return None;
        }
        let moved = shape.translated(ray.origin + direction * entry.near);
        Some(Hit {
            distance: entry.near,
            position: moved.center().clamp(self.bounds.min, self.bounds.max),
            normal: entry.face.normal(),
        })
    }

    fn on_inserted(&mut self, leaf: NodeId) {
        self.leaves.push(leaf);
    }
}

/// Closed set of index entries.
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionShape {
    /// Static mesh triangle
    Triangle(Triangle),
    /// Movable obstacle
    Dynamic(DynamicObject),
}

impl Collider for CollisionShape {
    fn bounds(&self) -> &Aabb {
        match self {
            Self::Triangle(tri) => Collider::bounds(tri),
            Self::Dynamic(obj) => obj.bounds(),
        }
    }

    fn ray_intersect(&self, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        match self {
            Self::Triangle(tri) => tri.ray_intersect(ray, positions),
            Self::Dynamic(obj) => Collider::ray_intersect(obj, ray, positions),
        }
    }

    fn box_intersect(&self, shape: &Aabb, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        match self {
            Self::Triangle(tri) => tri.box_intersect(shape, ray, positions),
            Self::Dynamic(obj) => Collider::box_intersect(obj, shape, ray, positions),
        }
    }

    fn on_inserted(&mut self, leaf: NodeId) {
        if let Self::Dynamic(obj) = self {
            obj.on_inserted(leaf);
        }
    }
}

/// Index entry: a shape plus the epoch of the last query that reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionObject {
    pub shape: CollisionShape,
    stamp: u64,
}

impl CollisionObject {
    fn new(shape: CollisionShape) -> Self {
        Self { shape, stamp: 0 }
    }
}

/// Slot arena owning every index entry.
#[derive(Debug, Default)]
pub(crate) struct ObjectStore {
    slots: Vec<Option<CollisionObject>>,
    free: Vec<u32>,
    live: usize,
}

impl ObjectStore {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn insert(&mut self, shape: CollisionShape) -> ObjectId {
        self.live += 1;
        let object = Some(CollisionObject::new(shape));
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = object;
            ObjectId(slot)
        } else {
            self.slots.push(object);
            ObjectId(self.slots.len() as u32 - 1)
        }
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<CollisionObject> {
        let object = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id.0);
        self.live -= 1;
        Some(object)
    }

    pub(crate) fn get(&self, id: ObjectId) -> Option<&CollisionObject> {
        self.slots.get(id.index())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut CollisionObject> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Report `id` for the query with `epoch` if it overlaps `region` and was
    /// not already reported for that epoch.
    pub(crate) fn claim(&mut self, id: ObjectId, region: &Aabb, epoch: u64) -> bool {
        let Some(object) = self.get_mut(id) else {
            return false;
        };
        if object.stamp >= epoch || !object.shape.bounds().overlaps(region) {
            return false;
        }
        object.stamp = epoch;
        true
    }
}
