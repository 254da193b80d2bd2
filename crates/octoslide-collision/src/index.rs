//! Collision index: octree plus object arena plus query epoch.

use glam::Vec3;
use octoslide_core::constants::EPSILON;
use octoslide_core::{Aabb, Error, Ray, Result};

use crate::config::CollisionConfig;
use crate::object::{Collider, CollisionShape, DynamicObject, ObjectId, ObjectStore};
use crate::octree::Octree;
use crate::triangle::Triangle;
use crate::Hit;

/// Spatial index answering nearest-hit and overlap queries.
///
/// Every query takes `&mut self` because it advances the query epoch and
/// stamps the objects it reports. Geometry lives outside the index; triangle
/// tests read it from the `positions` slice passed to each query.
#[derive(Debug)]
pub struct CollisionIndex {
    octree: Octree,
    objects: ObjectStore,
    /// Last epoch handed out; 0 is never used by a query.
    epoch: u64,
    config: CollisionConfig,
    /// Reused candidate buffer for nearest-hit queries.
    scratch: Vec<ObjectId>,
}

impl CollisionIndex {
    /// Create an empty index covering `bounds`.
    pub fn new(bounds: Aabb, config: CollisionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            octree: Octree::new(bounds, config.depth)?,
            objects: ObjectStore::default(),
            epoch: 0,
            config,
            scratch: Vec::new(),
        })
    }

    /// Create an empty index with room for `capacity` objects.
    pub fn with_capacity(bounds: Aabb, config: CollisionConfig, capacity: usize) -> Result<Self> {
        let mut index = Self::new(bounds, config)?;
        index.objects = ObjectStore::with_capacity(capacity);
        Ok(index)
    }

    /// Get the configuration.
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Region covered by the octree.
    pub fn bounds(&self) -> &Aabb {
        self.octree.bounds()
    }

    /// The underlying octree.
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Number of leaves in the octree.
    pub fn leaf_count(&self) -> usize {
        self.octree.leaf_count()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the index holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last query epoch issued.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Look up an object.
    pub fn object(&self, id: ObjectId) -> Option<&CollisionShape> {
        self.objects.get(id).map(|object| &object.shape)
    }

    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn insert_shape(&mut self, shape: CollisionShape) -> ObjectId {
        let id = self.objects.insert(shape);
        if let Some(object) = self.objects.get_mut(id) {
            self.octree.insert(id, object);
        }
        id
    }

    /// Insert a static triangle.
    pub fn insert_triangle(&mut self, triangle: Triangle) -> ObjectId {
        self.insert_shape(CollisionShape::Triangle(triangle))
    }

    /// Insert a movable box obstacle.
    pub fn insert_dynamic(&mut self, bounds: Aabb) -> ObjectId {
        let id = self.insert_shape(CollisionShape::Dynamic(DynamicObject::new(bounds)));
        tracing::trace!(id = id.raw(), ?bounds, "inserted dynamic object");
        id
    }

    /// Remove an object.
    ///
    /// Dynamic objects are removed from exactly the leaves they recorded;
    /// triangles fall back to walking the leaves their bounds overlap.
    pub fn remove(&mut self, id: ObjectId) -> Result<()> {
        let object = self
            .objects
            .remove(id)
            .ok_or(Error::UnknownObject(id.raw()))?;
        match object.shape {
            CollisionShape::Dynamic(mut obj) => {
                for leaf in obj.take_leaves() {
                    self.octree.remove_from_leaf(leaf, id);
                }
            }
            CollisionShape::Triangle(tri) => {
                self.octree.remove(id, tri.bounds());
            }
        }
        Ok(())
    }

    /// Move a dynamic object to new bounds, keeping its handle.
    pub fn update_dynamic(&mut self, id: ObjectId, bounds: Aabb) -> Result<()> {
        let leaves = match self.objects.get_mut(id).map(|object| &mut object.shape) {
            Some(CollisionShape::Dynamic(obj)) => {
                obj.set_bounds(bounds);
                obj.take_leaves()
            }
            _ => return Err(Error::UnknownObject(id.raw())),
        };
        for leaf in leaves {
            self.octree.remove_from_leaf(leaf, id);
        }
        if let Some(object) = self.objects.get_mut(id) {
            self.octree.insert(id, object);
        }
        Ok(())
    }

    /// Every object whose bounds overlap `region`, each reported once.
    pub fn get_elements(&mut self, region: &Aabb) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.get_elements_into(region, &mut out);
        out
    }

    /// Like [`CollisionIndex::get_elements`], appending into `out`.
    pub fn get_elements_into(&mut self, region: &Aabb, out: &mut Vec<ObjectId>) {
        let epoch = self.next_epoch();
        self.octree.query(region, epoch, &mut self.objects, out);
    }

    /// Nearest front-facing hit strictly within the ray segment.
    #[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
    pub fn ray_intersect(&mut self, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        let length = ray.length();
        if length < EPSILON {
            return None;
        }
        let region = ray.bounds().inflated(self.config.query_margin);
        self.nearest(&region, length, |shape| shape.ray_intersect(ray, positions))
    }

    /// Nearest hit of `shape` (relative to the ray origin) swept along the
    /// ray segment.
    #[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
    pub fn box_intersect(&mut self, shape: &Aabb, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        let length = ray.length();
        if length < EPSILON {
            return None;
        }
        let start = shape.translated(ray.origin);
        let region = start
            .union(&shape.translated(ray.end()))
            .inflated(self.config.query_margin);
        self.nearest(&region, length, |candidate| {
            candidate.box_intersect(shape, ray, positions)
        })
    }

    fn nearest<F>(&mut self, region: &Aabb, limit: f32, test: F) -> Option<Hit>
    where
        F: Fn(&CollisionShape) -> Option<Hit>,
    {
        let mut candidates = std::mem::take(&mut self.scratch);
        candidates.clear();
        self.get_elements_into(region, &mut candidates);

        let mut best: Option<Hit> = None;
        let mut nearest = limit;
        for &id in &candidates {
            let Some(object) = self.objects.get(id) else {
                continue;
            };
            if let Some(hit) = test(&object.shape) {
                if hit.distance < nearest {
                    nearest = hit.distance;
                    best = Some(hit);
                }
            }
        }
        tracing::trace!(
            candidates = candidates.len(),
            hit = best.is_some(),
            "nearest-hit query"
        );

        self.scratch = candidates;
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn empty_index(depth: u32) -> CollisionIndex {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(8.0));
        CollisionIndex::new(bounds, CollisionConfig::default().with_depth(depth)).unwrap()
    }

    /// Floor triangle at y = 1 spanning the octant split at x = 4.
    fn straddling_floor() -> Vec<Vec3> {
        vec![
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(3.0, 1.0, 3.0),
            Vec3::new(7.0, 1.0, 1.0),
        ]
    }

    #[test]
    fn rejects_invalid_config() {
        let config = CollisionConfig::default().with_depth(99);
        assert!(CollisionIndex::new(Aabb::default(), config).is_err());
    }

    #[test]
    fn straddling_triangle_reported_once() {
        let positions = straddling_floor();
        let mut index = empty_index(2);
        let id = index.insert_triangle(Triangle::new([0, 1, 2], &positions));
        assert!(index.octree().reference_count() > 1);

        let region = Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(6.0, 2.0, 2.0));
        assert_eq!(index.get_elements(&region), vec![id]);
        // Every call is a fresh query
        assert_eq!(index.get_elements(&region), vec![id]);
        assert_eq!(index.epoch(), 2);
    }

    #[test]
    fn ray_hit_must_fall_inside_segment() {
        let positions = straddling_floor();
        let mut index = empty_index(2);
        index.insert_triangle(Triangle::new([0, 1, 2], &positions));

        let hit = index
            .ray_intersect(&Ray::between(Vec3::new(4.0, 3.0, 1.5), Vec3::new(4.0, 0.0, 1.5)), &positions)
            .expect("should hit");
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-5);
        assert_eq!(hit.normal, Vec3::Y);

        // Segment stops short of the floor
        let short = Ray::between(Vec3::new(4.0, 3.0, 1.5), Vec3::new(4.0, 1.5, 1.5));
        assert!(index.ray_intersect(&short, &positions).is_none());
    }

    #[test]
    fn ray_picks_nearest_of_several() {
        let positions = vec![
            Vec3::new(0.5, 2.0, 0.5),
            Vec3::new(0.5, 2.0, 7.5),
            Vec3::new(7.5, 2.0, 0.5),
            Vec3::new(0.5, 5.0, 0.5),
            Vec3::new(0.5, 5.0, 7.5),
            Vec3::new(7.5, 5.0, 0.5),
        ];
        let mut index = empty_index(3);
        index.insert_triangle(Triangle::new([0, 1, 2], &positions));
        let upper = index.insert_triangle(Triangle::new([3, 4, 5], &positions));
        assert_eq!(index.len(), 2);

        let ray = Ray::between(Vec3::new(2.0, 7.0, 2.0), Vec3::new(2.0, 0.0, 2.0));
        let hit = index.ray_intersect(&ray, &positions).expect("should hit");
        assert_relative_eq!(hit.position.y, 5.0, epsilon = 1e-5);

        index.remove(upper).unwrap();
        let hit = index.ray_intersect(&ray, &positions).expect("should hit");
        assert_relative_eq!(hit.position.y, 2.0, epsilon = 1e-5);
        assert!(matches!(index.remove(upper), Err(Error::UnknownObject(_))));
    }

    #[test]
    fn box_sweep_stops_on_floor() {
        let positions = straddling_floor();
        let mut index = empty_index(2);
        index.insert_triangle(Triangle::new([0, 1, 2], &positions));

        let shape = Aabb::new(Vec3::new(-0.25, 0.0, -0.25), Vec3::new(0.25, 1.0, 0.25));
        let ray = Ray::between(Vec3::new(4.0, 4.0, 1.5), Vec3::new(4.0, 0.0, 1.5));
        let hit = index.box_intersect(&shape, &ray, &positions).expect("should hit");
        assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-4);
        assert!(hit.normal.dot(Vec3::Y) > 0.99);
    }

    #[test]
    fn dynamic_objects_move_and_leave() {
        let mut index = empty_index(2);
        let id = index.insert_dynamic(Aabb::new(Vec3::splat(1.0), Vec3::splat(2.0)));
        let probe = Aabb::new(Vec3::splat(1.5), Vec3::splat(1.6));
        assert_eq!(index.get_elements(&probe), vec![id]);

        index
            .update_dynamic(id, Aabb::new(Vec3::splat(5.0), Vec3::splat(7.0)))
            .unwrap();
        assert!(index.get_elements(&probe).is_empty());
        assert_eq!(index.get_elements(&Aabb::new(Vec3::splat(6.0), Vec3::splat(6.5))), vec![id]);

        index.remove(id).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.octree().reference_count(), 0);
    }

    #[test]
    fn update_rejects_triangles() {
        let positions = straddling_floor();
        let mut index = empty_index(1);
        let id = index.insert_triangle(Triangle::new([0, 1, 2], &positions));
        assert!(index.update_dynamic(id, Aabb::default()).is_err());
    }

    #[test]
    fn zero_length_queries_miss() {
        let positions = straddling_floor();
        let mut index = empty_index(1);
        index.insert_triangle(Triangle::new([0, 1, 2], &positions));
        let ray = Ray::new(Vec3::new(4.0, 1.0, 1.5), Vec3::ZERO);
        assert!(index.ray_intersect(&ray, &positions).is_none());
        assert!(index
            .box_intersect(&Aabb::from_half_extents(Vec3::ONE), &ray, &positions)
            .is_none());
    }
}
