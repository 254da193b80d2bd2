//! Static mesh triangles and their intersection tests.
//!
//! Triangles never own geometry: they index into the vertex array held by
//! the mesh source, and every test takes that array explicitly.

use glam::Vec3;
use octoslide_core::constants::{EDGE_CULL_COS, EPSILON};
use octoslide_core::{Aabb, Ray};

use crate::Hit;

/// Triangle collision primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    indices: [u32; 3],
    bounds: Aabb,
}

impl Triangle {
    /// Create a triangle and cache its bounds.
    ///
    /// Indices must be in range for `positions`; the mesh source checks this
    /// before building any triangle.
    pub fn new(indices: [u32; 3], positions: &[Vec3]) -> Self {
        let mut bounds = Aabb::empty();
        for i in indices {
            bounds.add_point(positions[i as usize]);
        }
        Self { indices, bounds }
    }

    /// Vertex indices in winding order.
    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        self.indices
    }

    /// Cached bounds.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Vertex positions in winding order.
    #[inline]
    pub fn vertices(&self, positions: &[Vec3]) -> [Vec3; 3] {
        self.indices.map(|i| positions[i as usize])
    }

    /// Unit face normal, determined by winding. Zero for degenerate triangles.
    pub fn normal(&self, positions: &[Vec3]) -> Vec3 {
        let [a, b, c] = self.vertices(positions);
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Single-sided ray test against the front face.
    pub fn ray_intersect(&self, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        let direction = ray.unit_direction();
        if direction == Vec3::ZERO {
            return None;
        }
        ray_triangle(ray.origin, direction, &self.vertices(positions))
    }

    /// Sweep `shape` (relative to the ray origin) along the ray.
    ///
    /// Combines three contact cases and keeps the nearest:
    /// box edges against triangle edges, box corners against the triangle
    /// face, and triangle corners against the box faces.
    pub fn box_intersect(&self, shape: &Aabb, ray: &Ray, positions: &[Vec3]) -> Option<Hit> {
        let direction = ray.unit_direction();
        if direction == Vec3::ZERO {
            return None;
        }
        let vertices = self.vertices(positions);
        let swept = shape.translated(ray.origin);
        let mut best: Option<Hit> = None;

        for edge in swept.edges() {
            if edge.outward.dot(direction) < EDGE_CULL_COS {
                continue;
            }
            for i in 0..3 {
                let (p, q) = (vertices[i], vertices[(i + 1) % 3]);
                if let Some(hit) = sweep_edge(edge.start, edge.end, direction, p, q) {
                    best = Some(hit.nearest(best));
                }
            }
        }

        for corner in swept.corners() {
            if let Some(hit) = ray_triangle(corner, direction, &vertices) {
                best = Some(hit.nearest(best));
            }
        }

        for vertex in vertices {
            let Some(entry) = swept.ray_intersect(vertex, -direction) else {
                continue;
            };
            // Vertex already inside the box: moving on cannot make first contact
            if entry.starts_inside() {
                continue;
            }
            // Touching the rim of a face is an edge contact; a vertex in the
            // plane of a face the box rests on must not stop it
            let touch = vertex - direction * entry.near;
            let axis = entry.face.axis();
            let on_rim = (0..3).filter(|&k| k != axis).any(|k| {
                touch[k] <= swept.min[k] + EPSILON || touch[k] >= swept.max[k] - EPSILON
            });
            if on_rim {
                continue;
            }
            let hit = Hit {
                distance: entry.near,
                position: vertex,
                normal: -entry.face.normal(),
            };
            best = Some(hit.nearest(best));
        }

        best
    }
}

/// Möller–Trumbore test against the front face of `[a, b, c]`.
///
/// `direction` must be unit length so the returned distance is in world
/// units. Back faces and rays parallel to the plane miss. Barycentric bounds
/// are widened by [`EPSILON`] so rays grazing a shared edge hit one of the
/// two triangles.
pub fn ray_triangle(origin: Vec3, direction: Vec3, [a, b, c]: &[Vec3; 3]) -> Option<Hit> {
    let edge1 = *b - *a;
    let edge2 = *c - *a;

    let pvec = direction.cross(edge2);
    let det = edge1.dot(pvec);
    // det is -direction . normal, so only rays against the winding pass
    if det < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = origin - *a;
    let u = tvec.dot(pvec) * inv_det;
    if !(-EPSILON..=1.0 + EPSILON).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = direction.dot(qvec) * inv_det;
    if v < -EPSILON || u + v > 1.0 + EPSILON {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < 0.0 {
        return None;
    }

    let normal = edge1.cross(edge2).normalize_or_zero();
    if normal == Vec3::ZERO {
        return None;
    }

    Some(Hit {
        distance: t,
        position: origin + direction * t,
        normal,
    })
}

/// Sweep the segment `a..b` along `direction` and find where its interior
/// first crosses the segment `p..q`.
///
/// The crossing is located on the sweep plane, then solved in 2D after
/// dropping the plane normal's dominant axis.
fn sweep_edge(a: Vec3, b: Vec3, direction: Vec3, p: Vec3, q: Vec3) -> Option<Hit> {
    let edge = b - a;
    let plane_normal = edge.cross(direction);
    if plane_normal.length_squared() < EPSILON * EPSILON {
        return None;
    }

    let dp = plane_normal.dot(p - a);
    let dq = plane_normal.dot(q - a);
    if (dp > 0.0 && dq > 0.0) || (dp < 0.0 && dq < 0.0) || (dp - dq).abs() < EPSILON {
        return None;
    }
    let crossing = p + (q - p) * (dp / (dp - dq));
    let offset = crossing - a;

    let abs = plane_normal.abs();
    let (i, j) = if abs.x >= abs.y && abs.x >= abs.z {
        (1, 2)
    } else if abs.y >= abs.z {
        (2, 0)
    } else {
        (0, 1)
    };

    let det = edge[i] * direction[j] - edge[j] * direction[i];
    if det.abs() < EPSILON {
        return None;
    }
    let s = (offset[i] * direction[j] - offset[j] * direction[i]) / det;
    let t = (edge[i] * offset[j] - edge[j] * offset[i]) / det;
    // Endpoints of the box edge are box corners, handled by the corner casts
    if s <= EPSILON || s >= 1.0 - EPSILON || t < 0.0 {
        return None;
    }

    let normal = edge.cross(q - p).normalize_or_zero();
    if normal == Vec3::ZERO {
        return None;
    }
    let normal = if normal.dot(direction) > 0.0 { -normal } else { normal };

    Some(Hit {
        distance: t,
        position: crossing,
        normal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn unit_triangle() -> (Triangle, Vec<Vec3>) {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        (Triangle::new([0, 1, 2], &positions), positions)
    }

    /// Large floor at y = 0 facing +Y.
    fn floor() -> (Triangle, Vec<Vec3>) {
        let positions = vec![
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(10.0, 0.0, -10.0),
        ];
        (Triangle::new([0, 1, 2], &positions), positions)
    }

    #[test]
    fn bounds_cover_vertices() {
        let (tri, _) = unit_triangle();
        assert_eq!(tri.bounds().min, Vec3::ZERO);
        assert_eq!(tri.bounds().max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn ray_down_the_normal_hits() {
        let (tri, positions) = unit_triangle();
        let ray = Ray::between(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.25, 0.25, -1.0));
        let hit = tri.ray_intersect(&ray, &positions).expect("should hit");
        assert_relative_eq!(hit.distance, 1.0);
        assert_abs_diff_eq!(hit.position, Vec3::new(0.25, 0.25, 0.0), epsilon = 1e-6);
        assert_abs_diff_eq!(hit.normal, Vec3::Z, epsilon = 1e-6);
        assert_abs_diff_eq!(tri.normal(&positions), Vec3::Z, epsilon = 1e-6);
    }

    #[test]
    fn back_face_is_culled() {
        let (tri, positions) = unit_triangle();
        let ray = Ray::between(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.25, 0.25, 1.0));
        assert!(tri.ray_intersect(&ray, &positions).is_none());
    }

    #[test]
    fn parallel_ray_misses_without_nan() {
        let (tri, positions) = unit_triangle();
        let ray = Ray::between(Vec3::new(-1.0, 0.25, 0.5), Vec3::new(2.0, 0.25, 0.5));
        assert!(tri.ray_intersect(&ray, &positions).is_none());
        // In-plane ray as well
        let ray = Ray::between(Vec3::new(-1.0, 0.25, 0.0), Vec3::new(2.0, 0.25, 0.0));
        assert!(tri.ray_intersect(&ray, &positions).is_none());
    }

    #[test]
    fn grazing_shared_edge_hits() {
        let (tri, positions) = unit_triangle();
        // Exactly on the hypotenuse u + v = 1
        let ray = Ray::between(Vec3::new(0.5, 0.5, 1.0), Vec3::new(0.5, 0.5, -1.0));
        assert!(tri.ray_intersect(&ray, &positions).is_some());
        let ray = Ray::between(Vec3::new(0.6, 0.6, 1.0), Vec3::new(0.6, 0.6, -1.0));
        assert!(tri.ray_intersect(&ray, &positions).is_none());
    }

    #[test]
    fn degenerate_triangle_misses() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        let tri = Triangle::new([0, 1, 2], &positions);
        assert_eq!(tri.normal(&positions), Vec3::ZERO);
        let ray = Ray::between(Vec3::new(0.5, 1.0, 0.0), Vec3::new(0.5, -1.0, 0.0));
        assert!(tri.ray_intersect(&ray, &positions).is_none());
    }

    #[test]
    fn box_lands_on_floor_face() {
        let (tri, positions) = floor();
        let shape = Aabb::new(Vec3::new(-0.5, 0.0, -0.5), Vec3::new(0.5, 2.0, 0.5));
        let ray = Ray::between(Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = tri.box_intersect(&shape, &ray, &positions).expect("should hit");
        assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(hit.normal, Vec3::Y, epsilon = 1e-5);
    }

    #[test]
    fn box_moving_away_misses() {
        let (tri, positions) = floor();
        let shape = Aabb::from_half_extents(Vec3::splat(0.5));
        let ray = Ray::between(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 5.0, 0.0));
        assert!(tri.box_intersect(&shape, &ray, &positions).is_none());
    }

    #[test]
    fn box_face_meets_triangle_corner() {
        // Spike pointing at -X, facing the box, narrower than the box face
        let positions = vec![
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(8.0, 0.2, 0.0),
            Vec3::new(8.0, -0.2, 0.0),
        ];
        let tri = Triangle::new([0, 1, 2], &positions);
        let shape = Aabb::from_half_extents(Vec3::splat(1.0));
        let ray = Ray::between(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let hit = tri.box_intersect(&shape, &ray, &positions).expect("should hit");
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(hit.position, Vec3::new(5.0, 0.0, 0.0), epsilon = 1e-5);
        assert_abs_diff_eq!(hit.normal, -Vec3::X, epsilon = 1e-5);
    }

    #[test]
    fn box_edge_meets_triangle_edge() {
        // Triangle hanging below y = 2 with a horizontal bottom edge along Z;
        // the box's top-leading edge (along Z) strikes it side-on.
        let positions = vec![
            Vec3::new(3.0, 1.5, -5.0),
            Vec3::new(3.0, 1.5, 5.0),
            Vec3::new(4.0, 4.0, 0.0),
        ];
        let tri = Triangle::new([0, 1, 2], &positions);
        let shape = Aabb::new(Vec3::new(-0.5, 0.0, -0.5), Vec3::new(0.5, 2.0, 0.5));
        let ray = Ray::between(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let hit = tri.box_intersect(&shape, &ray, &positions).expect("should hit");
        // Leading face x = 0.5 reaches the bottom edge at x = 3.0
        assert_relative_eq!(hit.distance, 2.5, epsilon = 1e-4);
        assert!(hit.normal.dot(Vec3::X) < 0.0);
    }

    #[test]
    fn box_resting_on_floor_slides_past_interior_vertices() {
        // One floor triangle of a larger strip; its vertices at x = 3 lie in
        // the plane of the box's bottom face.
        let positions = vec![
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 3.0),
            Vec3::new(6.0, 0.0, 3.0),
        ];
        let tri = Triangle::new([0, 1, 2], &positions);
        assert_abs_diff_eq!(tri.normal(&positions), Vec3::Y, epsilon = 1e-6);
        let shape = Aabb::new(Vec3::new(-0.4, 0.0, -0.4), Vec3::new(0.4, 1.8, 0.4));

        for lift in [0.0, 1e-5] {
            let ray = Ray::between(Vec3::new(1.0, lift, 1.5), Vec3::new(8.0, lift, 1.5));
            assert_eq!(tri.box_intersect(&shape, &ray, &positions), None, "lift {lift}");
        }

        // A real step still blocks
        let step = vec![
            Vec3::new(3.0, -1.0, 0.0),
            Vec3::new(3.0, -1.0, 3.0),
            Vec3::new(3.0, 0.5, 1.5),
        ];
        let tri = Triangle::new([0, 1, 2], &step);
        let ray = Ray::between(Vec3::new(1.0, 0.0, 1.5), Vec3::new(8.0, 0.0, 1.5));
        let hit = tri.box_intersect(&shape, &ray, &step).expect("step should block");
        assert_relative_eq!(hit.distance, 1.6, epsilon = 1e-4);
    }
}
