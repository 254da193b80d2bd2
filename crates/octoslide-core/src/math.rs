//! Box and ray primitives.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::EPSILON;

/// Segment ray for collision queries.
///
/// Unlike a render ray the direction is not normalized: its length is the
/// length of the segment, so `origin + direction` is the segment's end.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Ray {
    /// Segment start
    pub origin: Vec3,
    /// Segment vector (start to end)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new segment ray
    #[inline]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Create the segment running from `start` to `end`
    #[inline]
    pub fn between(start: Vec3, end: Vec3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }

    /// Length of the segment
    #[inline]
    pub fn length(&self) -> f32 {
        self.direction.length()
    }

    /// End point of the segment
    #[inline]
    pub fn end(&self) -> Vec3 {
        self.origin + self.direction
    }

    /// Normalized direction, or zero for a degenerate segment
    #[inline]
    pub fn unit_direction(&self) -> Vec3 {
        self.direction.normalize_or_zero()
    }

    /// Point at `distance` world units from the origin
    #[inline]
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.unit_direction() * distance
    }

    /// Bounding box of the segment
    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.origin, self.end())
    }
}

/// One of the six faces of an axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoxFace {
    NegX = 0,
    PosX = 1,
    NegY = 2,
    PosY = 3,
    NegZ = 4,
    PosZ = 5,
}

impl BoxFace {
    /// All faces in index order
    pub const ALL: [Self; 6] = [
        Self::NegX,
        Self::PosX,
        Self::NegY,
        Self::PosY,
        Self::NegZ,
        Self::PosZ,
    ];

    /// Face on `axis` (0 = X, 1 = Y, 2 = Z), on the max side if `positive`
    #[inline]
    pub const fn from_axis(axis: usize, positive: bool) -> Self {
        Self::ALL[axis * 2 + positive as usize]
    }

    /// Face index in 0..6
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis this face is perpendicular to
    #[inline]
    pub const fn axis(self) -> usize {
        self as usize / 2
    }

    /// Outward unit normal
    #[inline]
    pub fn normal(self) -> Vec3 {
        let mut n = Vec3::ZERO;
        n[self.axis()] = if self as usize % 2 == 1 { 1.0 } else { -1.0 };
        n
    }
}

/// Result of a slab test against an [`Aabb`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxRayHit {
    /// Face the ray enters through, or leaves through when the origin is inside
    pub face: BoxFace,
    /// Parameter of the entry point (negative if the origin is inside)
    pub near: f32,
    /// Parameter of the exit point
    pub far: f32,
}

impl BoxRayHit {
    /// Ray parameter of the reported face
    #[inline]
    pub fn distance(&self) -> f32 {
        if self.near >= 0.0 {
            self.near
        } else {
            self.far
        }
    }

    /// True when the ray starts inside the box
    #[inline]
    pub fn starts_inside(&self) -> bool {
        self.near < 0.0
    }
}

/// One of the twelve edges of an axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxEdge {
    pub start: Vec3,
    pub end: Vec3,
    /// Unit bisector of the two faces that meet at this edge
    pub outward: Vec3,
}

/// Axis-Aligned Bounding Box.
///
/// `min <= max` on every axis is maintained by construction and growth; it is
/// never checked. [`Aabb::empty`] is the one deliberately inverted box, meant
/// to be grown with [`Aabb::add_point`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that becomes valid after the first [`Aabb::add_point`]
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Smallest box containing both points
    #[inline]
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB centered at origin with given half-extents
    #[inline]
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self {
            min: -half_extents,
            max: half_extents,
        }
    }

    /// Get the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get the half-extents of the AABB
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Grow the box to include a point
    #[inline]
    pub fn add_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Merge two AABBs
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Box moved by `offset`
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Box grown by `margin` on every side
    #[inline]
    pub fn inflated(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Check if a point is inside the AABB.
    ///
    /// The test is strict on the min side and inclusive on the max side, so a
    /// point on a plane shared by two octants belongs to exactly one of them.
    #[inline]
    pub fn contains(&self, point: Vec3) -> bool {
        point.x > self.min.x
            && point.x <= self.max.x
            && point.y > self.min.y
            && point.y <= self.max.y
            && point.z > self.min.z
            && point.z <= self.max.z
    }

    /// Check if this AABB overlaps another. Touching boxes overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Corner for octant `index`: bit 0 selects max X, bit 1 max Y, bit 2 max Z.
    #[inline]
    pub fn corner(&self, index: usize) -> Vec3 {
        Vec3::new(
            if index & 1 != 0 { self.max.x } else { self.min.x },
            if index & 2 != 0 { self.max.y } else { self.min.y },
            if index & 4 != 0 { self.max.z } else { self.min.z },
        )
    }

    /// All eight corners, in octant order
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| self.corner(i))
    }

    /// All twelve edges with their outward directions
    pub fn edges(&self) -> [BoxEdge; 12] {
        let mut edges = [BoxEdge {
            start: Vec3::ZERO,
            end: Vec3::ZERO,
            outward: Vec3::ZERO,
        }; 12];
        let mut n = 0;
        for axis in 0..3 {
            let bit = 1 << axis;
            for corner in (0..8).filter(|c| c & bit == 0) {
                let mut outward = Vec3::ZERO;
                for other in (0..3).filter(|&a| a != axis) {
                    outward[other] = if corner & (1 << other) != 0 { 1.0 } else { -1.0 };
                }
                edges[n] = BoxEdge {
                    start: self.corner(corner),
                    end: self.corner(corner | bit),
                    outward: outward * std::f32::consts::FRAC_1_SQRT_2,
                };
                n += 1;
            }
        }
        edges
    }

    /// Split the box at its center into eight octants.
    ///
    /// Child `i` uses the same bit layout as [`Aabb::corner`]: bit 0 is the
    /// upper X half, bit 1 the upper Y half, bit 2 the upper Z half.
    pub fn subdivide(&self) -> [Self; 8] {
        let center = self.center();
        std::array::from_fn(|i| Self::from_points(center, self.corner(i)))
    }

    /// Slab ray test.
    ///
    /// Parameters in the result are multiples of `direction`. A direction
    /// component within [`EPSILON`] of zero is treated as parallel to that
    /// axis' slab: the ray misses unless the origin lies between the slab
    /// planes. Returns `None` when the box is missed or lies entirely behind
    /// the origin.
    pub fn ray_intersect(&self, origin: Vec3, direction: Vec3) -> Option<BoxRayHit> {
        let mut near = f32::NEG_INFINITY;
        let mut far = f32::INFINITY;
        let mut near_face = None;
        let mut far_face = None;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < EPSILON {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let t_min = (self.min[axis] - o) * inv;
            let t_max = (self.max[axis] - o) * inv;
            // Moving up the axis enters through the min face
            let (t_enter, t_exit) = if d > 0.0 { (t_min, t_max) } else { (t_max, t_min) };

            if t_enter > near {
                near = t_enter;
                near_face = Some(BoxFace::from_axis(axis, d < 0.0));
            }
            if t_exit < far {
                far = t_exit;
                far_face = Some(BoxFace::from_axis(axis, d > 0.0));
            }
            if near > far {
                return None;
            }
        }

        if far < 0.0 {
            return None;
        }
        let face = if near >= 0.0 { near_face } else { far_face };
        face.map(|face| BoxRayHit { face, near, far })
    }
}
