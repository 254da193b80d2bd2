//! Sliding movement resolution.
//!
//! A blocked displacement is clipped at the contact, then redirected along
//! the surface: the component along the contact normal is scaled by `bump`
//! and reflected, the tangential component is scaled by `friction`. The
//! remaining distance is carried into the new direction and the process
//! repeats until the motion settles or the bounce budget is spent.

use glam::Vec3;
use octoslide_core::constants::EPSILON;
use octoslide_core::{Aabb, Ray};

use crate::config::CollisionConfig;
use crate::index::CollisionIndex;
use crate::Hit;

/// One entity's attempted movement for a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    /// Current position.
    pub start: Vec3,
    /// Unobstructed destination.
    pub end: Vec3,
    /// Current velocity; only its magnitude survives resolution.
    pub velocity: Vec3,
    /// Tangential retention after a bounce.
    pub friction: f32,
    /// Normal retention after a bounce (0 slides, 1 reflects).
    pub bump: f32,
    /// Maximum number of collision probes.
    pub recursion_budget: u32,
}

impl MoveRequest {
    /// Request using the [`CollisionConfig`] defaults (pure sliding,
    /// budget 3). Use [`CollisionConfig::move_request`] for tuned defaults.
    pub fn new(start: Vec3, end: Vec3) -> Self {
        CollisionConfig::default().move_request(start, end)
    }

    /// Set the velocity whose speed is reported back.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the friction factor.
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set the bump factor.
    pub fn with_bump(mut self, bump: f32) -> Self {
        self.bump = bump;
        self
    }

    /// Set the recursion budget.
    pub fn with_recursion_budget(mut self, budget: u32) -> Self {
        self.recursion_budget = budget;
        self
    }
}

/// Outcome of a movement resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    /// Where the entity ended up.
    pub position: Vec3,
    /// Last travel direction at the request's original speed.
    pub velocity: Vec3,
    /// First contact point, for point movement only.
    pub contact: Option<Vec3>,
    /// Collision probes used.
    pub iterations: u32,
    /// Probes that hit something.
    pub contacts: u32,
    /// Budget ran out with motion left to apply.
    pub blocked: bool,
}

impl CollisionIndex {
    /// Move a point from `request.start` toward `request.end`, sliding along
    /// whatever it hits.
    #[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
    pub fn point_move(&mut self, request: &MoveRequest, positions: &[Vec3]) -> MoveResult {
        self.slide(request, true, |index, ray| index.ray_intersect(ray, positions))
    }

    /// Move `shape` (relative to the position) from `request.start` toward
    /// `request.end`, sliding along whatever it hits.
    #[cfg_attr(feature = "profiling", tracing::instrument(level = "trace", skip_all))]
    pub fn box_move(&mut self, shape: &Aabb, request: &MoveRequest, positions: &[Vec3]) -> MoveResult {
        self.slide(request, false, |index, ray| {
            index.box_intersect(shape, ray, positions)
        })
    }

    fn slide<F>(&mut self, request: &MoveRequest, track_contact: bool, mut probe: F) -> MoveResult
    where
        F: FnMut(&mut Self, &Ray) -> Option<Hit>,
    {
        let displacement = request.end - request.start;
        let mut remaining = displacement.length();
        if remaining < EPSILON {
            return MoveResult {
                position: request.start,
                velocity: request.velocity,
                contact: None,
                iterations: 0,
                contacts: 0,
                blocked: false,
            };
        }

        let skin = self.config().skin_width;
        let speed = request.velocity.length();
        let mut position = request.start;
        let mut target = request.end;
        let mut travel = displacement / remaining;
        let mut contact = None;
        let mut iterations = 0;
        let mut contacts = 0;

        while iterations < request.recursion_budget {
            iterations += 1;
            let ray = Ray::between(position, target);
            let Some(hit) = probe(self, &ray) else {
                position = target;
                remaining = 0.0;
                break;
            };

            contacts += 1;
            // Gap left to the surface is `skin` along its normal
            let facing = travel.dot(hit.normal).abs().max(EPSILON);
            if hit.distance > EPSILON {
                let advance = (hit.distance - skin / facing).max(0.0);
                position += travel * advance;
                remaining = (remaining - advance).max(0.0);
            }
            if track_contact && contact.is_none() {
                contact = Some(hit.position);
            }

            let into = hit.normal * travel.dot(hit.normal);
            let tangent = travel - into;
            let redirected = tangent * request.friction - into * request.bump;
            remaining *= redirected.length();
            travel = redirected.normalize_or_zero();
            target = position + travel * remaining;

            tracing::trace!(
                iteration = iterations,
                distance = hit.distance,
                remaining,
                ?travel,
                "movement contact"
            );
            if remaining < EPSILON || travel == Vec3::ZERO {
                remaining = 0.0;
                break;
            }
        }

        let blocked = remaining >= EPSILON;
        if blocked {
            tracing::trace!(remaining, "movement budget exhausted");
        }

        MoveResult {
            position,
            velocity: travel * speed,
            contact,
            iterations,
            contacts,
            blocked,
        }
    }
}
