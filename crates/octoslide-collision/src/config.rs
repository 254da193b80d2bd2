//! Collision index tuning.

use octoslide_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::movement::MoveRequest;
use glam::Vec3;

/// Deepest octree the index will build (8^6 leaves).
pub const MAX_DEPTH: u32 = 6;

/// Collision index configuration.
///
/// Geometric tolerances are fixed in [`octoslide_core::constants`]; these are
/// the tuning knobs that differ between games.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Octree subdivision depth.
    pub depth: u32,
    /// Gap kept between a resolved position and the surface it stopped at.
    pub skin_width: f32,
    /// Inflation applied to candidate query boxes.
    pub query_margin: f32,
    /// Default bounce budget for movement requests.
    pub recursion_budget: u32,
    /// Default tangential retention after a bounce.
    pub friction: f32,
    /// Default normal retention after a bounce (0 slides, 1 reflects).
    pub bump: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            depth: 4,
            skin_width: 1e-4,
            query_margin: 1e-4,
            recursion_budget: 3,
            friction: 1.0,
            bump: 0.0,
        }
    }
}

impl CollisionConfig {
    /// Set the octree depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Set the skin width.
    pub fn with_skin_width(mut self, skin_width: f32) -> Self {
        self.skin_width = skin_width;
        self
    }

    /// Set the default recursion budget.
    pub fn with_recursion_budget(mut self, budget: u32) -> Self {
        self.recursion_budget = budget;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.depth > MAX_DEPTH {
            return Err(Error::InvalidConfig(format!(
                "depth {} exceeds maximum {MAX_DEPTH}",
                self.depth
            )));
        }
        for (name, value) in [
            ("skin_width", self.skin_width),
            ("query_margin", self.query_margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !self.friction.is_finite() || !self.bump.is_finite() {
            return Err(Error::InvalidConfig(
                "friction and bump must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Movement request from `start` to `end` using this config's defaults.
    pub fn move_request(&self, start: Vec3, end: Vec3) -> MoveRequest {
        MoveRequest {
            start,
            end,
            velocity: end - start,
            friction: self.friction,
            bump: self.bump,
            recursion_budget: self.recursion_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(CollisionConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let deep = CollisionConfig::default().with_depth(MAX_DEPTH + 1);
        assert!(matches!(deep.validate(), Err(Error::InvalidConfig(_))));

        let negative = CollisionConfig::default().with_skin_width(-1.0);
        assert!(negative.validate().is_err());

        let nan = CollisionConfig {
            bump: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn partial_ron_uses_defaults() {
        let config: CollisionConfig = ron::from_str("(depth: 2, friction: 0.5)").unwrap();
        assert_eq!(config.depth, 2);
        assert_eq!(config.friction, 0.5);
        assert_eq!(config.recursion_budget, 3);
    }

    #[test]
    fn move_request_uses_defaults() {
        let config = CollisionConfig::default().with_recursion_budget(7);
        let request = config.move_request(Vec3::ZERO, Vec3::X);
        assert_eq!(request.recursion_budget, 7);
        assert_eq!(request.velocity, Vec3::X);
        assert_eq!(request.bump, 0.0);
    }
}
