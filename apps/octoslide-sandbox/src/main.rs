//! Headless movement sandbox.
//!
//! Builds a small procedural level, drops a box-shaped walker and a bouncing
//! pebble into it, and logs how the collision index resolves their movement.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p octoslide-sandbox
//! cargo run -p octoslide-sandbox -- sandbox.ron
//! RUST_LOG=octoslide=debug cargo run -p octoslide-sandbox
//! ```

use std::path::Path;

use anyhow::Context;
use glam::Vec3;
use octoslide_collision::{CollisionConfig, MeshCollisionSource, MoveResult};
use octoslide_core::{Aabb, Ray};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Side length of the square level.
const LEVEL_SIZE: f32 = 20.0;

/// Height of the level's walls.
const WALL_HEIGHT: f32 = 4.0;

/// Sandbox settings, loadable from a RON file. Missing fields use defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    collision: CollisionConfig,
    ticks: u32,
    dt: f32,
    gravity: Vec3,
    walk_velocity: Vec3,
    spawn: Vec3,
    body: Aabb,
    pebble_bump: f32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            collision: CollisionConfig::default().with_recursion_budget(4),
            ticks: 240,
            dt: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            walk_velocity: Vec3::new(4.0, 0.0, 0.5),
            spawn: Vec3::new(1.5, 3.0, 8.0),
            body: Aabb::new(Vec3::new(-0.4, 0.0, -0.4), Vec3::new(0.4, 1.8, 0.4)),
            pebble_bump: 0.5,
        }
    }
}

impl SandboxConfig {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        ron::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// A body moved by the sandbox each tick.
struct Mover {
    name: &'static str,
    position: Vec3,
    velocity: Vec3,
    contacts: u32,
}

impl Mover {
    const fn new(name: &'static str, position: Vec3, velocity: Vec3) -> Self {
        Self {
            name,
            position,
            velocity,
            contacts: 0,
        }
    }

    /// Apply a resolved move; returns whether the body touched something.
    fn apply(&mut self, result: &MoveResult, dt: f32) -> bool {
        self.position = result.position;
        self.velocity = result.velocity / dt;
        self.contacts += result.contacts;
        result.contacts > 0
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SandboxConfig::load(Path::new(&path))?,
        None => SandboxConfig::default(),
    };
    anyhow::ensure!(config.dt > 0.0, "dt must be positive, got {}", config.dt);
    info!(?config, "starting sandbox");

    let (positions, indices) = build_level();
    let mut mesh = MeshCollisionSource::new(positions, &indices, config.collision)
        .context("failed to build level collision")?;

    // A crate that patrols along Z in front of the far wall
    let crate_shape = Aabb::from_half_extents(Vec3::new(0.75, 0.75, 0.75));
    let crate_base = Vec3::new(13.0, 0.75, 10.0);
    let crate_id = mesh.index_mut().insert_dynamic(crate_shape.translated(crate_base));

    let mut walker = Mover::new("walker", config.spawn, config.walk_velocity);
    let mut pebble = Mover::new("pebble", Vec3::new(3.0, 3.5, 3.0), Vec3::new(2.0, 0.0, 1.0));

    for tick in 0..config.ticks {
        let time = tick as f32 * config.dt;
        let crate_position = crate_base + Vec3::Z * (time * 1.5).sin() * 4.0;
        mesh.index_mut()
            .update_dynamic(crate_id, crate_shape.translated(crate_position))?;

        // Walker: horizontal input is re-applied every tick, gravity accumulates
        walker.velocity.x = config.walk_velocity.x;
        walker.velocity.z = config.walk_velocity.z;
        walker.velocity += config.gravity * config.dt;
        let request = config
            .collision
            .move_request(walker.position, walker.position + walker.velocity * config.dt);
        let result = mesh.box_move(&config.body, &request);
        if walker.apply(&result, config.dt) {
            debug!(tick, mover = walker.name, position = ?walker.position, iterations = result.iterations, blocked = result.blocked, "contact");
        }

        pebble.velocity += config.gravity * config.dt;
        let request = config
            .collision
            .move_request(pebble.position, pebble.position + pebble.velocity * config.dt)
            .with_bump(config.pebble_bump);
        let result = mesh.point_move(&request);
        if pebble.apply(&result, config.dt) {
            debug!(tick, mover = pebble.name, contact = ?result.contact, velocity = ?pebble.velocity, "bounce");
        }

        if tick % 60 == 0 {
            let ground = mesh
                .ray_intersect(&Ray::new(walker.position + Vec3::Y * 0.1, Vec3::NEG_Y * 10.0))
                .map(|hit| hit.distance - 0.1);
            info!(tick, walker = ?walker.position, ?ground, pebble = ?pebble.position, "status");
        }
    }

    for mover in [&walker, &pebble] {
        info!(
            mover = mover.name,
            position = ?mover.position,
            contacts = mover.contacts,
            "finished"
        );
    }
    info!(
        epoch = mesh.index().epoch(),
        objects = mesh.index().len(),
        "query totals"
    );
    Ok(())
}

/// Floor, ramp and four inward-facing walls.
fn build_level() -> (Vec<Vec3>, Vec<u32>) {
    let s = LEVEL_SIZE;
    let h = WALL_HEIGHT;
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut quad = |corners: [Vec3; 4]| {
        let base = positions.len() as u32;
        positions.extend(corners);
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    };

    // Floor, facing +Y
    quad([
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, s),
        Vec3::new(s, 0.0, s),
        Vec3::new(s, 0.0, 0.0),
    ]);
    // Ramp rising toward +X
    quad([
        Vec3::new(5.0, 0.0, 0.0),
        Vec3::new(5.0, 0.0, s),
        Vec3::new(9.0, 1.0, s),
        Vec3::new(9.0, 1.0, 0.0),
    ]);
    // Walls at x = 0 and x = s
    quad([
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, h, 0.0),
        Vec3::new(0.0, h, s),
        Vec3::new(0.0, 0.0, s),
    ]);
    quad([
        Vec3::new(s, 0.0, 0.0),
        Vec3::new(s, 0.0, s),
        Vec3::new(s, h, s),
        Vec3::new(s, h, 0.0),
    ]);
    // Walls at z = 0 and z = s
    quad([
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(s, 0.0, 0.0),
        Vec3::new(s, h, 0.0),
        Vec3::new(0.0, h, 0.0),
    ]);
    quad([
        Vec3::new(0.0, 0.0, s),
        Vec3::new(0.0, h, s),
        Vec3::new(s, h, s),
        Vec3::new(s, 0.0, s),
    ]);

    (positions, indices)
}
