//! Shared setup helpers for rein-motion benchmarks.
//!
//! ## Running
//!
//! Wall-clock (criterion):
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench motion
//!
//! iai-callgrind (instruction counts, requires valgrind):
//!   cargo install iai-callgrind-runner
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench motion_iai
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench motion -- sweep

use glam::{Quat, Vec3};
use hecs::World;
use rein_motion::ecs::components::physics::{Collider, ColliderShape, RigidBody};
use rein_motion::ecs::components::transform::{GlobalTransform, Transform};
use rein_motion::ecs::systems::transform_system;
use rein_motion::{BodyConfig, BodyId, MotionWorld};

pub const FLOOR_HALF_EXTENT: f32 = 200.0;

// ---------------------------------------------------------------------------
// Static scenes
// ---------------------------------------------------------------------------

fn spawn_static(world: &mut World, position: Vec3, shape: ColliderShape) -> hecs::Entity {
    world.spawn((
        Transform::from_position(position),
        GlobalTransform::default(),
        RigidBody::new_static(),
        Collider::new(shape),
    ))
}

/// A floor plus `n` pillars on a 4-unit grid, transforms synced.
pub fn setup_obstacle_world(n: usize) -> World {
    let mut world = World::new();
    spawn_static(
        &mut world,
        Vec3::new(0.0, -0.5, 0.0),
        ColliderShape::Box {
            half_extents: Vec3::new(FLOOR_HALF_EXTENT, 0.5, FLOOR_HALF_EXTENT),
        },
    );

    let cols = (n as f32).sqrt().ceil().max(1.0) as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 4.0 + 2.0;
        let z = (i / cols) as f32 * 4.0 + 2.0;
        let shape = if i % 2 == 0 {
            ColliderShape::Box {
                half_extents: Vec3::new(0.5, 1.0, 0.5),
            }
        } else {
            ColliderShape::Capsule {
                radius: 0.5,
                half_height: 0.5,
            }
        };
        spawn_static(&mut world, Vec3::new(x, 1.0, z), shape);
    }

    transform_system(&mut world);
    world
}

// ---------------------------------------------------------------------------
// Crowds
// ---------------------------------------------------------------------------

/// `n` capsule bodies standing between the pillars of [`setup_obstacle_world`].
pub fn setup_crowd(n: usize, legged: bool) -> (World, MotionWorld, Vec<BodyId>) {
    let mut world = setup_obstacle_world(n);
    let mut motion = MotionWorld::default();
    let cols = (n as f32).sqrt().ceil().max(1.0) as usize;

    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let position = Vec3::new((i % cols) as f32 * 4.0, 0.0, (i / cols) as f32 * 4.0);
        let entity = world.spawn((
            Transform::from_position_rotation(position, Quat::IDENTITY),
            GlobalTransform::default(),
            RigidBody::new_kinematic(),
        ));
        let config = if legged {
            BodyConfig::default().with_legs(Default::default())
        } else {
            BodyConfig::default()
        };
        if let Ok(id) = motion.add_body(&mut world, entity, config) {
            ids.push(id);
        }
    }

    transform_system(&mut world);
    (world, motion, ids)
}

/// Walk every body diagonally for `frames` fixed ticks.
pub fn run_crowd(world: &mut World, motion: &mut MotionWorld, ids: &[BodyId], frames: usize) {
    let heading = Vec3::new(1.0, 0.0, 1.0).normalize() * 3.0;
    for _ in 0..frames {
        for &id in ids {
            if let Some(body) = motion.body_mut(id) {
                body.move_along(heading);
            }
        }
        motion.tick(world, 1.0 / 60.0);
        motion.drain_events().for_each(drop);
    }
}

/// Send every body towards the far corner of the grid.
pub fn navigate_crowd(motion: &mut MotionWorld, ids: &[BodyId]) {
    let corner = Vec3::new(FLOOR_HALF_EXTENT * 0.5, 0.0, FLOOR_HALF_EXTENT * 0.5);
    for &id in ids {
        let _ = motion.navigate_to(id, corner, None, None);
    }
}
