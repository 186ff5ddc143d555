//! Step climbing and ground snapping for legged bodies.

use glam::Vec3;
use tracing::trace;

use crate::physics::ShapeHit;

use super::collision::{CollisionData, CollisionHit, ResolveContext, ResolveStrategy, MIN_MOVE};
use super::config::LeggedConfig;

/// Climbs low obstacles met mid-slide and snaps down onto ground after a
/// grounded tick.
#[derive(Debug, Clone, Default)]
pub struct LeggedStrategy {
    pub config: LeggedConfig,
    probe: Vec<ShapeHit>,
}

impl LeggedStrategy {
    pub fn new(config: LeggedConfig) -> Self {
        Self {
            config,
            probe: Vec::new(),
        }
    }
}

impl ResolveStrategy for LeggedStrategy {
    fn on_obstacle(
        &mut self,
        ctx: &mut ResolveContext<'_, '_, '_>,
        data: &mut CollisionData,
        position: Vec3,
        hit: &ShapeHit,
        remaining: &mut Vec3,
    ) -> bool {
        let mover = ctx.mover;
        let settings = ctx.settings;
        let filter = mover.filter();
        let up = settings.anti_gravity();

        let flat = *remaining - up * remaining.dot(up);
        let flat_len = flat.length();
        if flat_len <= MIN_MOVE || self.config.climb_height <= 0.0 {
            return false;
        }
        let forward = flat / flat_len;

        mover.shape.sweep_all(
            ctx.query,
            position,
            mover.rotation,
            up,
            self.config.climb_height,
            &filter,
            &mut self.probe,
        );
        let rise = self
            .probe
            .first()
            .map_or(self.config.climb_height, |h| h.distance);
        if rise <= MIN_MOVE {
            return false;
        }
        let raised = position + up * rise;

        mover.shape.sweep_all(
            ctx.query,
            raised,
            mover.rotation,
            forward,
            self.config.step_probe,
            &filter,
            &mut self.probe,
        );
        if !self.probe.is_empty() {
            return false;
        }

        let ahead = raised + forward * self.config.step_probe;
        mover.shape.sweep_all(
            ctx.query,
            ahead,
            mover.rotation,
            -up,
            rise,
            &filter,
            &mut self.probe,
        );
        let Some(top) = self.probe.first() else {
            return false;
        };
        if !settings.is_ground(top.normal, top.non_ground) {
            return false;
        }
        let step_height = rise - top.distance;
        if step_height <= MIN_MOVE {
            return false;
        }

        let climb = step_height.min(data.original_velocity.length());
        *remaining += up * climb;
        data.forced_ground = Some(top.normal);
        trace!(entity = ?hit.entity, step_height, climb, "climbing step");
        true
    }

    fn on_terminal(
        &mut self,
        ctx: &mut ResolveContext<'_, '_, '_>,
        data: &mut CollisionData,
        position: &mut Vec3,
    ) {
        let mover = ctx.mover;
        let settings = ctx.settings;
        if !settings.was_grounded || data.forced_ground.is_some() || self.config.snap_height <= 0.0 {
            return;
        }
        if data.original_velocity.dot(settings.anti_gravity()) > MIN_MOVE {
            return;
        }

        let down = settings.gravity_direction;
        let filter = mover.filter();
        mover.shape.sweep_all(
            ctx.query,
            *position,
            mover.rotation,
            down,
            self.config.snap_height,
            &filter,
            &mut self.probe,
        );
        if let Some(hit) = self
            .probe
            .first()
            .filter(|h| settings.is_ground(h.normal, h.non_ground))
        {
            *position += down * hit.distance;
            data.hits.push(CollisionHit::from(hit));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, ColliderShape, RigidBody};
    use crate::ecs::components::transform::{GlobalTransform, Transform};
    use crate::motion::collision::{CollisionResolver, Mover, ResolveSettings};
    use crate::motion::velocity::{FrameVelocity, Velocity};
    use crate::physics::{ShapeAdapter, SpatialQuery};
    use glam::{Mat4, Quat};
    use hecs::Entity;

    fn spawn_box(world: &mut hecs::World, center: Vec3, half_extents: Vec3) -> Entity {
        world.spawn((
            Transform::from_position(center),
            GlobalTransform(Mat4::from_translation(center)),
            RigidBody::new_static(),
            Collider::new(ColliderShape::Box { half_extents }),
        ))
    }

    fn body_shape() -> ShapeAdapter {
        ShapeAdapter::new(
            &ColliderShape::Box {
                half_extents: Vec3::new(0.3, 0.5, 0.3),
            },
            Vec3::new(0.0, 0.5, 0.0),
        )
        .unwrap()
    }

    fn settings(was_grounded: bool) -> ResolveSettings {
        ResolveSettings {
            recursion_budget: 3,
            gravity_direction: Vec3::NEG_Y,
            max_ground_angle: 45f32.to_radians(),
            was_grounded,
        }
    }

    /// Calls `on_obstacle` for a body pressed against the -X face of `step`.
    fn try_climb(step_height: f32) -> (bool, Vec3, CollisionData) {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(0.0, -0.5, 0.0), Vec3::new(50.0, 0.5, 50.0));
        let step = spawn_box(
            &mut world,
            Vec3::new(1.5, step_height * 0.5, 0.0),
            Vec3::new(0.5, step_height * 0.5, 2.0),
        );
        let body = world.spawn(());
        let shape = body_shape();
        let exclude = [body];
        let mover = Mover {
            entity: body,
            shape: &shape,
            rotation: Quat::IDENTITY,
            mask: u32::MAX,
            exclude: &exclude,
        };
        let settings = settings(true);
        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);
        let mut ctx = ResolveContext {
            query: &mut query,
            mover: &mover,
            settings: &settings,
        };
        let mut data = CollisionData {
            original_velocity: Vec3::new(0.5, 0.0, 0.0),
            ..Default::default()
        };
        let hit = ShapeHit {
            entity: step,
            distance: 0.0,
            point: Vec3::new(1.0, 0.1, 0.0),
            normal: Vec3::NEG_X,
            non_ground: false,
            is_sensor: false,
            overlapping: false,
        };
        let mut remaining = Vec3::new(0.5, 0.0, 0.0);
        let mut legged = LeggedStrategy::new(LeggedConfig::default());
        let climbed = legged.on_obstacle(
            &mut ctx,
            &mut data,
            Vec3::new(0.69, 0.01, 0.0),
            &hit,
            &mut remaining,
        );
        (climbed, remaining, data)
    }

    #[test]
    fn test_climbs_low_step() {
        let (climbed, remaining, data) = try_climb(0.2);
        assert!(climbed);
        // Step top 0.19 above the body plus the contact offset.
        assert!((remaining.y - 0.2).abs() < 2e-3, "{remaining}");
        assert_eq!(remaining.x, 0.5);
        let normal = data.forced_ground.unwrap();
        assert!((normal - Vec3::Y).length() < 1e-3);
    }

    #[test]
    fn test_tall_obstacle_blocks() {
        let (climbed, remaining, data) = try_climb(0.5);
        assert!(!climbed);
        assert_eq!(remaining, Vec3::new(0.5, 0.0, 0.0));
        assert!(data.forced_ground.is_none());
    }

    fn snap(was_grounded: bool) -> (Vec3, bool) {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(0.0, -0.5, 0.0), Vec3::new(50.0, 0.5, 50.0));
        let body = world.spawn(());
        let shape = body_shape();
        let exclude = [body];
        let mover = Mover {
            entity: body,
            shape: &shape,
            rotation: Quat::IDENTITY,
            mask: u32::MAX,
            exclude: &exclude,
        };
        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);
        let mut resolver = CollisionResolver::new();
        let frame = FrameVelocity {
            movement: Vec3::new(0.1, 0.0, 0.0),
            dt: 1.0,
            ..Default::default()
        };
        let mut legged = LeggedStrategy::new(LeggedConfig::default());
        let end = resolver.perform_collisions(
            &mut query,
            &mover,
            &settings(was_grounded),
            Vec3::new(0.0, 0.2, 0.0),
            &mut Velocity::default(),
            &frame,
            &mut legged,
        );
        (end, resolver.data().is_grounded)
    }

    #[test]
    fn test_snaps_down_after_grounded_tick() {
        let (end, grounded) = snap(true);
        assert!((end.y - 0.01).abs() < 2e-3, "{end}");
        assert!((end.x - 0.1).abs() < 1e-5);
        assert!(grounded);
    }

    #[test]
    fn test_no_snap_while_airborne() {
        let (end, grounded) = snap(false);
        assert!((end.y - 0.2).abs() < 1e-6);
        assert!(!grounded);
    }
}
