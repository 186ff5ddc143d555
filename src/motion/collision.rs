//! Recursive sweep-and-slide resolution and ground classification.

use glam::{Quat, Vec3};
use hecs::Entity;
use tracing::{debug, trace};

use crate::physics::{
    QueryFilter, ShapeAdapter, ShapeHit, SpatialQuery, TriggerPolicy, CONTACT_OFFSET,
    GROUND_PROBE_DISTANCE, SIMULTANEOUS_EPSILON,
};

use super::velocity::{FrameVelocity, Velocity};

/// Remaining displacement below this length ends the slide loop.
pub const MIN_MOVE: f32 = 1e-6;
const GROUND_ANGLE_TOLERANCE: f32 = 1e-5;

/// A surface touched during resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionHit {
    pub entity: Entity,
    pub point: Vec3,
    /// Unit normal pointing back at the body.
    pub normal: Vec3,
    /// Distance travelled along the sweep before the hit (deflated).
    pub distance: f32,
    pub non_ground: bool,
}

impl From<&ShapeHit> for CollisionHit {
    fn from(hit: &ShapeHit) -> Self {
        Self {
            entity: hit.entity,
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
            non_ground: hit.non_ground,
        }
    }
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct CollisionData {
    /// Dynamic displacement requested this tick.
    pub original_velocity: Vec3,
    /// Displacement left unapplied when the loop ended.
    pub dynamic_velocity: Vec3,
    /// Total displacement actually applied.
    pub applied_velocity: Vec3,
    pub hits: Vec<CollisionHit>,
    pub is_grounded: bool,
    pub ground_normal: Vec3,
    /// Sweep iterations spent.
    pub steps: u32,
    /// The loop stopped because the body started a sweep inside a collider.
    pub stuck: bool,
    /// Ground normal forced by a strategy (step climbing, snapping).
    pub forced_ground: Option<Vec3>,
}

impl CollisionData {
    fn reset(&mut self, original: Vec3) {
        self.original_velocity = original;
        self.dynamic_velocity = original;
        self.applied_velocity = Vec3::ZERO;
        self.hits.clear();
        self.is_grounded = false;
        self.ground_normal = Vec3::ZERO;
        self.steps = 0;
        self.stuck = false;
        self.forced_ground = None;
    }
}

/// The moving body as the resolver sees it.
#[derive(Debug, Clone, Copy)]
pub struct Mover<'a> {
    pub entity: Entity,
    pub shape: &'a ShapeAdapter,
    pub rotation: Quat,
    pub mask: u32,
    /// The body's own entity plus any entities it should pass through.
    pub exclude: &'a [Entity],
}

impl Mover<'_> {
    pub fn filter(&self) -> QueryFilter<'_> {
        QueryFilter::new(self.mask, TriggerPolicy::Ignore).excluding(self.exclude)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveSettings {
    pub recursion_budget: u32,
    /// Unit gravity direction.
    pub gravity_direction: Vec3,
    pub max_ground_angle: f32,
    /// Ground state at the end of the previous tick.
    pub was_grounded: bool,
}

impl ResolveSettings {
    pub fn anti_gravity(&self) -> Vec3 {
        -self.gravity_direction
    }

    /// Whether a surface with `normal` is within the ground angle.
    pub fn is_ground(&self, normal: Vec3, non_ground: bool) -> bool {
        !non_ground
            && normal.dot(self.anti_gravity())
                >= self.max_ground_angle.cos() - GROUND_ANGLE_TOLERANCE
    }
}

/// What a [`ResolveStrategy`] can query while the resolver runs.
pub struct ResolveContext<'a, 'w, 's> {
    pub query: &'a mut SpatialQuery<'w, 's>,
    pub mover: &'a Mover<'a>,
    pub settings: &'a ResolveSettings,
}

/// Hooks into the slide loop. The defaults leave obstacles as plain blockers.
pub trait ResolveStrategy {
    /// A non-ground obstacle was hit at `position`. `remaining` is the
    /// displacement still to travel; a strategy may reshape it (e.g. add a
    /// climb) and return true.
    fn on_obstacle(
        &mut self,
        _ctx: &mut ResolveContext<'_, '_, '_>,
        _data: &mut CollisionData,
        _position: Vec3,
        _hit: &ShapeHit,
        _remaining: &mut Vec3,
    ) -> bool {
        false
    }

    /// The loop ended without getting stuck. May move the body (snapping).
    fn on_terminal(
        &mut self,
        _ctx: &mut ResolveContext<'_, '_, '_>,
        _data: &mut CollisionData,
        _position: &mut Vec3,
    ) {
    }
}

/// Plain sweep-and-slide.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStrategy;

impl ResolveStrategy for StandardStrategy {}

/// Slide `velocity` along the contact planes: along a single plane when that
/// clears the others, else along the crease of two planes, else stop.
pub fn deflect(velocity: Vec3, normals: &[Vec3]) -> Vec3 {
    let clears = |v: Vec3| normals.iter().all(|n| v.dot(*n) >= -MIN_MOVE);
    if clears(velocity) {
        return velocity;
    }
    for n in normals {
        let v = velocity - *n * velocity.dot(*n).min(0.0);
        if clears(v) {
            return v;
        }
    }
    for (i, a) in normals.iter().enumerate() {
        for b in &normals[i + 1..] {
            let crease = a.cross(*b).normalize_or_zero();
            let v = crease * crease.dot(velocity);
            if clears(v) {
                return v;
            }
        }
    }
    Vec3::ZERO
}

/// Runs one body's collision pass, reusing its buffers between ticks.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    data: CollisionData,
    hits: Vec<ShapeHit>,
    planes: Vec<Vec3>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &CollisionData {
        &self.data
    }

    /// Resolve `frame` from `start`, returning the final position.
    ///
    /// Applies the instant displacement with a single sweep, then slides the
    /// dynamic displacement for up to `recursion_budget` iterations. Clears
    /// the per-tick velocity, strips force driving into touched surfaces and
    /// classifies ground.
    #[allow(clippy::too_many_arguments)]
    pub fn perform_collisions(
        &mut self,
        query: &mut SpatialQuery<'_, '_>,
        mover: &Mover<'_>,
        settings: &ResolveSettings,
        start: Vec3,
        velocity: &mut Velocity,
        frame: &FrameVelocity,
        strategy: &mut dyn ResolveStrategy,
    ) -> Vec3 {
        let Self { data, hits, planes } = self;
        data.reset(frame.dynamic_displacement());
        let filter = mover.filter();
        let mut position = start;

        let instant = frame.instant_displacement();
        let instant_len = instant.length();
        if instant_len > MIN_MOVE {
            let dir = instant / instant_len;
            mover
                .shape
                .sweep_all(query, position, mover.rotation, dir, instant_len, &filter, hits);
            match hits.first().map(|h| h.distance) {
                None => position += instant,
                Some(closest) => {
                    position += dir * closest;
                    record_simultaneous(data, hits, closest);
                }
            }
        }

        let mut ctx = ResolveContext {
            query,
            mover,
            settings,
        };
        let mut remaining = data.dynamic_velocity;
        let mut budget = settings.recursion_budget;
        loop {
            let distance = remaining.length();
            if distance <= MIN_MOVE || budget == 0 {
                strategy.on_terminal(&mut ctx, data, &mut position);
                break;
            }
            let dir = remaining / distance;
            mover.shape.sweep_all(
                ctx.query,
                position,
                mover.rotation,
                dir,
                distance,
                &filter,
                hits,
            );
            let Some(first) = hits.first() else {
                position += remaining;
                remaining = Vec3::ZERO;
                strategy.on_terminal(&mut ctx, data, &mut position);
                break;
            };
            let closest = first.distance;
            if first.overlapping {
                record_simultaneous(data, hits, closest);
                data.stuck = true;
                trace!(entity = ?mover.entity, "stuck inside a collider");
                break;
            }

            position += dir * closest;
            remaining = dir * (distance - closest);
            planes.clear();
            for hit in hits
                .iter()
                .take_while(|h| h.distance - closest <= SIMULTANEOUS_EPSILON)
            {
                data.hits.push(hit.into());
                let handled = !settings.is_ground(hit.normal, hit.non_ground)
                    && strategy.on_obstacle(&mut ctx, data, position, hit, &mut remaining);
                if !handled || hit.normal.dot(remaining) < 0.0 {
                    planes.push(hit.normal);
                }
            }
            remaining = deflect(remaining, planes);
            budget -= 1;
            data.steps += 1;
        }

        data.dynamic_velocity = remaining;
        data.applied_velocity = position - start;

        velocity.clear_frame();
        for hit in &data.hits {
            let into = velocity.force.dot(hit.normal);
            if into < 0.0 {
                velocity.force -= hit.normal * into;
            }
        }

        classify_ground(data, hits, &mut ctx, position);
        debug!(
            entity = ?mover.entity,
            steps = data.steps,
            hits = data.hits.len(),
            grounded = data.is_grounded,
            "collisions resolved"
        );
        position
    }
}

fn record_simultaneous(data: &mut CollisionData, hits: &[ShapeHit], closest: f32) {
    data.hits.extend(
        hits.iter()
            .take_while(|h| h.distance - closest <= SIMULTANEOUS_EPSILON)
            .map(CollisionHit::from),
    );
}

/// Forced ground, then the most recent eligible hit, then a short ray and a
/// short sweep along gravity. The probes are skipped while moving upward.
fn classify_ground(
    data: &mut CollisionData,
    scratch: &mut Vec<ShapeHit>,
    ctx: &mut ResolveContext<'_, '_, '_>,
    position: Vec3,
) {
    let settings = ctx.settings;
    if let Some(normal) = data.forced_ground {
        data.is_grounded = true;
        data.ground_normal = normal;
        return;
    }
    if let Some(hit) = data
        .hits
        .iter()
        .rev()
        .find(|h| settings.is_ground(h.normal, h.non_ground))
    {
        data.is_grounded = true;
        data.ground_normal = hit.normal;
        return;
    }
    data.is_grounded = false;
    data.ground_normal = Vec3::ZERO;
    if data.original_velocity.dot(settings.anti_gravity()) > MIN_MOVE {
        return;
    }

    let mover = ctx.mover;
    let filter = mover.filter();
    let down = settings.gravity_direction;
    let bottom = mover.shape.extreme_point(position, mover.rotation, down);
    let origin = bottom - down * CONTACT_OFFSET;
    if let Some(ray) = ctx.query.cast_ray(
        origin,
        down,
        GROUND_PROBE_DISTANCE + CONTACT_OFFSET,
        &filter,
    ) {
        if settings.is_ground(ray.normal, ray.non_ground) {
            data.is_grounded = true;
            data.ground_normal = ray.normal;
            return;
        }
    }

    mover.shape.sweep_all(
        ctx.query,
        position,
        mover.rotation,
        down,
        GROUND_PROBE_DISTANCE,
        &filter,
        scratch,
    );
    if let Some(hit) = scratch
        .iter()
        .find(|h| settings.is_ground(h.normal, h.non_ground))
    {
        data.is_grounded = true;
        data.ground_normal = hit.normal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, ColliderShape, NonGround, RigidBody};
    use crate::ecs::components::transform::{GlobalTransform, Transform};
    use glam::Mat4;

    fn spawn_box(world: &mut hecs::World, center: Vec3, half_extents: Vec3) -> Entity {
        world.spawn((
            Transform::from_position(center),
            GlobalTransform(Mat4::from_translation(center)),
            RigidBody::new_static(),
            Collider::new(ColliderShape::Box { half_extents }),
        ))
    }

    fn floor(world: &mut hecs::World) -> Entity {
        spawn_box(world, Vec3::new(0.0, -0.5, 0.0), Vec3::new(50.0, 0.5, 50.0))
    }

    fn sphere() -> ShapeAdapter {
        ShapeAdapter::new(&ColliderShape::Sphere { radius: 0.5 }, Vec3::new(0.0, 0.5, 0.0))
            .unwrap()
    }

    fn settings(budget: u32) -> ResolveSettings {
        ResolveSettings {
            recursion_budget: budget,
            gravity_direction: Vec3::NEG_Y,
            max_ground_angle: 45f32.to_radians(),
            was_grounded: false,
        }
    }

    fn frame(displacement: Vec3) -> FrameVelocity {
        FrameVelocity {
            movement: displacement,
            dt: 1.0,
            ..Default::default()
        }
    }

    struct Harness {
        world: hecs::World,
        body: Entity,
        shape: ShapeAdapter,
        candidates: Vec<Entity>,
        resolver: CollisionResolver,
    }

    impl Harness {
        fn new(world: hecs::World) -> Self {
            let mut world = world;
            let body = world.spawn(());
            Self {
                world,
                body,
                shape: sphere(),
                candidates: Vec::new(),
                resolver: CollisionResolver::new(),
            }
        }

        fn resolve(
            &mut self,
            start: Vec3,
            velocity: &mut Velocity,
            frame: &FrameVelocity,
            settings: &ResolveSettings,
        ) -> Vec3 {
            let exclude = [self.body];
            let mover = Mover {
                entity: self.body,
                shape: &self.shape,
                rotation: Quat::IDENTITY,
                mask: u32::MAX,
                exclude: &exclude,
            };
            let mut query = SpatialQuery::new(&self.world, &mut self.candidates);
            self.resolver.perform_collisions(
                &mut query,
                &mover,
                settings,
                start,
                velocity,
                frame,
                &mut StandardStrategy,
            )
        }
    }

    #[test]
    fn test_deflect_removes_normal_component() {
        let n = Vec3::new(-1.0, 1.0, 0.0).normalize();
        let v = deflect(Vec3::new(2.0, -1.0, 0.5), &[n]);
        assert!(v.dot(n).abs() < 1e-6);
        assert!((v.z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_deflect_corner_slides_along_crease() {
        let a = Vec3::new(-1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.0, -1.0);
        let v = deflect(Vec3::new(1.0, 0.5, 1.0), &[a, b]);
        assert!(v.dot(a) >= -1e-6 && v.dot(b) >= -1e-6);
        assert!((v.y - 0.5).abs() < 1e-6, "{v}");
    }

    #[test]
    fn test_deflect_symmetric_wedge_stops() {
        let a = Vec3::new(-0.8, 0.0, -0.6);
        let b = Vec3::new(-0.8, 0.0, 0.6);
        assert_eq!(deflect(Vec3::new(1.0, 0.0, 0.0), &[a, b]), Vec3::ZERO);
        // Moving away from both planes is untouched.
        let away = Vec3::new(-1.0, 0.0, 0.0);
        assert_eq!(deflect(away, &[a, b]), away);
    }

    #[test]
    fn test_free_move_is_exact() {
        let mut harness = Harness::new(hecs::World::new());
        let start = Vec3::new(1.0, 5.0, -2.0);
        let mut velocity = Velocity::default();
        let end = harness.resolve(
            start,
            &mut velocity,
            &frame(Vec3::new(0.25, 0.0, -0.5)),
            &settings(3),
        );
        assert_eq!(end - start, Vec3::new(0.25, 0.0, -0.5));
        let data = harness.resolver.data();
        assert!(data.hits.is_empty());
        assert!(!data.is_grounded);
        assert_eq!(data.applied_velocity, Vec3::new(0.25, 0.0, -0.5));
    }

    #[test]
    fn test_wall_projects_velocity() {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(2.0, 5.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
        let mut harness = Harness::new(world);
        // Sphere center at x=0 (radius 0.5), wall face at x=1.5.
        let start = Vec3::new(0.0, 1.0, 0.0);
        let mut velocity = Velocity::default();
        let end = harness.resolve(
            start,
            &mut velocity,
            &frame(Vec3::new(2.0, 0.0, 1.0)),
            &settings(3),
        );
        assert!(end.x < 1.0, "{end}");
        assert!(end.x >= 1.0 - 2.0 * CONTACT_OFFSET, "{end}");
        assert!(end.z > 0.9, "slid along the wall: {end}");
        let data = harness.resolver.data();
        assert!(!data.hits.is_empty());
        assert!((data.hits[0].normal - Vec3::NEG_X).length() < 1e-3);
        assert!(data.dynamic_velocity.dot(Vec3::NEG_X).abs() < 1e-5);
        assert!(data.steps <= 3);
    }

    #[test]
    fn test_budget_bounds_iterations() {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(2.0, 5.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
        let mut harness = Harness::new(world);
        let start = Vec3::new(0.0, 1.0, 0.0);
        let mut velocity = Velocity::default();
        harness.resolve(
            start,
            &mut velocity,
            &frame(Vec3::new(2.0, 0.0, 1.0)),
            &settings(1),
        );
        let data = harness.resolver.data();
        assert_eq!(data.steps, 1);
        // Budget spent before the tangential remainder was travelled.
        assert!(data.dynamic_velocity.length() > 0.4);
    }

    #[test]
    fn test_touching_wall_still_slides() {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(2.0, 5.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
        let mut harness = Harness::new(world);
        // Closer to the wall than the contact offset, but not inside it.
        let start = Vec3::new(0.995, 1.0, 0.0);
        let mut velocity = Velocity::default();
        let end = harness.resolve(
            start,
            &mut velocity,
            &frame(Vec3::new(1.0, -0.5, 0.0)),
            &settings(3),
        );
        let data = harness.resolver.data();
        assert!(!data.stuck);
        assert_eq!(data.hits[0].distance, 0.0);
        assert!((data.hits[0].normal - Vec3::NEG_X).length() < 1e-3);
        assert!((end.x - start.x).abs() < 1e-4, "{end}");
        assert!((end.y - 0.5).abs() < 1e-3, "fell along the wall: {end}");
    }

    #[test]
    fn test_head_on_touch_does_not_move() {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(2.0, 5.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
        let mut harness = Harness::new(world);
        let start = Vec3::new(0.995, 1.0, 0.0);
        let mut velocity = Velocity::default();
        let end = harness.resolve(
            start,
            &mut velocity,
            &frame(Vec3::new(1.0, 0.0, 0.0)),
            &settings(3),
        );
        assert!((end - start).length() < 1e-4, "{end}");
        assert!(!harness.resolver.data().stuck);
    }

    #[test]
    fn test_overlap_at_start_is_stuck() {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(2.0, 5.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
        let mut harness = Harness::new(world);
        // Sphere surface at x=1.7, inside the wall.
        let start = Vec3::new(1.2, 1.0, 0.0);
        let mut velocity = Velocity::default();
        let end = harness.resolve(
            start,
            &mut velocity,
            &frame(Vec3::new(1.0, -0.5, 0.0)),
            &settings(3),
        );
        assert_eq!(end, start);
        let data = harness.resolver.data();
        assert!(data.stuck);
        assert_eq!(data.steps, 0);
        assert_eq!(data.hits.len(), 1);
    }

    #[test]
    fn test_simultaneous_contacts_share_one_step() {
        let mut world = hecs::World::new();
        for z in [-0.6, 0.6] {
            let center = Vec3::new(2.0, 0.5, z);
            world.spawn((
                Transform::from_position(center),
                GlobalTransform(Mat4::from_translation(center)),
                RigidBody::new_static(),
                Collider::new(ColliderShape::Sphere { radius: 0.5 }),
            ));
        }
        let mut harness = Harness::new(world);
        let mut velocity = Velocity::default();
        let end = harness.resolve(
            Vec3::ZERO,
            &mut velocity,
            &frame(Vec3::new(2.0, 0.0, 0.0)),
            &settings(3),
        );
        let data = harness.resolver.data();
        assert_eq!(data.steps, 1);
        assert_eq!(data.hits.len(), 2);
        let (a, b) = (data.hits[0].normal, data.hits[1].normal);
        assert!((a.z + b.z).abs() < 1e-4 && a.z.abs() > 0.5, "{a} {b}");
        for hit in &data.hits {
            assert!(data.dynamic_velocity.dot(hit.normal) >= -1e-5);
        }
        // Wedged between both: stops where the spheres touch.
        assert!((end - Vec3::new(1.2 - CONTACT_OFFSET, 0.0, 0.0)).length() < 1e-3, "{end}");
    }

    #[test]
    fn test_landing_grounds_and_strips_force() {
        let mut world = hecs::World::new();
        floor(&mut world);
        let mut harness = Harness::new(world);
        let start = Vec3::new(0.0, 0.5, 0.0);
        let mut velocity = Velocity {
            force: Vec3::new(1.0, -10.0, 0.0),
            ..Default::default()
        };
        let end = harness.resolve(
            start,
            &mut velocity,
            &frame(Vec3::new(0.0, -1.0, 0.0)),
            &settings(3),
        );
        assert!((end.y - CONTACT_OFFSET).abs() < 2e-3, "{end}");
        let data = harness.resolver.data();
        assert!(data.is_grounded);
        assert!((data.ground_normal - Vec3::Y).length() < 1e-3);
        assert!(velocity.force.y.abs() < 1e-3, "{}", velocity.force);
        assert!((velocity.force.x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_ground_is_idempotent_while_resting() {
        let mut world = hecs::World::new();
        floor(&mut world);
        let mut harness = Harness::new(world);
        let mut position = Vec3::new(0.0, CONTACT_OFFSET, 0.0);
        for _ in 0..3 {
            let mut velocity = Velocity::default();
            position = harness.resolve(
                position,
                &mut velocity,
                &FrameVelocity::default(),
                &settings(3),
            );
            let data = harness.resolver.data();
            assert!(data.is_grounded);
            assert!((data.ground_normal - Vec3::Y).length() < 1e-3);
        }
        assert_eq!(position, Vec3::new(0.0, CONTACT_OFFSET, 0.0));
    }

    #[test]
    fn test_upward_motion_skips_ground_probe() {
        let mut world = hecs::World::new();
        floor(&mut world);
        let mut harness = Harness::new(world);
        let mut velocity = Velocity::default();
        harness.resolve(
            Vec3::new(0.0, CONTACT_OFFSET, 0.0),
            &mut velocity,
            &frame(Vec3::new(0.0, 0.5, 0.0)),
            &settings(3),
        );
        assert!(!harness.resolver.data().is_grounded);
    }

    #[test]
    fn test_non_ground_surface_is_never_ground() {
        let mut world = hecs::World::new();
        let floor = floor(&mut world);
        world.insert_one(floor, NonGround).unwrap();
        let mut harness = Harness::new(world);
        let mut velocity = Velocity::default();
        harness.resolve(
            Vec3::new(0.0, 0.5, 0.0),
            &mut velocity,
            &frame(Vec3::new(0.0, -1.0, 0.0)),
            &settings(3),
        );
        let data = harness.resolver.data();
        assert!(!data.hits.is_empty());
        assert!(!data.is_grounded);
    }

    #[test]
    fn test_instant_displacement_uses_single_sweep() {
        let mut world = hecs::World::new();
        spawn_box(&mut world, Vec3::new(2.0, 5.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
        let mut harness = Harness::new(world);
        let start = Vec3::new(0.0, 1.0, 0.0);
        let mut velocity = Velocity::default();
        let instant = FrameVelocity {
            instant: Vec3::new(3.0, 0.0, 0.0),
            ..Default::default()
        };
        let end = harness.resolve(start, &mut velocity, &instant, &settings(3));
        assert!(end.x < 1.0 && end.x > 0.97, "{end}");
        assert_eq!(harness.resolver.data().steps, 0);
    }
}
