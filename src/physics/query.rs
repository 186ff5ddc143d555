//! World-level spatial queries: rays, shape sweeps, overlaps and contacts.

use glam::Vec3;
use hecs::Entity;
use tracing::trace;

use crate::ecs::components::physics::{Collider, ColliderShape, NonGround};
use crate::ecs::components::transform::GlobalTransform;

use super::broadphase::AabbBroadphase;
use super::collider::PhysicsAabb;
use super::contact::{ContactInfo, RayHit, ShapeHit};
use super::narrowphase::{detect_collision, intersects, ray_cast, shape_cast};
use super::QueryFilter;

/// Spatial queries against every collider in a world.
///
/// Borrows the world immutably and a caller-owned candidate buffer, so a
/// query issues no allocation once the buffer has grown.
pub struct SpatialQuery<'w, 's> {
    world: &'w hecs::World,
    broadphase: AabbBroadphase,
    candidates: &'s mut Vec<Entity>,
}

impl<'w, 's> SpatialQuery<'w, 's> {
    pub fn new(world: &'w hecs::World, candidates: &'s mut Vec<Entity>) -> Self {
        Self {
            world,
            broadphase: AabbBroadphase::new(),
            candidates,
        }
    }

    pub fn world(&self) -> &'w hecs::World {
        self.world
    }

    /// Closest ray hit. `direction` need not be normalized.
    pub fn cast_ray(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter<'_>,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }

        let volume = PhysicsAabb::from_segment(origin, origin + direction * max_distance);
        self.broadphase
            .find_candidates(self.world, &volume, filter, self.candidates);

        let mut best: Option<RayHit> = None;
        for &entity in self.candidates.iter() {
            let Some(pose) = collider_pose(self.world, entity) else {
                continue;
            };
            let Some(hit) =
                ray_cast(origin, direction, max_distance, &pose.collider.shape, &pose.transform)
            else {
                continue;
            };
            let distance = hit.fraction * max_distance;
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(RayHit {
                    entity,
                    distance,
                    point: origin + direction * distance,
                    normal: hit.normal,
                    non_ground: pose.non_ground,
                });
            }
        }
        best
    }

    /// Every hit of `shape` swept from `transform` along `direction` for
    /// `max_distance`, closest first. Distances are raw (not deflated).
    pub fn cast_shape(
        &mut self,
        shape: &ColliderShape,
        transform: &GlobalTransform,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter<'_>,
        out: &mut Vec<ShapeHit>,
    ) {
        out.clear();
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return;
        }

        let translation = direction * max_distance;
        let volume = shape.compute_aabb(transform).swept(translation);
        self.broadphase
            .find_candidates(self.world, &volume, filter, self.candidates);

        for &entity in self.candidates.iter() {
            let Some(pose) = collider_pose(self.world, entity) else {
                continue;
            };
            let other = &pose.collider;
            if let Some(hit) = shape_cast(shape, transform, translation, &other.shape, &pose.transform)
            {
                out.push(ShapeHit {
                    entity,
                    distance: hit.fraction * max_distance,
                    point: hit.point,
                    normal: hit.normal,
                    non_ground: pose.non_ground,
                    is_sensor: other.is_sensor,
                    overlapping: hit.fraction <= 0.0,
                });
            }
        }
        out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        trace!(hits = out.len(), max_distance, "shape cast");
    }

    /// Entities whose colliders intersect `shape`.
    pub fn overlap(
        &mut self,
        shape: &ColliderShape,
        transform: &GlobalTransform,
        filter: &QueryFilter<'_>,
        out: &mut Vec<Entity>,
    ) {
        out.clear();
        let volume = shape.compute_aabb(transform);
        self.broadphase
            .find_candidates(self.world, &volume, filter, self.candidates);

        for &entity in self.candidates.iter() {
            if let Some(pose) = collider_pose(self.world, entity) {
                if intersects(shape, transform, &pose.collider.shape, &pose.transform) {
                    out.push(entity);
                }
            }
        }
    }

    /// Penetration of `shape` into every intersecting collider. Each contact
    /// normal points from `shape` into the other collider.
    pub fn contacts(
        &mut self,
        shape: &ColliderShape,
        transform: &GlobalTransform,
        filter: &QueryFilter<'_>,
        out: &mut Vec<(Entity, ContactInfo)>,
    ) {
        out.clear();
        let volume = shape.compute_aabb(transform);
        self.broadphase
            .find_candidates(self.world, &volume, filter, self.candidates);

        for &entity in self.candidates.iter() {
            if let Some(pose) = collider_pose(self.world, entity) {
                if let Some(contact) =
                    detect_collision(shape, transform, &pose.collider.shape, &pose.transform)
                {
                    out.push((entity, contact));
                }
            }
        }
    }
}

/// A candidate's collider, borrowed in place, with its offset-adjusted world
/// transform.
struct ColliderPose<'w> {
    collider: hecs::Ref<'w, Collider>,
    transform: GlobalTransform,
    non_ground: bool,
}

fn collider_pose(world: &hecs::World, entity: Entity) -> Option<ColliderPose<'_>> {
    let collider = world.get::<&Collider>(entity).ok()?;
    let transform = world
        .get::<&GlobalTransform>(entity)
        .ok()?
        .with_local_offset(collider.offset);
    let non_ground = world.satisfies::<&NonGround>(entity).unwrap_or(false);
    Some(ColliderPose {
        collider,
        transform,
        non_ground,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::RigidBody;
    use crate::ecs::components::transform::Transform;
    use crate::physics::TriggerPolicy;
    use glam::Mat4;

    fn spawn(world: &mut hecs::World, pos: Vec3, collider: Collider) -> Entity {
        world.spawn((
            Transform::from_position(pos),
            GlobalTransform(Mat4::from_translation(pos)),
            RigidBody::new_static(),
            collider,
        ))
    }

    fn floor_world() -> (hecs::World, Entity) {
        let mut world = hecs::World::new();
        let floor = spawn(
            &mut world,
            Vec3::new(0.0, -0.5, 0.0),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::new(50.0, 0.5, 50.0),
            }),
        );
        (world, floor)
    }

    #[test]
    fn test_cast_ray_closest() {
        let (mut world, floor) = floor_world();
        let roof = spawn(
            &mut world,
            Vec3::new(0.0, 3.0, 0.0),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::new(5.0, 0.25, 5.0),
            }),
        );
        world.insert_one(roof, NonGround).unwrap();

        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);

        let down = query
            .cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 5.0, &QueryFilter::default())
            .unwrap();
        assert_eq!(down.entity, floor);
        assert!((down.distance - 1.0).abs() < 1e-3);
        assert!(!down.non_ground);

        let up = query
            .cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::Y, 5.0, &QueryFilter::default())
            .unwrap();
        assert_eq!(up.entity, roof);
        assert!((up.distance - 1.75).abs() < 1e-3);
        assert!(up.non_ground);
    }

    #[test]
    fn test_cast_shape_sorted_hits() {
        let mut world = hecs::World::new();
        let wall_shape = ColliderShape::Box {
            half_extents: Vec3::new(0.5, 2.0, 2.0),
        };
        let far = spawn(&mut world, Vec3::new(6.0, 0.0, 0.0), Collider::new(wall_shape.clone()));
        let near = spawn(&mut world, Vec3::new(3.0, 0.0, 0.0), Collider::new(wall_shape));

        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);
        let mut hits = Vec::new();
        query.cast_shape(
            &ColliderShape::Sphere { radius: 0.5 },
            &GlobalTransform::default(),
            Vec3::X,
            10.0,
            &QueryFilter::default(),
            &mut hits,
        );

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entity, near);
        assert_eq!(hits[1].entity, far);
        assert!((hits[0].distance - 2.0).abs() < 1e-3, "{}", hits[0].distance);
        assert!(hits[0].normal.dot(Vec3::NEG_X) > 0.99);
        assert!(!hits[0].overlapping);

        // Starting inside the near wall.
        query.cast_shape(
            &ColliderShape::Sphere { radius: 0.5 },
            &GlobalTransform(Mat4::from_translation(Vec3::new(2.8, 0.0, 0.0))),
            Vec3::X,
            1.0,
            &QueryFilter::default(),
            &mut hits,
        );
        assert_eq!(hits[0].entity, near);
        assert!(hits[0].overlapping);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_overlap_triggers() {
        let mut world = hecs::World::new();
        let zone = spawn(
            &mut world,
            Vec3::new(0.5, 0.0, 0.0),
            Collider::sensor(ColliderShape::Box {
                half_extents: Vec3::ONE,
            }),
        );
        spawn(
            &mut world,
            Vec3::new(0.0, 0.0, 0.0),
            Collider::new(ColliderShape::Sphere { radius: 0.2 }),
        );

        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);
        let mut out = Vec::new();
        query.overlap(
            &ColliderShape::Sphere { radius: 0.5 },
            &GlobalTransform::default(),
            &QueryFilter::new(u32::MAX, TriggerPolicy::Only),
            &mut out,
        );
        assert_eq!(out, vec![zone]);
    }

    #[test]
    fn test_contacts_report_depth() {
        let (world, floor) = floor_world();
        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);
        let mut out = Vec::new();
        query.contacts(
            &ColliderShape::Box {
                half_extents: Vec3::splat(0.5),
            },
            &GlobalTransform(Mat4::from_translation(Vec3::new(0.0, 0.3, 0.0))),
            &QueryFilter::default(),
            &mut out,
        );

        assert_eq!(out.len(), 1);
        let (entity, contact) = out[0];
        assert_eq!(entity, floor);
        assert!((contact.penetration - 0.2).abs() < 1e-3);
        assert!(contact.normal.dot(Vec3::NEG_Y) > 0.99);
    }
}
