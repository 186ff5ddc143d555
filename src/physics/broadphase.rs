//! Broadphase: AABB filtering of query volumes against every collider.

use hecs::Entity;

use crate::ecs::components::physics::Collider;
use crate::ecs::components::transform::GlobalTransform;

use super::collider::PhysicsAabb;
use super::QueryFilter;

/// Brute-force AABB broadphase (O(n) per query). Sufficient for the scene
/// sizes a handful of movable bodies sweep against.
#[derive(Debug, Default, Clone, Copy)]
pub struct AabbBroadphase;

impl AabbBroadphase {
    pub fn new() -> Self {
        Self
    }

    /// Collect every entity accepted by `filter` whose world AABB overlaps
    /// `volume`. `out` is cleared first.
    pub fn find_candidates(
        &self,
        world: &hecs::World,
        volume: &PhysicsAabb,
        filter: &QueryFilter<'_>,
        out: &mut Vec<Entity>,
    ) {
        out.clear();
        for (entity, (collider, transform)) in
            world.query::<(&Collider, &GlobalTransform)>().iter()
        {
            if !filter.accepts(entity, collider) {
                continue;
            }
            let aabb = collider
                .shape
                .compute_aabb(&transform.with_local_offset(collider.offset));
            if aabb.overlaps(volume) {
                out.push(entity);
            }
        }
        // Deterministic order regardless of archetype layout.
        out.sort_unstable_by_key(|e| e.to_bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{ColliderShape, RigidBody};
    use crate::ecs::components::transform::Transform;
    use crate::physics::TriggerPolicy;
    use glam::{Mat4, Vec3};

    fn spawn_sphere(world: &mut hecs::World, pos: Vec3, collider: Collider) -> Entity {
        world.spawn((
            Transform::from_position(pos),
            GlobalTransform(Mat4::from_translation(pos)),
            RigidBody::new_static(),
            collider,
        ))
    }

    #[test]
    fn test_candidates_overlapping_volume() {
        let mut world = hecs::World::new();
        let near = spawn_sphere(
            &mut world,
            Vec3::new(1.0, 0.0, 0.0),
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        );
        spawn_sphere(
            &mut world,
            Vec3::new(10.0, 0.0, 0.0),
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
        );

        let volume = PhysicsAabb {
            min: Vec3::splat(-0.5),
            max: Vec3::splat(0.5),
        };
        let mut out = Vec::new();
        AabbBroadphase::new().find_candidates(&world, &volume, &QueryFilter::default(), &mut out);
        assert_eq!(out, vec![near]);
    }

    #[test]
    fn test_candidates_respect_filter() {
        let mut world = hecs::World::new();
        let shape = ColliderShape::Sphere { radius: 1.0 };
        let solid = spawn_sphere(&mut world, Vec3::ZERO, Collider::new(shape.clone()));
        let trigger = spawn_sphere(&mut world, Vec3::ZERO, Collider::sensor(shape.clone()));
        spawn_sphere(&mut world, Vec3::ZERO, Collider::new(shape).with_layers(0b10));

        let volume = PhysicsAabb {
            min: Vec3::splat(-0.1),
            max: Vec3::splat(0.1),
        };
        let broadphase = AabbBroadphase::new();
        let mut out = Vec::new();

        let solids_on_layer_one = QueryFilter::new(0b01, TriggerPolicy::Ignore);
        broadphase.find_candidates(&world, &volume, &solids_on_layer_one, &mut out);
        assert_eq!(out, vec![solid]);

        let triggers_only = QueryFilter::new(0b01, TriggerPolicy::Only);
        broadphase.find_candidates(&world, &volume, &triggers_only, &mut out);
        assert_eq!(out, vec![trigger]);

        let excluded = [solid];
        let without_solid =
            QueryFilter::new(0b01, TriggerPolicy::Collide).excluding(&excluded);
        broadphase.find_candidates(&world, &volume, &without_solid, &mut out);
        assert_eq!(out, vec![trigger]);
    }
}
