//! Uniform query interface over the shapes a movable body may use.

use glam::{Quat, Vec3};
use hecs::Entity;

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::GlobalTransform;
use crate::error::ShapeError;

use super::contact::{ContactInfo, RayHit, ShapeHit};
use super::query::SpatialQuery;
use super::{QueryFilter, CONTACT_OFFSET, MAX_OVERLAPS, MAX_SWEEP_HITS};

/// A box, capsule or sphere validated once at construction, exposing ray,
/// sweep and overlap queries from a body pose.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAdapter {
    shape: ColliderShape,
    offset: Vec3,
}

impl ShapeAdapter {
    /// Validate `shape` for use as a moving shape. Fails for anything other
    /// than a box, capsule or sphere with positive finite dimensions.
    pub fn new(shape: &ColliderShape, offset: Vec3) -> Result<Self, ShapeError> {
        let kind = shape.kind();
        let positive = |v: f32| v.is_finite() && v > 0.0;
        match shape {
            ColliderShape::Sphere { radius } if !positive(*radius) => {
                return Err(ShapeError::InvalidDimensions {
                    shape: kind,
                    reason: "radius must be positive and finite",
                });
            }
            ColliderShape::Box { half_extents }
                if !(positive(half_extents.x) && positive(half_extents.y) && positive(half_extents.z)) =>
            {
                return Err(ShapeError::InvalidDimensions {
                    shape: kind,
                    reason: "half extents must be positive and finite",
                });
            }
            ColliderShape::Capsule {
                radius,
                half_height,
            } if !positive(*radius) || !half_height.is_finite() || *half_height < 0.0 => {
                return Err(ShapeError::InvalidDimensions {
                    shape: kind,
                    reason: "capsule needs a positive radius and a non-negative half height along Y",
                });
            }
            ColliderShape::Sphere { .. } | ColliderShape::Box { .. } | ColliderShape::Capsule { .. } => {}
            ColliderShape::Cylinder { .. } | ColliderShape::ConvexHull { .. } => {
                return Err(ShapeError::Unsupported(kind));
            }
        }
        if !offset.is_finite() {
            return Err(ShapeError::InvalidDimensions {
                shape: kind,
                reason: "offset must be finite",
            });
        }

        Ok(Self {
            shape: shape.clone(),
            offset,
        })
    }

    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// World transform of the shape for a body at `position`/`rotation`.
    pub fn pose(&self, position: Vec3, rotation: Quat) -> GlobalTransform {
        GlobalTransform(glam::Mat4::from_rotation_translation(
            rotation,
            position + rotation * self.offset,
        ))
    }

    /// World-space half extents of the shape's bounding box.
    pub fn extents(&self, rotation: Quat) -> Vec3 {
        self.shape
            .compute_aabb(&self.pose(Vec3::ZERO, rotation))
            .half_extents()
    }

    /// Farthest point of the shape along `direction` (e.g. its bottom along gravity).
    pub fn extreme_point(&self, position: Vec3, rotation: Quat, direction: Vec3) -> Vec3 {
        self.shape.support(direction, &self.pose(position, rotation))
    }

    /// Ray cast from the shape's surface point facing `direction`.
    pub fn raycast(
        &self,
        query: &mut SpatialQuery<'_, '_>,
        position: Vec3,
        rotation: Quat,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter<'_>,
    ) -> Option<RayHit> {
        let origin = self.extreme_point(position, rotation, direction);
        query.cast_ray(origin, direction, max_distance, filter)
    }

    /// Sweep the shape and collect up to [`MAX_SWEEP_HITS`] hits, closest first.
    ///
    /// The cast reaches `max_distance + CONTACT_OFFSET`; every reported
    /// distance is then pulled back by `CONTACT_OFFSET` (and clamped at zero)
    /// so moving a hit's distance leaves the shape short of the surface.
    #[allow(clippy::too_many_arguments)]
    pub fn sweep_all(
        &self,
        query: &mut SpatialQuery<'_, '_>,
        position: Vec3,
        rotation: Quat,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter<'_>,
        out: &mut Vec<ShapeHit>,
    ) {
        let pose = self.pose(position, rotation);
        query.cast_shape(
            &self.shape,
            &pose,
            direction,
            max_distance + CONTACT_OFFSET,
            filter,
            out,
        );
        out.truncate(MAX_SWEEP_HITS);
        for hit in out.iter_mut() {
            hit.distance = (hit.distance - CONTACT_OFFSET).max(0.0);
        }
    }

    /// Entities overlapping the shape, at most [`MAX_OVERLAPS`].
    pub fn overlap(
        &self,
        query: &mut SpatialQuery<'_, '_>,
        position: Vec3,
        rotation: Quat,
        filter: &QueryFilter<'_>,
        out: &mut Vec<Entity>,
    ) {
        query.overlap(&self.shape, &self.pose(position, rotation), filter, out);
        out.truncate(MAX_OVERLAPS);
    }

    /// Penetrations into overlapping colliders, at most [`MAX_OVERLAPS`].
    pub fn penetrations(
        &self,
        query: &mut SpatialQuery<'_, '_>,
        position: Vec3,
        rotation: Quat,
        filter: &QueryFilter<'_>,
        out: &mut Vec<(Entity, ContactInfo)>,
    ) {
        query.contacts(&self.shape, &self.pose(position, rotation), filter, out);
        out.truncate(MAX_OVERLAPS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, RigidBody};
    use crate::ecs::components::transform::Transform;
    use glam::Mat4;

    fn capsule() -> ShapeAdapter {
        ShapeAdapter::new(
            &ColliderShape::Capsule {
                radius: 0.5,
                half_height: 0.5,
            },
            Vec3::new(0.0, 1.0, 0.0),
        )
        .unwrap()
    }

    fn floor_world() -> hecs::World {
        let mut world = hecs::World::new();
        world.spawn((
            Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
            GlobalTransform(Mat4::from_translation(Vec3::new(0.0, -0.5, 0.0))),
            RigidBody::new_static(),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::new(50.0, 0.5, 50.0),
            }),
        ));
        world
    }

    #[test]
    fn test_rejects_unsupported_shapes() {
        let cylinder = ColliderShape::Cylinder {
            radius: 1.0,
            half_height: 1.0,
        };
        assert_eq!(
            ShapeAdapter::new(&cylinder, Vec3::ZERO),
            Err(ShapeError::Unsupported("cylinder"))
        );
        let hull = ColliderShape::ConvexHull { points: vec![] };
        assert!(matches!(
            ShapeAdapter::new(&hull, Vec3::ZERO),
            Err(ShapeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_dimensions() {
        let bad_capsule = ColliderShape::Capsule {
            radius: 0.5,
            half_height: -1.0,
        };
        assert!(matches!(
            ShapeAdapter::new(&bad_capsule, Vec3::ZERO),
            Err(ShapeError::InvalidDimensions { shape: "capsule", .. })
        ));
        let flat_box = ColliderShape::Box {
            half_extents: Vec3::new(1.0, 0.0, 1.0),
        };
        assert!(ShapeAdapter::new(&flat_box, Vec3::ZERO).is_err());
        let nan_sphere = ColliderShape::Sphere { radius: f32::NAN };
        assert!(ShapeAdapter::new(&nan_sphere, Vec3::ZERO).is_err());
    }

    #[test]
    fn test_extents_and_bottom() {
        let shape = capsule();
        assert!((shape.extents(Quat::IDENTITY) - Vec3::new(0.5, 1.0, 0.5)).length() < 1e-5);
        let bottom = shape.extreme_point(Vec3::new(1.0, 2.0, 0.0), Quat::IDENTITY, Vec3::NEG_Y);
        assert!((bottom - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_sweep_distance_is_deflated() {
        let world = floor_world();
        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);
        let mut hits = Vec::new();

        // Feet at y = 1, sweeping 2 units down.
        capsule().sweep_all(
            &mut query,
            Vec3::new(0.0, 1.0, 0.0),
            Quat::IDENTITY,
            Vec3::NEG_Y,
            2.0,
            &QueryFilter::default(),
            &mut hits,
        );

        assert_eq!(hits.len(), 1);
        assert!(
            (hits[0].distance - (1.0 - CONTACT_OFFSET)).abs() < 1e-3,
            "distance {}",
            hits[0].distance
        );
    }

    #[test]
    fn test_sweep_reaches_into_contact_offset() {
        let world = floor_world();
        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);
        let mut hits = Vec::new();

        // Resting half an offset above the floor: the inflated sweep still
        // reports the floor, at distance zero.
        capsule().sweep_all(
            &mut query,
            Vec3::new(0.0, CONTACT_OFFSET * 0.5, 0.0),
            Quat::IDENTITY,
            Vec3::NEG_Y,
            0.001,
            &QueryFilter::default(),
            &mut hits,
        );

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_raycast_from_bottom() {
        let world = floor_world();
        let mut candidates = Vec::new();
        let mut query = SpatialQuery::new(&world, &mut candidates);

        let hit = capsule()
            .raycast(
                &mut query,
                Vec3::new(0.0, 0.5, 0.0),
                Quat::IDENTITY,
                Vec3::NEG_Y,
                1.0,
                &QueryFilter::default(),
            )
            .unwrap();
        assert!((hit.distance - 0.5).abs() < 1e-3);
    }
}
