//! Transform components for ECS entities.

use glam::{Mat4, Quat, Vec3};

/// Local-space pose of an entity. Movable bodies write their resolved
/// position and rotation here every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Create a transform from a position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Convert to a 4x4 matrix (translation * rotation * scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// World-space transform matrix, refreshed from [`Transform`] by
/// [`transform_system`](crate::ecs::systems::transform_system) and written
/// directly whenever a movable body commits a new pose.
#[derive(Debug, Clone, Copy)]
pub struct GlobalTransform(pub Mat4);

impl GlobalTransform {
    /// World-space origin of the transform.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    /// The same transform shifted by a local-space offset (collider offsets).
    #[inline]
    pub fn with_local_offset(&self, offset: Vec3) -> Self {
        if offset == Vec3::ZERO {
            *self
        } else {
            Self(self.0 * Mat4::from_translation(offset))
        }
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Reference to a parent entity.
pub struct Parent(pub hecs::Entity);

/// List of child entities.
pub struct Children(pub Vec<hecs::Entity>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_pose_matrix() {
        let t = Transform::from_position_rotation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let m = t.to_matrix();
        let eps = 1e-5;
        assert!((m.transform_point3(Vec3::ZERO) - t.position).length() < eps);
        // Local -Z faces world -X after a quarter turn about Y.
        assert!((m.transform_vector3(Vec3::NEG_Z) - Vec3::NEG_X).length() < eps);
    }

    #[test]
    fn test_global_offset() {
        let global = GlobalTransform(Mat4::from_rotation_translation(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 1.0, 0.0),
        ));
        let shifted = global.with_local_offset(Vec3::new(1.0, 0.0, 0.0));
        let eps = 1e-5;
        // Local +X maps to world +Y under a quarter turn about Z.
        assert!((shifted.translation() - Vec3::new(0.0, 2.0, 0.0)).length() < eps);
        assert_eq!(global.with_local_offset(Vec3::ZERO).0, global.0);
    }
}
