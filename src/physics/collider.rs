//! Support mappings and bounding volumes for collider shapes.

use glam::{Mat3, Mat4, Vec3};

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::GlobalTransform;

/// Axis-aligned bounding box used to filter query candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Smallest box enclosing both boxes.
    #[inline]
    pub fn union(&self, other: &PhysicsAabb) -> PhysicsAabb {
        PhysicsAabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box by `margin` on every side.
    #[inline]
    pub fn expanded(&self, margin: f32) -> PhysicsAabb {
        PhysicsAabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Box covering this one translated anywhere along `translation`.
    #[inline]
    pub fn swept(&self, translation: Vec3) -> PhysicsAabb {
        PhysicsAabb {
            min: self.min + translation.min(Vec3::ZERO),
            max: self.max + translation.max(Vec3::ZERO),
        }
    }

    /// Box spanning a segment.
    #[inline]
    pub fn from_segment(start: Vec3, end: Vec3) -> PhysicsAabb {
        PhysicsAabb {
            min: start.min(end),
            max: start.max(end),
        }
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

impl ColliderShape {
    /// Farthest point of the shape, in its local frame, along a local direction.
    pub fn local_support(&self, dir: Vec3) -> Vec3 {
        match self {
            ColliderShape::Sphere { radius } => dir.normalize_or_zero() * *radius,
            ColliderShape::Box { half_extents } => Vec3::select(
                dir.cmpge(Vec3::ZERO),
                *half_extents,
                -*half_extents,
            ),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let tip = if dir.y >= 0.0 { *half_height } else { -*half_height };
                Vec3::new(0.0, tip, 0.0) + dir.normalize_or_zero() * *radius
            }
            ColliderShape::Cylinder {
                radius,
                half_height,
            } => {
                let y = if dir.y >= 0.0 { *half_height } else { -*half_height };
                let rim = Vec3::new(dir.x, 0.0, dir.z).normalize_or_zero() * *radius;
                Vec3::new(rim.x, y, rim.z)
            }
            ColliderShape::ConvexHull { points } => points
                .iter()
                .copied()
                .max_by(|a, b| a.dot(dir).total_cmp(&b.dot(dir)))
                .unwrap_or(Vec3::ZERO),
        }
    }

    /// GJK support function. Returns the farthest world-space point in the
    /// given world-space direction.
    #[inline]
    pub fn support(&self, direction: Vec3, transform: &GlobalTransform) -> Vec3 {
        // s_{M·S}(d) = M · s_S(Mᵀ·d) for the linear part M.
        let local_dir = Mat3::from_mat4(transform.0).transpose() * direction;
        transform.0.transform_point3(self.local_support(local_dir))
    }

    /// Compute the world-space AABB for this shape.
    pub fn compute_aabb(&self, transform: &GlobalTransform) -> PhysicsAabb {
        let mat = transform.0;
        match self {
            ColliderShape::Sphere { radius } => {
                let center = mat.transform_point3(Vec3::ZERO);
                let max_scale = Mat3::from_mat4(mat)
                    .to_cols_array_2d()
                    .iter()
                    .map(|col| Vec3::from_array(*col).length())
                    .fold(0.0f32, f32::max);
                let reach = Vec3::splat(*radius * max_scale);
                PhysicsAabb {
                    min: center - reach,
                    max: center + reach,
                }
            }
            ColliderShape::Box { half_extents } => aabb_from_extents(*half_extents, mat),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => aabb_from_extents(Vec3::new(*radius, *half_height + *radius, *radius), mat),
            ColliderShape::Cylinder {
                radius,
                half_height,
            } => aabb_from_extents(Vec3::new(*radius, *half_height, *radius), mat),
            ColliderShape::ConvexHull { points } => {
                let mut iter = points.iter().map(|p| mat.transform_point3(*p));
                let Some(first) = iter.next() else {
                    let center = mat.transform_point3(Vec3::ZERO);
                    return PhysicsAabb {
                        min: center,
                        max: center,
                    };
                };
                iter.fold(PhysicsAabb { min: first, max: first }, |aabb, p| PhysicsAabb {
                    min: aabb.min.min(p),
                    max: aabb.max.max(p),
                })
            }
        }
    }
}

/// World-space AABB of a local box under an affine transform.
#[inline]
fn aabb_from_extents(half_extents: Vec3, mat: Mat4) -> PhysicsAabb {
    let center = mat.transform_point3(Vec3::ZERO);
    let extent = mat.x_axis.truncate().abs() * half_extents.x
        + mat.y_axis.truncate().abs() * half_extents.y
        + mat.z_axis.truncate().abs() * half_extents.z;

    PhysicsAabb {
        min: center - extent,
        max: center + extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_sphere_aabb() {
        let shape = ColliderShape::Sphere { radius: 1.0 };
        let transform = GlobalTransform(Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
        let aabb = shape.compute_aabb(&transform);

        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-1.0, 4.0, -1.0)).length() < eps);
        assert!((aabb.max - Vec3::new(1.0, 6.0, 1.0)).length() < eps);
    }

    #[test]
    fn test_rotated_box_aabb() {
        let shape = ColliderShape::Box {
            half_extents: Vec3::new(2.0, 1.0, 1.0),
        };
        let transform = GlobalTransform(Mat4::from_quat(Quat::from_rotation_z(
            std::f32::consts::FRAC_PI_2,
        )));
        let aabb = shape.compute_aabb(&transform);

        let eps = 1e-5;
        assert!((aabb.max - Vec3::new(1.0, 2.0, 1.0)).length() < eps, "{:?}", aabb);
    }

    #[test]
    fn test_capsule_aabb_includes_caps() {
        let shape = ColliderShape::Capsule {
            radius: 0.5,
            half_height: 1.0,
        };
        let aabb = shape.compute_aabb(&GlobalTransform::default());
        assert_eq!(aabb.max, Vec3::new(0.5, 1.5, 0.5));
    }

    #[test]
    fn test_aabb_overlap_and_sweep() {
        let a = PhysicsAabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        let far = PhysicsAabb {
            min: Vec3::new(4.0, -1.0, -1.0),
            max: Vec3::new(5.0, 1.0, 1.0),
        };
        assert!(!a.overlaps(&far));
        assert!(a.swept(Vec3::new(3.5, 0.0, 0.0)).overlaps(&far));
        assert!(a.swept(Vec3::new(3.5, 0.0, 0.0)).min.x == -1.0);
        assert!(a.expanded(0.5).union(&far).max.x == 5.0);
    }

    #[test]
    fn test_capsule_support() {
        let shape = ColliderShape::Capsule {
            radius: 0.5,
            half_height: 1.0,
        };
        let transform = GlobalTransform(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let bottom = shape.support(Vec3::NEG_Y, &transform);
        let eps = 1e-5;
        assert!((bottom - Vec3::new(0.0, 0.5, 0.0)).length() < eps);
    }

    #[test]
    fn test_scaled_box_support() {
        let shape = ColliderShape::Box {
            half_extents: Vec3::ONE,
        };
        let transform = GlobalTransform(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        let support = shape.support(Vec3::new(1.0, 0.1, 0.0), &transform);
        let eps = 1e-5;
        assert!((support - Vec3::new(2.0, 1.0, 1.0)).length() < eps);
    }
}
