//! Contact and hit records produced by the narrowphase and spatial queries.

use glam::Vec3;

/// Penetration between two overlapping shapes.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Contact normal (from shape A to shape B).
    pub normal: Vec3,
    /// Penetration depth.
    pub penetration: f32,
    /// Contact point in world space.
    pub point: Vec3,
}

/// Time of impact of a shape translated toward another.
#[derive(Debug, Clone, Copy)]
pub struct CastHit {
    /// Fraction of the translation travelled before touching, in `[0, 1]`.
    /// Zero means the shapes already overlap.
    pub fraction: f32,
    /// Unit surface normal of the obstacle, pointing back at the moving shape.
    pub normal: Vec3,
    /// Approximate world-space contact point on the moving shape at impact.
    pub point: Vec3,
}

/// Ray query result against an entity.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub entity: hecs::Entity,
    /// Distance along the (normalized) ray direction.
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    /// The surface carries a `NonGround` marker.
    pub non_ground: bool,
}

/// Shape sweep result against an entity. `distance` is measured along the
/// normalized sweep direction; sweeps issued through a
/// [`ShapeAdapter`](super::shape::ShapeAdapter) report it deflated by the
/// contact offset and clamped at zero, so a zero distance may be a mere touch.
#[derive(Debug, Clone, Copy)]
pub struct ShapeHit {
    pub entity: hecs::Entity,
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub non_ground: bool,
    pub is_sensor: bool,
    /// The shapes already overlapped at the start of the sweep.
    pub overlapping: bool,
}
