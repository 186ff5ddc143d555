//! Collision components for ECS entities.

use glam::Vec3;

/// Membership bits matching every query mask.
pub const ALL_LAYERS: u32 = u32::MAX;

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Immovable level geometry.
    Static,
    /// Position driven by a movable body; never pushed by anything.
    Kinematic,
}

/// Rigid body component. Bodies here carry no mass or impulses: static
/// geometry is swept against, kinematic entities are moved by the motion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigidBody {
    pub body_type: RigidBodyType,
}

impl RigidBody {
    /// Create a new static rigid body.
    pub fn new_static() -> Self {
        Self {
            body_type: RigidBodyType::Static,
        }
    }

    /// Create a new kinematic rigid body.
    pub fn new_kinematic() -> Self {
        Self {
            body_type: RigidBodyType::Kinematic,
        }
    }

    pub fn is_static(&self) -> bool {
        self.body_type == RigidBodyType::Static
    }
}

/// Collider shape. Capsules and cylinders are aligned with local Y.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    Capsule { radius: f32, half_height: f32 },
    Cylinder { radius: f32, half_height: f32 },
    ConvexHull { points: Vec<Vec3> },
}

impl ColliderShape {
    /// Short lowercase name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ColliderShape::Sphere { .. } => "sphere",
            ColliderShape::Box { .. } => "box",
            ColliderShape::Capsule { .. } => "capsule",
            ColliderShape::Cylinder { .. } => "cylinder",
            ColliderShape::ConvexHull { .. } => "convex hull",
        }
    }
}

/// Collision geometry component.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the entity's transform origin.
    pub offset: Vec3,
    /// Sensors are triggers: they report overlaps but never block movement.
    pub is_sensor: bool,
    /// Layer membership bits tested against query masks.
    pub layers: u32,
}

impl Collider {
    /// Solid collider on every layer.
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            is_sensor: false,
            layers: ALL_LAYERS,
        }
    }

    /// Trigger collider on every layer.
    pub fn sensor(shape: ColliderShape) -> Self {
        Self {
            is_sensor: true,
            ..Self::new(shape)
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::new(ColliderShape::Sphere { radius: 0.5 })
    }
}

/// Surface that never counts as ground, whatever its slope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonGround;

/// Level-scoped trigger. A sensor carrying this marker is reported with
/// [`TriggerKind::Level`](crate::motion::TriggerKind) only; any other
/// trigger handling on the same shape is suppressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelTrigger;
