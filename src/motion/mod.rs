//! Kinematic movement: velocity composition, sweep-and-slide resolution,
//! ground classification and the per-tick body pipeline.

pub mod body;
pub mod collision;
pub mod config;
pub mod controller;
pub mod legged;
pub mod triggers;
pub mod velocity;

use glam::Vec3;
use hecs::Entity;

use crate::world::BodyId;

pub use self::body::{MotionScratch, MovableBody};
pub use self::collision::{
    CollisionData, CollisionHit, CollisionResolver, Mover, ResolveContext, ResolveSettings,
    ResolveStrategy, StandardStrategy,
};
pub use self::config::{BodyConfig, CreatureConfig, Curve, LeggedConfig};
pub use self::controller::{
    CollisionController, ControllerSlot, Controllers, CreatureController, MaskController,
    TriggerController, UpdateController, VelocityController,
};
pub use self::legged::LeggedStrategy;
pub use self::triggers::{TriggerKind, TriggerTracker};
pub use self::velocity::{FrameVelocity, Space, Velocity, VelocityCoefficients};

/// Notifications a body raises during a tick, drained from the
/// [`MotionWorld`](crate::world::MotionWorld).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionEvent {
    TriggerEnter {
        body: BodyId,
        trigger: Entity,
        kind: TriggerKind,
    },
    TriggerExit {
        body: BodyId,
        trigger: Entity,
        kind: TriggerKind,
    },
    GroundedChanged {
        body: BodyId,
        grounded: bool,
        normal: Vec3,
    },
    /// The body was pushed out of an interpenetrating collider.
    Extracted {
        body: BodyId,
        from: Entity,
        displacement: Vec3,
    },
    NavigationCompleted {
        body: BodyId,
        success: bool,
    },
}
