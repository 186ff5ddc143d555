//! Rein Motion
//!
//! Kinematic movement and navigation for entities of a `hecs::World`.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - Transform hierarchy and collision geometry components
//! 2. **physics** - Ray casts, shape sweeps and overlaps against the world's colliders
//! 3. **motion** - Movable bodies: velocity composition, sweep-and-slide collision
//!    resolution, ground classification, triggers and controller hooks
//! 4. **navigation** - Waypoint following with a pooled path store
//! 5. **world** - [`MotionWorld`], which owns every body and runs the fixed-step loop

pub mod ecs;
pub mod error;
pub mod motion;
pub mod navigation;
pub mod physics;
pub mod world;

pub use ecs::prelude::*;

pub use error::{MotionError, Result, ShapeError};

pub use motion::{
    BodyConfig, CollisionData, CollisionHit, CreatureConfig, Curve, FrameVelocity, LeggedConfig,
    MotionEvent, MovableBody, Space, TriggerKind, Velocity,
};

pub use navigation::{NavMesh, NavigationConfig, NavigationPath, PathHandle, PathState, TurnPolicy};

pub use physics::{QueryFilter, ShapeAdapter, SpatialQuery, TriggerPolicy};

pub use world::{BodyId, MotionConfig, MotionWorld};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;
