//! Collision geometry queries over a `hecs::World`.
//!
//! # Layers
//!
//! 1. [`collider`] - support mappings and bounding boxes per [`ColliderShape`](crate::ecs::components::physics::ColliderShape)
//! 2. [`broadphase`] - AABB candidate filtering
//! 3. [`narrowphase`] - GJK/EPA, SAT and GJK ray casting
//! 4. [`query`] - ray casts, shape sweeps and overlaps against the whole world
//! 5. [`shape`] - the uniform box/capsule/sphere interface movable bodies query through

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod narrowphase;
pub mod query;
pub mod shape;

use hecs::Entity;

use crate::ecs::components::physics::{Collider, ALL_LAYERS};

pub use self::contact::{CastHit, ContactInfo, RayHit, ShapeHit};
pub use self::query::SpatialQuery;
pub use self::shape::ShapeAdapter;

/// Gap kept between a resolved shape and any surface it was swept against.
pub const CONTACT_OFFSET: f32 = 0.01;
/// Hits within this distance of the closest one are treated as simultaneous.
pub const SIMULTANEOUS_EPSILON: f32 = 1e-4;
/// Reach of the short ground probes (ray and sweep).
pub const GROUND_PROBE_DISTANCE: f32 = 2.5 * CONTACT_OFFSET;
/// Capacity of a single sweep's hit buffer.
pub const MAX_SWEEP_HITS: usize = 8;
/// Capacity of a single overlap query's result buffer.
pub const MAX_OVERLAPS: usize = 16;

/// How sensor colliders take part in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerPolicy {
    /// Sensors are invisible to the query.
    #[default]
    Ignore,
    /// Sensors are reported alongside solids.
    Collide,
    /// Only sensors are reported.
    Only,
}

/// Layer mask, trigger policy and excluded entities for a query.
#[derive(Debug, Clone, Copy)]
pub struct QueryFilter<'a> {
    pub mask: u32,
    pub triggers: TriggerPolicy,
    pub exclude: &'a [Entity],
}

impl<'a> QueryFilter<'a> {
    pub fn new(mask: u32, triggers: TriggerPolicy) -> Self {
        Self {
            mask,
            triggers,
            exclude: &[],
        }
    }

    pub fn excluding(self, exclude: &'a [Entity]) -> Self {
        Self { exclude, ..self }
    }

    pub fn accepts(&self, entity: Entity, collider: &Collider) -> bool {
        let trigger_ok = match self.triggers {
            TriggerPolicy::Ignore => !collider.is_sensor,
            TriggerPolicy::Collide => true,
            TriggerPolicy::Only => collider.is_sensor,
        };
        trigger_ok && collider.layers & self.mask != 0 && !self.exclude.contains(&entity)
    }
}

impl Default for QueryFilter<'_> {
    fn default() -> Self {
        Self::new(ALL_LAYERS, TriggerPolicy::Ignore)
    }
}
