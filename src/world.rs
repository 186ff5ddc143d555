//! The motion world: every movable body, their navigation, and the fixed-step loop.

use glam::{Quat, Vec3};
use hecs::{Entity, World};
use tracing::{debug, warn};

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::ecs::components::transform::{GlobalTransform, Transform};
use crate::ecs::systems::transform_system;
use crate::error::{MotionError, Result};
use crate::motion::{BodyConfig, MotionEvent, MotionScratch, MovableBody};
use crate::navigation::{
    CompletionCallback, NavMesh, NavigationPath, Navigator, PathHandle, PathPool,
};

/// Identifies a body in a [`MotionWorld`]. Never reused within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

impl BodyId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Simulation loop configuration.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Fixed timestep in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of ticks per [`MotionWorld::step`]. Default: 4.
    pub max_substeps: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
        }
    }
}

struct BodySlot {
    body: MovableBody,
    navigator: Navigator,
    /// The collider was inserted by `add_body` and goes away with the body.
    owns_collider: bool,
}

/// Owns the movable bodies driving entities of a `hecs::World`.
///
/// # Tick order
///
/// 1. Sync `GlobalTransform`s
/// 2. Per body, in id order: navigation update, then the body pipeline
/// 3. Queue the bodies' events
pub struct MotionWorld {
    config: MotionConfig,
    accumulator: f64,
    slots: Vec<Option<BodySlot>>,
    paths: PathPool,
    nav_mesh: Option<Box<dyn NavMesh>>,
    scratch: MotionScratch,
    events: Vec<MotionEvent>,
}

impl Default for MotionWorld {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl MotionWorld {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            slots: Vec::new(),
            paths: PathPool::new(),
            nav_mesh: None,
            scratch: MotionScratch::default(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Install the navigation mesh used to plan paths. Without one, paths
    /// head straight for their destination.
    pub fn set_nav_mesh(&mut self, mesh: Option<Box<dyn NavMesh>>) {
        self.nav_mesh = mesh;
    }

    /// Drive `entity` with a new movable body, starting from its `Transform`.
    ///
    /// An entity without a `Collider` gets one built from the body's shape,
    /// so other bodies collide with it. The body never collides with its
    /// own entity.
    pub fn add_body(&mut self, world: &mut World, entity: Entity, config: BodyConfig) -> Result<BodyId> {
        let (position, rotation) = world
            .get::<&Transform>(entity)
            .map(|t| (t.position, t.rotation))
            .map_err(|_| MotionError::MissingComponent {
                entity,
                component: "Transform",
            })?;
        if world.get::<&RigidBody>(entity).is_ok_and(|rb| rb.is_static()) {
            return Err(MotionError::StaticBody(entity));
        }
        if self.bodies().any(|b| b.entity() == entity) {
            return Err(MotionError::AlreadyMovable(entity));
        }

        let id = BodyId(self.slots.len() as u32);
        let navigator = Navigator::new(config.navigation.unwrap_or_default());
        let collider = Collider::new(config.shape.clone()).with_offset(config.shape_offset);
        let body = MovableBody::new(id, entity, config, position, rotation)?;

        let owns_collider = !world.satisfies::<&Collider>(entity).unwrap_or(false);
        if owns_collider {
            let global = GlobalTransform(Transform::from_position_rotation(position, rotation).to_matrix());
            world.insert_one(entity, collider)?;
            if !world.satisfies::<&GlobalTransform>(entity).unwrap_or(false) {
                world.insert_one(entity, global)?;
            }
        }
        self.slots.push(Some(BodySlot {
            body,
            navigator,
            owns_collider,
        }));
        debug!(?id, ?entity, owns_collider, "movable body added");
        Ok(id)
    }

    /// Remove a body: its navigation is cancelled, it exits its triggers
    /// and the collider `add_body` inserted is removed.
    pub fn remove_body(&mut self, world: &mut World, id: BodyId) -> Result<MovableBody> {
        let mut slot = self
            .slots
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(MotionError::UnknownBody(id))?;
        // Cancelling promotes a queued path, which is then cancelled too.
        while slot.navigator.cancel(&mut self.paths) {
            slot.navigator.settle(&mut slot.body, &mut self.paths);
        }
        slot.body.disable(world);
        slot.body.drain_events_into(&mut self.events);
        if slot.owns_collider {
            // The entity may already be despawned.
            let _ = world.remove_one::<Collider>(slot.body.entity());
        }
        debug!(?id, "movable body removed");
        Ok(slot.body)
    }

    pub fn body(&self, id: BodyId) -> Option<&MovableBody> {
        self.slot(id).map(|s| &s.body)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut MovableBody> {
        self.slot_mut(id).map(|s| &mut s.body)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &MovableBody> {
        self.slots.iter().flatten().map(|s| &s.body)
    }

    pub fn body_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn slot(&self, id: BodyId) -> Option<&BodySlot> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: BodyId) -> Option<&mut BodySlot> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Disable a body; it exits every trigger and stops ticking.
    pub fn disable_body(&mut self, world: &World, id: BodyId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(MotionError::UnknownBody(id))?;
        slot.body.disable(world);
        slot.body.drain_events_into(&mut self.events);
        Ok(())
    }

    pub fn enable_body(&mut self, id: BodyId) -> Result<()> {
        self.body_mut(id).ok_or(MotionError::UnknownBody(id))?.enable();
        Ok(())
    }

    // --- navigation ---

    /// Plan a path to `destination` and follow it. A degenerate destination
    /// is logged and yields `None`.
    pub fn navigate_to(
        &mut self,
        id: BodyId,
        destination: Vec3,
        final_rotation: Option<Quat>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<Option<PathHandle>> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(MotionError::UnknownBody(id))?;
        let handle = slot.navigator.navigate_to(
            &mut slot.body,
            &mut self.paths,
            self.nav_mesh.as_deref(),
            destination,
            final_rotation,
            on_complete,
        );
        slot.body.drain_events_into(&mut self.events);
        Ok(handle)
    }

    /// Follow explicit waypoints.
    pub fn follow_path(
        &mut self,
        id: BodyId,
        waypoints: &[Vec3],
        final_rotation: Option<Quat>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<Option<PathHandle>> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(MotionError::UnknownBody(id))?;
        let handle =
            slot.navigator
                .follow(&mut slot.body, &mut self.paths, waypoints, final_rotation, on_complete);
        slot.body.drain_events_into(&mut self.events);
        Ok(handle)
    }

    pub fn pause_navigation(&mut self, id: BodyId) -> Result<bool> {
        let slot = self.slots.get_mut(id.0 as usize).and_then(Option::as_mut);
        let slot = slot.ok_or(MotionError::UnknownBody(id))?;
        Ok(slot.navigator.pause(&mut self.paths))
    }

    pub fn resume_navigation(&mut self, id: BodyId) -> Result<bool> {
        let slot = self.slots.get_mut(id.0 as usize).and_then(Option::as_mut);
        let slot = slot.ok_or(MotionError::UnknownBody(id))?;
        Ok(slot.navigator.resume(&mut self.paths))
    }

    /// Cancel the active path; its callback runs on the next tick.
    pub fn cancel_navigation(&mut self, id: BodyId) -> Result<bool> {
        let slot = self.slots.get_mut(id.0 as usize).and_then(Option::as_mut);
        let slot = slot.ok_or(MotionError::UnknownBody(id))?;
        Ok(slot.navigator.cancel(&mut self.paths))
    }

    /// Complete the active path on the next tick, placing the body on its destination.
    pub fn complete_navigation(&mut self, id: BodyId) -> Result<bool> {
        let slot = self.slots.get_mut(id.0 as usize).and_then(Option::as_mut);
        let slot = slot.ok_or(MotionError::UnknownBody(id))?;
        Ok(slot.navigator.complete(&mut self.paths))
    }

    /// The path a body is currently following.
    pub fn navigation_path(&self, id: BodyId) -> Option<&NavigationPath> {
        let handle = self.slot(id)?.navigator.active()?;
        self.paths.get(handle)
    }

    pub fn is_navigating(&self, id: BodyId) -> bool {
        self.slot(id).is_some_and(|s| s.navigator.is_navigating())
    }

    pub fn path_pool(&self) -> &PathPool {
        &self.paths
    }

    // --- simulation ---

    /// Advance by `delta_time` seconds in fixed ticks. Returns the number of
    /// ticks run.
    pub fn step(&mut self, world: &mut World, delta_time: f64) -> u32 {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.tick(world, self.config.fixed_timestep as f32);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Drop the backlog rather than falling further behind every frame.
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            warn!(backlog = self.accumulator, "motion step fell behind, dropping time");
            self.accumulator = 0.0;
        }
        substeps
    }

    /// One pass of every enabled body. Disabled bodies only settle
    /// requested navigation cancels and completions.
    pub fn tick(&mut self, world: &mut World, dt: f32) {
        transform_system(world);
        let world = &*world;
        for slot in self.slots.iter_mut().flatten() {
            if !slot.body.is_enabled() {
                if slot.navigator.settle(&mut slot.body, &mut self.paths) {
                    slot.body.drain_events_into(&mut self.events);
                }
                continue;
            }
            slot.navigator.update(&mut slot.body, &mut self.paths, dt);
            slot.body.tick(world, &mut self.scratch, dt);
            slot.body.drain_events_into(&mut self.events);
        }
    }

    /// Take the events raised since the last drain, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, MotionEvent> {
        self.events.drain(..)
    }
}
