//! The movable body and its per-tick pipeline.

use glam::{Quat, Vec3};
use hecs::{Entity, World};
use tracing::{debug, trace, warn};

use crate::ecs::components::physics::LevelTrigger;
use crate::ecs::components::transform::Transform;
use crate::ecs::systems::commit_pose;
use crate::error::ShapeError;
use crate::physics::{
    ContactInfo, QueryFilter, ShapeAdapter, SpatialQuery, TriggerPolicy, CONTACT_OFFSET,
};
use crate::world::BodyId;

use super::collision::{
    CollisionResolver, Mover, ResolveSettings, ResolveStrategy, StandardStrategy,
};
use super::config::{BodyConfig, CreatureConfig};
use super::controller::{
    CollisionController, ControllerSlot, Controllers, CreatureController, MaskController,
    TriggerController, UpdateController, VelocityController,
};
use super::legged::LeggedStrategy;
use super::triggers::{TriggerKind, TriggerTracker};
use super::velocity::{
    compute_frame_velocity, FrameParams, FrameVelocity, Space, Velocity, VelocityCoefficients,
};
use super::MotionEvent;

/// Penetration-resolution passes per refresh.
const MAX_EXTRACTION_PASSES: usize = 4;
const EPSILON: f32 = 1e-6;

/// Query buffers shared by every body ticked in the same world.
#[derive(Debug, Default)]
pub struct MotionScratch {
    candidates: Vec<Entity>,
    overlaps: Vec<Entity>,
    contacts: Vec<(Entity, ContactInfo)>,
    entered: Vec<Entity>,
    exited: Vec<Entity>,
    resolver: CollisionResolver,
}

#[derive(Debug, Clone)]
struct BodyState {
    position: Vec3,
    rotation: Quat,
    is_grounded: bool,
    ground_normal: Vec3,
    gravity_direction: Vec3,
    use_gravity: bool,
    enabled: bool,
    /// Re-extract and refresh triggers on the next refresh point.
    needs_refresh: bool,
    /// The pose changed through the API and is not yet in the world.
    pose_dirty: bool,
    previous_frame: FrameVelocity,
    last_applied: Vec3,
    last_dt: f32,
}

#[derive(Debug, Clone)]
struct CreatureState {
    config: CreatureConfig,
    moving_time: f32,
    turning_time: f32,
    turned: bool,
}

/// A kinematic body moved by composed velocities and swept against the world.
pub struct MovableBody {
    id: BodyId,
    entity: Entity,
    collision_shape: ShapeAdapter,
    trigger_shape: ShapeAdapter,
    config: BodyConfig,
    velocity: Velocity,
    coefficients: VelocityCoefficients,
    state: BodyState,
    controllers: Controllers,
    legged: Option<LeggedStrategy>,
    creature: Option<CreatureState>,
    triggers: TriggerTracker,
    /// The body's entity followed by any entities it passes through.
    exclude: Vec<Entity>,
    events: Vec<MotionEvent>,
}

impl std::fmt::Debug for MovableBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovableBody")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .field("position", &self.state.position)
            .field("grounded", &self.state.is_grounded)
            .field("velocity", &self.velocity)
            .field("controllers", &self.controllers)
            .finish_non_exhaustive()
    }
}

impl MovableBody {
    /// Validate the configured shapes and build a body at the given pose.
    pub fn new(
        id: BodyId,
        entity: Entity,
        config: BodyConfig,
        position: Vec3,
        rotation: Quat,
    ) -> Result<Self, ShapeError> {
        let collision_shape = ShapeAdapter::new(&config.shape, config.shape_offset)?;
        let trigger_shape = ShapeAdapter::new(
            config.trigger_shape.as_ref().unwrap_or(&config.shape),
            config.shape_offset,
        )?;
        let gravity_direction = config.gravity_direction.normalize_or(Vec3::NEG_Y);
        let legged = config.legged.map(LeggedStrategy::new);
        let creature = config.creature.clone().map(|config| CreatureState {
            config,
            moving_time: 0.0,
            turning_time: 0.0,
            turned: false,
        });

        Ok(Self {
            id,
            entity,
            collision_shape,
            trigger_shape,
            velocity: Velocity::default(),
            coefficients: VelocityCoefficients::default(),
            state: BodyState {
                position,
                rotation,
                is_grounded: false,
                ground_normal: -gravity_direction,
                gravity_direction,
                use_gravity: config.use_gravity,
                enabled: true,
                needs_refresh: true,
                pose_dirty: false,
                previous_frame: FrameVelocity::default(),
                last_applied: Vec3::ZERO,
                last_dt: 0.0,
            },
            config,
            controllers: Controllers::default(),
            legged,
            creature,
            triggers: TriggerTracker::default(),
            exclude: vec![entity],
            events: Vec::new(),
        })
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    pub fn collision_shape(&self) -> &ShapeAdapter {
        &self.collision_shape
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn rotation(&self) -> Quat {
        self.state.rotation
    }

    pub fn velocity(&self) -> &Velocity {
        &self.velocity
    }

    pub fn velocity_mut(&mut self) -> &mut Velocity {
        &mut self.velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.state.is_grounded
    }

    /// Normal of the ground under the body, or the anti-gravity direction while airborne.
    pub fn ground_normal(&self) -> Vec3 {
        self.state.ground_normal
    }

    pub fn uses_gravity(&self) -> bool {
        self.state.use_gravity
    }

    pub fn gravity_direction(&self) -> Vec3 {
        self.state.gravity_direction
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Magnitude of the last applied displacement per second.
    pub fn speed(&self) -> f32 {
        if self.state.last_dt > 0.0 {
            self.state.last_applied.length() / self.state.last_dt
        } else {
            0.0
        }
    }

    pub fn last_applied_displacement(&self) -> Vec3 {
        self.state.last_applied
    }

    pub fn previous_frame_velocity(&self) -> &FrameVelocity {
        &self.state.previous_frame
    }

    /// Triggers the body currently overlaps.
    pub fn current_triggers(&self) -> &[Entity] {
        self.triggers.current()
    }

    // --- movement requests ---

    /// Move with the world-space velocity `velocity` (units/s) this tick.
    pub fn move_along(&mut self, velocity: Vec3) {
        let velocity = match self.velocity.movement_space {
            Space::World => velocity,
            Space::Local => self.state.rotation.inverse() * velocity,
        };
        self.velocity.movement += velocity;
    }

    /// Add to `movement`, expressed in the current movement space.
    pub fn add_movement_velocity(&mut self, velocity: Vec3) {
        self.velocity.movement += velocity;
    }

    pub fn add_force_velocity(&mut self, velocity: Vec3) {
        self.velocity.force += velocity;
    }

    /// Add a one-tick world-space displacement.
    pub fn add_instant_velocity(&mut self, displacement: Vec3) {
        self.velocity.instant += displacement;
    }

    /// Add one-tick local-space movement (root motion), scaled by the current speed.
    pub fn add_instant_movement(&mut self, displacement: Vec3) {
        self.velocity.instant_movement += displacement;
    }

    pub fn reset_velocity(&mut self) {
        self.velocity.reset();
        self.state.previous_frame = FrameVelocity::default();
    }

    pub fn set_movement_space(&mut self, space: Space) {
        self.velocity.movement_space = space;
    }

    /// Place the body; overlaps and triggers are refreshed on the next tick.
    pub fn set_position(&mut self, position: Vec3) {
        self.state.position = position;
        self.state.pose_dirty = true;
        self.state.needs_refresh = true;
    }

    /// [`set_position`](Self::set_position) that also drops all velocity.
    pub fn teleport(&mut self, position: Vec3) {
        self.set_position(position);
        self.reset_velocity();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.state.rotation = rotation.normalize();
        self.state.pose_dirty = true;
    }

    /// Turn about the body's up axis toward `direction` by at most
    /// `max_radians`. Returns the angle still left to turn.
    pub fn rotate_towards(&mut self, direction: Vec3, max_radians: f32) -> f32 {
        let up = self.state.rotation * Vec3::Y;
        let target = (direction - up * direction.dot(up)).normalize_or_zero();
        let forward = self.state.rotation * Vec3::NEG_Z;
        let forward = (forward - up * forward.dot(up)).normalize_or_zero();
        if target == Vec3::ZERO || forward == Vec3::ZERO {
            return 0.0;
        }

        let angle = up.dot(forward.cross(target)).atan2(forward.dot(target));
        if angle.abs() <= EPSILON {
            return 0.0;
        }
        let step = angle.clamp(-max_radians.max(0.0), max_radians.max(0.0));
        self.state.rotation = (Quat::from_axis_angle(up, step) * self.state.rotation).normalize();
        self.state.pose_dirty = true;
        if let Some(creature) = &mut self.creature {
            creature.turned = true;
        }
        (angle - step).abs()
    }

    pub fn set_gravity_sense(&mut self, direction: Vec3) {
        match direction.try_normalize() {
            Some(direction) => self.state.gravity_direction = direction,
            None => warn!(body = ?self.id, "ignored degenerate gravity direction"),
        }
    }

    pub fn set_use_gravity(&mut self, use_gravity: bool) {
        self.state.use_gravity = use_gravity;
    }

    /// Let the body pass through `entity`.
    pub fn ignore_entity(&mut self, entity: Entity) {
        if !self.exclude.contains(&entity) {
            self.exclude.push(entity);
        }
    }

    pub fn stop_ignoring(&mut self, entity: Entity) {
        if entity != self.entity {
            self.exclude.retain(|e| *e != entity);
        }
    }

    // --- coefficients ---

    pub fn push_velocity_coef(&mut self, coefficient: f32) -> bool {
        self.coefficients.push(coefficient)
    }

    pub fn pop_velocity_coef(&mut self, coefficient: f32) -> bool {
        self.coefficients.pop(coefficient)
    }

    pub fn velocity_coef(&self) -> f32 {
        self.coefficients.product()
    }

    pub fn velocity_coef_count(&self) -> usize {
        self.coefficients.len()
    }

    // --- creature ---

    /// Current move speed (units/s): the creature speed shaped by its curve,
    /// unless a creature controller overrides it.
    pub fn move_speed(&mut self) -> Option<f32> {
        if let Some(speed) = self.hook::<dyn CreatureController, _>(|c, b| c.move_speed(b)).flatten() {
            return Some(speed);
        }
        self.creature.as_ref().map(|c| {
            c.config.move_speed * c.config.move_curve.evaluate(ramp(c.moving_time, c.config.move_ramp))
        })
    }

    /// Current turn speed (radians/s).
    pub fn turn_speed(&mut self) -> Option<f32> {
        if let Some(speed) = self.hook::<dyn CreatureController, _>(|c, b| c.turn_speed(b)).flatten() {
            return Some(speed);
        }
        self.creature.as_ref().map(|c| {
            c.config.turn_speed * c.config.turn_curve.evaluate(ramp(c.turning_time, c.config.turn_ramp))
        })
    }

    fn speed_scale(&self) -> f32 {
        self.creature.as_ref().map_or(1.0, |c| {
            c.config.move_curve.evaluate(ramp(c.moving_time, c.config.move_ramp))
        })
    }

    // --- controllers ---

    /// Install a stage controller, returning the one it replaces:
    /// `body.register_controller::<dyn VelocityController>(Box::new(hover))`.
    pub fn register_controller<T: ControllerSlot + ?Sized>(&mut self, controller: Box<T>) -> Option<Box<T>> {
        self.controllers.register(controller)
    }

    pub fn unregister_controller<T: ControllerSlot + ?Sized>(&mut self) -> Option<Box<T>> {
        self.controllers.unregister::<T>()
    }

    /// Run `f` with the controller registered for `T` taken out of its slot.
    /// A controller registered by `f` itself takes precedence over the one
    /// being put back.
    fn hook<T, R>(&mut self, f: impl FnOnce(&mut T, &mut Self) -> R) -> Option<R>
    where
        T: ControllerSlot + ?Sized,
    {
        let mut controller = T::slot(&mut self.controllers).take()?;
        let result = f(&mut *controller, self);
        let slot = T::slot(&mut self.controllers);
        if slot.is_none() {
            *slot = Some(controller);
        }
        Some(result)
    }

    fn collision_mask(&mut self) -> u32 {
        self.hook::<dyn MaskController, _>(|c, b| c.collision_mask(b))
            .flatten()
            .unwrap_or(self.config.collision_mask)
    }

    pub(crate) fn push_event(&mut self, event: MotionEvent) {
        self.events.push(event);
    }

    pub(crate) fn drain_events_into(&mut self, out: &mut Vec<MotionEvent>) {
        out.append(&mut self.events);
    }

    /// Report the end of a navigation request.
    pub(crate) fn navigation_completed(&mut self, success: bool) {
        self.hook::<dyn CreatureController, _>(|c, b| c.on_navigation_completed(b, success));
        self.push_event(MotionEvent::NavigationCompleted {
            body: self.id,
            success,
        });
    }

    // --- lifecycle ---

    /// Stop ticking and exit every trigger the body is inside.
    pub fn disable(&mut self, world: &World) {
        if !self.state.enabled {
            return;
        }
        self.state.enabled = false;
        let mut exited = Vec::new();
        self.triggers.clear(&mut exited);
        for trigger in exited {
            self.exit_trigger(world, trigger);
        }
        debug!(body = ?self.id, "body disabled");
    }

    pub fn enable(&mut self) {
        if !self.state.enabled {
            self.state.enabled = true;
            self.state.needs_refresh = true;
        }
    }

    // --- pipeline ---

    /// One pass of the movement pipeline.
    pub fn tick(&mut self, world: &World, scratch: &mut MotionScratch, dt: f32) {
        if !self.state.enabled || !(dt > 0.0) {
            return;
        }

        self.hook::<dyn UpdateController, _>(|c, b| c.pre_update(b, world, dt));

        self.sync_pose(world);
        if self.state.needs_refresh || self.config.always_refresh {
            self.refresh(world, scratch);
        }

        let gravity_handled = self
            .hook::<dyn VelocityController, _>(|c, b| c.apply_gravity(b, dt))
            .unwrap_or(false);
        if !gravity_handled {
            self.apply_gravity(dt);
        }

        let frame = match self
            .hook::<dyn VelocityController, _>(|c, b| c.frame_velocity(b, dt))
            .flatten()
        {
            Some(frame) => frame,
            None => self.compute_frame_velocity(dt),
        };

        let collisions_handled = self
            .hook::<dyn CollisionController, _>(|c, b| c.perform_collisions(b, world, &frame))
            .unwrap_or(false);
        if collisions_handled {
            self.velocity.clear_frame();
            let before = self.position_in_world(world);
            self.sync_pose(world);
            self.state.last_applied = self.state.position - before;
            self.state.last_dt = dt;
        } else {
            self.resolve(world, scratch, &frame, dt);
        }
        self.state.previous_frame = frame;
        self.advance_creature(&frame, dt);

        if self.state.needs_refresh || self.config.always_refresh {
            self.refresh(world, scratch);
        }

        self.hook::<dyn UpdateController, _>(|c, b| c.post_update(b, world, dt));

        self.decay_force(dt);
    }

    fn position_in_world(&self, world: &World) -> Vec3 {
        world
            .get::<&Transform>(self.entity)
            .map(|t| t.position)
            .unwrap_or(self.state.position)
    }

    /// Push an API pose change into the world, or adopt a pose that was
    /// changed in the world behind the body's back.
    fn sync_pose(&mut self, world: &World) {
        if self.state.pose_dirty {
            commit_pose(world, self.entity, self.state.position, self.state.rotation);
            self.state.pose_dirty = false;
            return;
        }
        let Ok(transform) = world.get::<&Transform>(self.entity) else {
            return;
        };
        if transform.position != self.state.position || transform.rotation != self.state.rotation {
            trace!(body = ?self.id, "pose changed externally");
            self.state.position = transform.position;
            self.state.rotation = transform.rotation;
            self.state.needs_refresh = true;
        }
    }

    /// Push the body out of interpenetrating solids, then diff trigger overlaps.
    fn refresh(&mut self, world: &World, scratch: &mut MotionScratch) {
        self.state.needs_refresh = false;
        let handled = self
            .hook::<dyn CollisionController, _>(|c, b| c.refresh(b, world))
            .unwrap_or(false);
        if handled {
            return;
        }

        let mask = self.collision_mask();
        let mut query = SpatialQuery::new(world, &mut scratch.candidates);

        let start = self.state.position;
        for _ in 0..MAX_EXTRACTION_PASSES {
            let filter = QueryFilter::new(mask, TriggerPolicy::Ignore).excluding(&self.exclude);
            self.collision_shape.penetrations(
                &mut query,
                self.state.position,
                self.state.rotation,
                &filter,
                &mut scratch.contacts,
            );
            let Some(&(from, contact)) = scratch
                .contacts
                .iter()
                .max_by(|a, b| a.1.penetration.total_cmp(&b.1.penetration))
            else {
                break;
            };
            let displacement = -contact.normal * (contact.penetration + CONTACT_OFFSET);
            self.state.position += displacement;
            debug!(body = ?self.id, ?from, depth = contact.penetration, "extracted from collider");
            let handled = self
                .hook::<dyn CollisionController, _>(|c, b| c.on_extracted(b, from, displacement))
                .unwrap_or(false);
            if !handled {
                // Drop force pushing back into the collider.
                let out = displacement.normalize_or_zero();
                let into = self.velocity.force.dot(out);
                if into < 0.0 {
                    self.velocity.force -= out * into;
                }
            }
            self.push_event(MotionEvent::Extracted {
                body: self.id,
                from,
                displacement,
            });
        }
        if self.state.position != start {
            commit_pose(world, self.entity, self.state.position, self.state.rotation);
        }

        let filter =
            QueryFilter::new(self.config.trigger_mask, TriggerPolicy::Only).excluding(&self.exclude);
        self.trigger_shape.overlap(
            &mut query,
            self.state.position,
            self.state.rotation,
            &filter,
            &mut scratch.overlaps,
        );
        self.triggers
            .update(&scratch.overlaps, &mut scratch.entered, &mut scratch.exited);
        for &trigger in &scratch.exited {
            self.exit_trigger(world, trigger);
        }
        for &trigger in &scratch.entered {
            let kind = trigger_kind(world, trigger);
            self.hook::<dyn TriggerController, _>(|c, b| c.on_trigger_enter(b, trigger, kind));
            self.push_event(MotionEvent::TriggerEnter {
                body: self.id,
                trigger,
                kind,
            });
        }
    }

    fn exit_trigger(&mut self, world: &World, trigger: Entity) {
        let kind = trigger_kind(world, trigger);
        self.hook::<dyn TriggerController, _>(|c, b| c.on_trigger_exit(b, trigger, kind));
        self.push_event(MotionEvent::TriggerExit {
            body: self.id,
            trigger,
            kind,
        });
    }

    /// Accumulate gravity into `force` while airborne, capping the fall speed.
    fn apply_gravity(&mut self, dt: f32) {
        if !self.state.use_gravity || self.state.is_grounded {
            return;
        }
        let down = self.state.gravity_direction;
        self.velocity.force += down * (self.config.gravity * dt);
        let falling = self.velocity.force.dot(down);
        if falling > self.config.max_fall_speed {
            self.velocity.force -= down * (falling - self.config.max_fall_speed);
        }
    }

    fn compute_frame_velocity(&mut self, dt: f32) -> FrameVelocity {
        let params = FrameParams {
            speed_scale: self.speed_scale(),
            coefficient: self.coefficients.product(),
            flat_deflection: self.config.flat_deflection,
            equalize: self.config.equalize,
        };
        compute_frame_velocity(
            &mut self.velocity,
            self.state.rotation,
            &self.state.previous_frame,
            &params,
            dt,
        )
    }

    fn resolve(&mut self, world: &World, scratch: &mut MotionScratch, frame: &FrameVelocity, dt: f32) {
        let mask = self.collision_mask();
        let settings = ResolveSettings {
            recursion_budget: self.config.recursion_budget,
            gravity_direction: self.state.gravity_direction,
            max_ground_angle: self.config.max_ground_angle,
            was_grounded: self.state.is_grounded,
        };
        let mover = Mover {
            entity: self.entity,
            shape: &self.collision_shape,
            rotation: self.state.rotation,
            mask,
            exclude: &self.exclude,
        };
        let mut standard = StandardStrategy;
        let strategy: &mut dyn ResolveStrategy = match &mut self.legged {
            Some(legged) => legged,
            None => &mut standard,
        };
        let mut query = SpatialQuery::new(world, &mut scratch.candidates);
        let end = scratch.resolver.perform_collisions(
            &mut query,
            &mover,
            &settings,
            self.state.position,
            &mut self.velocity,
            frame,
            strategy,
        );

        let data = scratch.resolver.data();
        self.state.last_applied = data.applied_velocity;
        self.state.last_dt = dt;
        let mut pose_changed = false;
        if data.applied_velocity != Vec3::ZERO {
            self.state.position = end;
            pose_changed = true;
        }

        let was_grounded = self.state.is_grounded;
        self.state.is_grounded = data.is_grounded;
        self.state.ground_normal = if data.is_grounded {
            data.ground_normal
        } else {
            -self.state.gravity_direction
        };
        if was_grounded != data.is_grounded {
            self.grounded_changed(data.is_grounded);
        }

        let handled = self
            .hook::<dyn CollisionController, _>(|c, b| c.on_collisions(b, data))
            .unwrap_or(false);
        if !handled {
            pose_changed |= self.align_up(dt);
        }

        if pose_changed {
            commit_pose(world, self.entity, self.state.position, self.state.rotation);
            self.state.needs_refresh = true;
        }
    }

    fn grounded_changed(&mut self, grounded: bool) {
        debug!(body = ?self.id, grounded, "grounded state changed");
        self.push_event(MotionEvent::GroundedChanged {
            body: self.id,
            grounded,
            normal: self.state.ground_normal,
        });
        let handled = self
            .hook::<dyn CollisionController, _>(|c, b| c.on_grounded_changed(b, grounded))
            .unwrap_or(false);
        if !handled && grounded {
            let down = self.state.gravity_direction;
            let vertical = down * self.velocity.force.dot(down);
            let flat = self.velocity.force - vertical;
            self.velocity.force = vertical + flat * self.config.landing_dampening;
        }
    }

    /// Turn the body's up axis toward the ground normal (blended by
    /// `up_alignment`) or the anti-gravity direction, at most
    /// `up_turn_rate · dt`. Returns whether the rotation changed.
    fn align_up(&mut self, dt: f32) -> bool {
        let anti_gravity = -self.state.gravity_direction;
        let target = if self.state.is_grounded {
            anti_gravity
                .lerp(self.state.ground_normal, self.config.up_alignment.clamp(0.0, 1.0))
                .normalize_or(anti_gravity)
        } else {
            anti_gravity
        };
        let up = self.state.rotation * Vec3::Y;
        if up.dot(target) >= 1.0 - EPSILON {
            return false;
        }
        let angle = up.angle_between(target);
        let arc = Quat::from_rotation_arc(up, target);
        let max = self.config.up_turn_rate * dt;
        let step = if angle <= max {
            arc
        } else {
            Quat::IDENTITY.slerp(arc, max / angle)
        };
        self.state.rotation = (step * self.state.rotation).normalize();
        true
    }

    fn advance_creature(&mut self, frame: &FrameVelocity, dt: f32) {
        let Some(creature) = &mut self.creature else {
            return;
        };
        if frame.movement.length_squared() > EPSILON * EPSILON {
            creature.moving_time += dt;
        } else {
            creature.moving_time = 0.0;
        }
        if creature.turned {
            creature.turning_time += dt;
        } else {
            creature.turning_time = 0.0;
        }
        creature.turned = false;
    }

    /// Move the flat part of `force` toward zero at the ground or air rate.
    fn decay_force(&mut self, dt: f32) {
        let down = self.state.gravity_direction;
        let vertical = down * self.velocity.force.dot(down);
        let flat = self.velocity.force - vertical;
        let len = flat.length();
        if len <= EPSILON {
            self.velocity.force = vertical;
            return;
        }
        let rate = if self.state.is_grounded {
            self.config.ground_decay
        } else {
            self.config.air_decay
        };
        let remaining = (len - rate * dt).max(0.0);
        self.velocity.force = vertical + flat * (remaining / len);
    }
}

/// Normalized time along a speed ramp.
fn ramp(elapsed: f32, duration: f32) -> f32 {
    if duration > 0.0 {
        (elapsed / duration).min(1.0)
    } else {
        1.0
    }
}

fn trigger_kind(world: &World, trigger: Entity) -> TriggerKind {
    if world.satisfies::<&LevelTrigger>(trigger).unwrap_or(false) {
        TriggerKind::Level
    } else {
        TriggerKind::Standard
    }
}
