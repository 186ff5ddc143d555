//! Per-stage override hooks.
//!
//! A body holds at most one controller per trait. Hooks returning `bool`
//! report whether they handled their stage; `true` skips the body's default
//! logic for that stage. Hooks returning `Option` override a value when
//! `Some`. Hooks returning nothing are notifications with no default logic.
//! Unregistered slots behave as if every hook returned "not handled".

use glam::Vec3;
use hecs::{Entity, World};

use super::body::MovableBody;
use super::collision::CollisionData;
use super::triggers::TriggerKind;
use super::velocity::FrameVelocity;

/// Runs around the whole tick.
pub trait UpdateController {
    fn pre_update(&mut self, _body: &mut MovableBody, _world: &World, _dt: f32) {}
    fn post_update(&mut self, _body: &mut MovableBody, _world: &World, _dt: f32) {}
}

/// Picks the layer mask the body sweeps against.
pub trait MaskController {
    fn collision_mask(&mut self, body: &MovableBody) -> Option<u32>;
}

pub trait VelocityController {
    fn apply_gravity(&mut self, _body: &mut MovableBody, _dt: f32) -> bool {
        false
    }

    /// Replace the frame velocity computation.
    fn frame_velocity(&mut self, _body: &mut MovableBody, _dt: f32) -> Option<FrameVelocity> {
        None
    }
}

pub trait CollisionController {
    /// Replace extraction and trigger refresh.
    fn refresh(&mut self, _body: &mut MovableBody, _world: &World) -> bool {
        false
    }

    /// Replace the sweep-and-slide pass. A handling controller moves the
    /// body itself (e.g. through [`MovableBody::set_position`]).
    fn perform_collisions(
        &mut self,
        _body: &mut MovableBody,
        _world: &World,
        _frame: &FrameVelocity,
    ) -> bool {
        false
    }

    /// Replace the post-collision up-axis alignment.
    fn on_collisions(&mut self, _body: &mut MovableBody, _data: &CollisionData) -> bool {
        false
    }

    /// Replace the landing force dampening.
    fn on_grounded_changed(&mut self, _body: &mut MovableBody, _grounded: bool) -> bool {
        false
    }

    /// Replace dropping the force that drives back into the collider the
    /// body was pushed out of.
    fn on_extracted(&mut self, _body: &mut MovableBody, _from: Entity, _displacement: Vec3) -> bool {
        false
    }
}

/// Notified of trigger changes before the matching events are queued.
pub trait TriggerController {
    fn on_trigger_enter(&mut self, _body: &mut MovableBody, _trigger: Entity, _kind: TriggerKind) {}

    fn on_trigger_exit(&mut self, _body: &mut MovableBody, _trigger: Entity, _kind: TriggerKind) {}
}

/// Creature speed, turn rate and navigation completion.
pub trait CreatureController {
    fn move_speed(&mut self, _body: &MovableBody) -> Option<f32> {
        None
    }

    fn turn_speed(&mut self, _body: &MovableBody) -> Option<f32> {
        None
    }

    fn on_navigation_completed(&mut self, _body: &mut MovableBody, _success: bool) {}
}

/// One optional controller per stage.
#[derive(Default)]
pub struct Controllers {
    update: Option<Box<dyn UpdateController>>,
    mask: Option<Box<dyn MaskController>>,
    velocity: Option<Box<dyn VelocityController>>,
    collision: Option<Box<dyn CollisionController>>,
    trigger: Option<Box<dyn TriggerController>>,
    creature: Option<Box<dyn CreatureController>>,
}

impl std::fmt::Debug for Controllers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controllers")
            .field("update", &self.update.is_some())
            .field("mask", &self.mask.is_some())
            .field("velocity", &self.velocity.is_some())
            .field("collision", &self.collision.is_some())
            .field("trigger", &self.trigger.is_some())
            .field("creature", &self.creature.is_some())
            .finish()
    }
}

/// Maps a controller trait object type to its slot in [`Controllers`].
pub trait ControllerSlot {
    fn slot(controllers: &mut Controllers) -> &mut Option<Box<Self>>;
}

macro_rules! controller_slot {
    ($($trait:ident => $field:ident),* $(,)?) => {
        $(
            impl ControllerSlot for dyn $trait {
                fn slot(controllers: &mut Controllers) -> &mut Option<Box<Self>> {
                    &mut controllers.$field
                }
            }
        )*
    };
}

controller_slot! {
    UpdateController => update,
    MaskController => mask,
    VelocityController => velocity,
    CollisionController => collision,
    TriggerController => trigger,
    CreatureController => creature,
}

impl Controllers {
    /// Install a controller, returning the one it replaces.
    pub fn register<T: ControllerSlot + ?Sized>(&mut self, controller: Box<T>) -> Option<Box<T>> {
        T::slot(self).replace(controller)
    }

    pub fn unregister<T: ControllerSlot + ?Sized>(&mut self) -> Option<Box<T>> {
        T::slot(self).take()
    }

    pub fn is_registered<T: ControllerSlot + ?Sized>(&mut self) -> bool {
        T::slot(self).is_some()
    }
}
