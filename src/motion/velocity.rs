//! Persistent velocity state, the per-tick frame velocity derived from it,
//! and the multiplicative velocity-coefficient stack.

use glam::{Quat, Vec3};
use tracing::warn;

const EPSILON: f32 = 1e-6;
/// Relative residual under which last tick's movement and force count as balanced.
const BALANCE_TOLERANCE: f32 = 1e-2;

/// Frame in which [`Velocity::movement`] is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
    #[default]
    World,
    /// Relative to the body's rotation.
    Local,
}

/// Velocity a body accumulates between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    /// Intentional movement, units/second. Cleared after every tick.
    pub movement: Vec3,
    pub movement_space: Space,
    /// One-tick local-space movement (root motion), units/tick.
    pub instant_movement: Vec3,
    /// External continuous velocity (world space), units/second. Persists and decays.
    pub force: Vec3,
    /// One-tick world-space displacement, applied before the sweep-and-slide pass.
    pub instant: Vec3,
}

impl Velocity {
    /// Drop the per-tick components, keeping `force`.
    pub fn clear_frame(&mut self) {
        self.movement = Vec3::ZERO;
        self.instant_movement = Vec3::ZERO;
        self.instant = Vec3::ZERO;
    }

    pub fn reset(&mut self) {
        *self = Self {
            movement_space: self.movement_space,
            ..Self::default()
        };
    }
}

/// Velocity resolved for a single tick: world-space rates before the
/// coefficient, plus the snapshot they were computed with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameVelocity {
    pub movement: Vec3,
    pub force: Vec3,
    /// Absolute displacement (not a rate).
    pub instant: Vec3,
    pub rotation: Quat,
    pub coefficient: f32,
    pub dt: f32,
}

impl Default for FrameVelocity {
    fn default() -> Self {
        Self {
            movement: Vec3::ZERO,
            force: Vec3::ZERO,
            instant: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            coefficient: 1.0,
            dt: 0.0,
        }
    }
}

impl FrameVelocity {
    /// Displacement for the sweep-and-slide pass (movement + force).
    pub fn dynamic_displacement(&self) -> Vec3 {
        (self.movement + self.force) * (self.coefficient * self.dt)
    }

    pub fn instant_displacement(&self) -> Vec3 {
        self.instant * self.coefficient
    }
}

/// Tuning inputs for [`compute_frame_velocity`].
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    /// Scales instant movement (creature speed multipliers).
    pub speed_scale: f32,
    /// Product of the velocity-coefficient stack.
    pub coefficient: f32,
    /// How fast opposing flat movement and force erode each other, per second.
    pub flat_deflection: f32,
    /// Carry the previous tick's balanced force when movement stops.
    pub equalize: bool,
}

/// Local-space horizontal part.
#[inline]
fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Remove at most `|b|·k` of the component of `a` that opposes `b`.
fn erode(a: Vec3, b: Vec3, k: f32) -> Vec3 {
    let len = b.length();
    if len <= EPSILON {
        return a;
    }
    let dir = b / len;
    let opposing = a.dot(dir);
    if opposing >= 0.0 {
        return a;
    }
    a + dir * (-opposing).min(len * k)
}

/// Derive this tick's [`FrameVelocity`] from the persistent velocity.
///
/// Works in the body's local frame (local +Y is "vertical"). Opposing
/// vertical movement and force cancel with the remainder kept by the larger
/// one, and the reduced force is written back to `velocity`. Flat movement
/// and force then erode each other proportionally to `dt`. With `equalize`,
/// a tick whose flat movement just stopped after a balanced tick keeps that
/// tick's flat force instead of jumping to the full persistent force.
pub fn compute_frame_velocity(
    velocity: &mut Velocity,
    rotation: Quat,
    previous: &FrameVelocity,
    params: &FrameParams,
    dt: f32,
) -> FrameVelocity {
    let inv = rotation.inverse();
    let mut movement = match velocity.movement_space {
        Space::World => inv * velocity.movement,
        Space::Local => velocity.movement,
    };
    if velocity.instant_movement != Vec3::ZERO && dt > 0.0 {
        movement += velocity.instant_movement * params.speed_scale / dt;
    }
    let mut force = inv * velocity.force;

    if movement.y * force.y < 0.0 {
        let total = movement.y + force.y;
        if movement.y.abs() >= force.y.abs() {
            movement.y = total;
            force.y = 0.0;
        } else {
            force.y = total;
            movement.y = 0.0;
        }
        velocity.force = rotation * force;
    }

    let flat_movement = flat(movement);
    let flat_force = flat(force);
    let k = dt * params.flat_deflection;
    let mut eroded_force = erode(flat_force, flat_movement, k);
    let eroded_movement = erode(flat_movement, flat_force, k);

    if params.equalize && flat_movement.length_squared() <= EPSILON * EPSILON {
        let prev_inv = inv;
        let prev_movement = flat(prev_inv * previous.movement);
        let prev_force = flat(prev_inv * previous.force);
        let prev_len = prev_movement.length();
        if prev_len > EPSILON && (prev_movement + prev_force).length() <= prev_len * BALANCE_TOLERANCE
        {
            eroded_force = prev_force;
        }
    }

    FrameVelocity {
        movement: rotation * (eroded_movement + Vec3::Y * movement.y),
        force: rotation * (eroded_force + Vec3::Y * force.y),
        instant: velocity.instant,
        rotation,
        coefficient: params.coefficient,
        dt,
    }
}

/// Multiplicative stack of velocity coefficients. Push and pop come in
/// matched pairs and commute; an empty stack multiplies by exactly 1.
#[derive(Debug, Clone, Default)]
pub struct VelocityCoefficients {
    stack: Vec<f32>,
}

impl VelocityCoefficients {
    /// Push a coefficient. Zero (and non-finite values) would make every
    /// later pop ambiguous, so they are rejected and logged.
    pub fn push(&mut self, coefficient: f32) -> bool {
        if coefficient == 0.0 || !coefficient.is_finite() {
            warn!(coefficient, "rejected velocity coefficient");
            return false;
        }
        self.stack.push(coefficient);
        true
    }

    /// Pop a previously pushed coefficient, in any order.
    pub fn pop(&mut self, coefficient: f32) -> bool {
        match self.stack.iter().rposition(|c| *c == coefficient) {
            Some(index) => {
                self.stack.remove(index);
                true
            }
            None => {
                warn!(coefficient, "popped a velocity coefficient that was never pushed");
                false
            }
        }
    }

    /// Net coefficient: the product of the stack.
    pub fn product(&self) -> f32 {
        self.stack.iter().product()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
