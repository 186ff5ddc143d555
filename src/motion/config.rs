//! Per-body tuning.

use glam::Vec3;

use crate::ecs::components::physics::{ColliderShape, ALL_LAYERS};
use crate::navigation::NavigationConfig;

/// Static configuration of a movable body.
#[derive(Debug, Clone)]
pub struct BodyConfig {
    /// Shape swept against the world, and its offset from the body origin.
    pub shape: ColliderShape,
    pub shape_offset: Vec3,
    /// Optional separate shape used for trigger overlap. Defaults to `shape`.
    pub trigger_shape: Option<ColliderShape>,
    /// Gravity acceleration magnitude, units/s².
    pub gravity: f32,
    /// Initial gravity direction (normalized on use).
    pub gravity_direction: Vec3,
    pub use_gravity: bool,
    /// Fall speed cap along gravity, units/s.
    pub max_fall_speed: f32,
    /// Steepest surface still classified as ground, radians from anti-gravity.
    pub max_ground_angle: f32,
    /// Sweep-and-slide iterations per tick.
    pub recursion_budget: u32,
    pub collision_mask: u32,
    pub trigger_mask: u32,
    /// Flat force multiplier applied on landing.
    pub landing_dampening: f32,
    /// Flat force decay while grounded / airborne, units/s².
    pub ground_decay: f32,
    pub air_decay: f32,
    /// Erosion rate of opposing flat movement and force, per second.
    pub flat_deflection: f32,
    pub equalize: bool,
    /// 0 keeps the body upright against gravity, 1 follows the ground normal.
    pub up_alignment: f32,
    /// Max up-vector turn rate, radians/s.
    pub up_turn_rate: f32,
    /// Refresh overlaps and triggers every tick, not only after external moves.
    pub always_refresh: bool,
    pub legged: Option<LeggedConfig>,
    pub creature: Option<CreatureConfig>,
    pub navigation: Option<NavigationConfig>,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            shape: ColliderShape::Capsule {
                radius: 0.5,
                half_height: 0.5,
            },
            shape_offset: Vec3::new(0.0, 1.0, 0.0),
            trigger_shape: None,
            gravity: 9.81,
            gravity_direction: Vec3::NEG_Y,
            use_gravity: true,
            max_fall_speed: 50.0,
            max_ground_angle: 45f32.to_radians(),
            recursion_budget: 3,
            collision_mask: ALL_LAYERS,
            trigger_mask: ALL_LAYERS,
            landing_dampening: 0.5,
            ground_decay: 20.0,
            air_decay: 2.0,
            flat_deflection: 4.0,
            equalize: true,
            up_alignment: 0.0,
            up_turn_rate: std::f32::consts::PI,
            always_refresh: false,
            legged: None,
            creature: None,
            navigation: None,
        }
    }
}

impl BodyConfig {
    /// A simple body: a single sweep per tick.
    pub fn simple(shape: ColliderShape, shape_offset: Vec3) -> Self {
        Self {
            shape,
            shape_offset,
            recursion_budget: 1,
            ..Self::default()
        }
    }

    pub fn with_legs(mut self, legged: LeggedConfig) -> Self {
        self.legged = Some(legged);
        self
    }

    pub fn with_creature(mut self, creature: CreatureConfig) -> Self {
        self.creature = Some(creature);
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationConfig) -> Self {
        self.navigation = Some(navigation);
        self
    }
}

/// Step climbing and ground snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeggedConfig {
    pub climb_height: f32,
    pub snap_height: f32,
    /// Forward reach checked above an obstacle before climbing it.
    pub step_probe: f32,
}

impl Default for LeggedConfig {
    fn default() -> Self {
        Self {
            climb_height: 0.3,
            snap_height: 0.3,
            step_probe: 0.1,
        }
    }
}

/// Piecewise-linear curve over `[0, 1]`, clamped outside its keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    keys: Vec<(f32, f32)>,
}

impl Curve {
    pub fn constant(value: f32) -> Self {
        Self {
            keys: vec![(0.0, value)],
        }
    }

    /// Keys are sorted by time. An empty key list evaluates to 1.
    pub fn from_keys(mut keys: Vec<(f32, f32)>) -> Self {
        keys.retain(|(t, v)| t.is_finite() && v.is_finite());
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 1.0;
        };
        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let ((t0, v0), (t1, v1)) = (pair[0], pair[1]);
            if t <= t1 {
                let span = t1 - t0;
                if span <= f32::EPSILON {
                    return v1;
                }
                return v0 + (v1 - v0) * (t - t0) / span;
            }
        }
        last.1
    }
}

/// Creature locomotion: speeds shaped by curves over the time spent moving
/// or turning, normalized by the ramp durations.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatureConfig {
    pub move_speed: f32,
    /// Radians per second.
    pub turn_speed: f32,
    pub move_curve: Curve,
    pub move_ramp: f32,
    pub turn_curve: Curve,
    pub turn_ramp: f32,
}

impl Default for CreatureConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            turn_speed: std::f32::consts::TAU,
            move_curve: Curve::constant(1.0),
            move_ramp: 0.25,
            turn_curve: Curve::constant(1.0),
            turn_ramp: 0.25,
        }
    }
}
