//! Drives a movable body along its navigation path.

use glam::{Quat, Vec3};
use tracing::{debug, warn};

use crate::motion::MovableBody;

use super::mesh::{plan_path, NavMesh};
use super::path::{CompletionCallback, PathState};
use super::pool::{PathHandle, PathPool};

/// Whether (and how) the body turns toward the waypoint it walks to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TurnPolicy {
    /// Keep the current heading.
    #[default]
    None,
    /// Turn in place until facing within `tolerance` radians, then move.
    TurnThenMove { tolerance: f32 },
    TurnWhileMoving,
}

/// Path-following tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationConfig {
    /// Horizontal distance at which a waypoint counts as reached.
    pub arrive_flat: f32,
    /// Vertical distance at which a waypoint counts as reached.
    pub arrive_vertical: f32,
    /// Per-tick change in waypoint distance below which the body counts as stuck.
    pub stuck_tolerance: f32,
    /// Seconds stuck before the path is force-completed.
    pub stuck_duration: f32,
    pub turn_policy: TurnPolicy,
    /// Move speed (units/s) for bodies without a creature speed.
    pub speed: f32,
    /// Turn speed (radians/s) for bodies without a creature turn speed.
    pub turn_speed: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            arrive_flat: 0.1,
            arrive_vertical: 0.5,
            stuck_tolerance: 1e-3,
            stuck_duration: 1.0,
            turn_policy: TurnPolicy::None,
            speed: 4.0,
            turn_speed: std::f32::consts::TAU,
        }
    }
}

/// Per-body navigation state: the active path and at most one path waiting
/// for the active one to wind down.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    pub config: NavigationConfig,
    active: Option<PathHandle>,
    pending: Option<PathHandle>,
    waypoints: Vec<Vec3>,
}

impl Navigator {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn active(&self) -> Option<PathHandle> {
        self.active
    }

    pub fn pending(&self) -> Option<PathHandle> {
        self.pending
    }

    pub fn is_navigating(&self) -> bool {
        self.active.is_some() || self.pending.is_some()
    }

    /// Plan a path from the body to `destination` and start following it.
    pub fn navigate_to(
        &mut self,
        body: &mut MovableBody,
        pool: &mut PathPool,
        mesh: Option<&dyn NavMesh>,
        destination: Vec3,
        final_rotation: Option<Quat>,
        on_complete: Option<CompletionCallback>,
    ) -> Option<PathHandle> {
        if !destination.is_finite() {
            warn!(body = ?body.id(), ?destination, "ignored navigation to a degenerate destination");
            return None;
        }
        let mut waypoints = std::mem::take(&mut self.waypoints);
        plan_path(mesh, body.position(), destination, &mut waypoints);
        let handle = self.start(body, pool, &waypoints, final_rotation, on_complete);
        self.waypoints = waypoints;
        Some(handle)
    }

    /// Follow explicit waypoints.
    pub fn follow(
        &mut self,
        body: &mut MovableBody,
        pool: &mut PathPool,
        waypoints: &[Vec3],
        final_rotation: Option<Quat>,
        on_complete: Option<CompletionCallback>,
    ) -> Option<PathHandle> {
        if waypoints.is_empty() || waypoints.iter().any(|w| !w.is_finite()) {
            warn!(body = ?body.id(), count = waypoints.len(), "ignored degenerate waypoint list");
            return None;
        }
        Some(self.start(body, pool, waypoints, final_rotation, on_complete))
    }

    fn start(
        &mut self,
        body: &mut MovableBody,
        pool: &mut PathPool,
        waypoints: &[Vec3],
        final_rotation: Option<Quat>,
        on_complete: Option<CompletionCallback>,
    ) -> PathHandle {
        let handle = pool.acquire();
        if let Some(path) = pool.get_mut(handle) {
            path.setup(waypoints, final_rotation, on_complete);
        }

        match self.active {
            Some(active) if pool.is_valid(active) => {
                if let Some(path) = pool.get_mut(active) {
                    path.request_cancel();
                }
                if let Some(replaced) = self.pending.replace(handle) {
                    // Never activated: it ends right away.
                    finalize(body, pool, replaced, false);
                }
                debug!(body = ?body.id(), "navigation queued behind the active path");
            }
            _ => {
                if let Some(path) = pool.get_mut(handle) {
                    path.activate();
                }
                self.active = Some(handle);
                debug!(body = ?body.id(), waypoints = waypoints.len(), "navigation started");
            }
        }
        handle
    }

    pub fn pause(&mut self, pool: &mut PathPool) -> bool {
        self.active
            .and_then(|h| pool.get_mut(h))
            .is_some_and(|p| p.pause())
    }

    pub fn resume(&mut self, pool: &mut PathPool) -> bool {
        self.active
            .and_then(|h| pool.get_mut(h))
            .is_some_and(|p| p.resume())
    }

    /// Cancel at the next update.
    pub fn cancel(&mut self, pool: &mut PathPool) -> bool {
        match self.active.and_then(|h| pool.get_mut(h)) {
            Some(path) => {
                path.request_cancel();
                true
            }
            None => false,
        }
    }

    /// Complete at the next update, placing the body on the final waypoint.
    pub fn complete(&mut self, pool: &mut PathPool) -> bool {
        match self.active.and_then(|h| pool.get_mut(h)) {
            Some(path) => {
                path.request_complete();
                true
            }
            None => false,
        }
    }

    /// Carry out a requested cancel or completion without steering the
    /// body. Used while the body is disabled.
    pub fn settle(&mut self, body: &mut MovableBody, pool: &mut PathPool) -> bool {
        let Some(handle) = self.active else {
            return false;
        };
        let Some(path) = pool.get(handle) else {
            self.active = self.pending.take();
            return false;
        };
        if path.is_cancel_requested() {
            self.finish(body, pool, handle, false);
            true
        } else if path.is_complete_requested() {
            self.complete_now(body, pool, handle);
            true
        } else {
            false
        }
    }

    /// Advance the active path by one tick. Returns whether a path is still
    /// being followed.
    pub fn update(&mut self, body: &mut MovableBody, pool: &mut PathPool, dt: f32) -> bool {
        let Some(handle) = self.active else {
            return false;
        };
        let Some(path) = pool.get_mut(handle) else {
            self.active = self.pending.take();
            return false;
        };

        if path.is_cancel_requested() {
            self.finish(body, pool, handle, false);
            return false;
        }
        if path.is_complete_requested() {
            self.complete_now(body, pool, handle);
            return false;
        }
        if path.state() == PathState::Paused {
            return true;
        }
        let Some(target) = path.current_waypoint() else {
            self.finish(body, pool, handle, true);
            return false;
        };

        let delta = target - body.position();
        let local = body.rotation().inverse() * delta;
        let flat = (local.x * local.x + local.z * local.z).sqrt();
        if flat <= self.config.arrive_flat && local.y.abs() <= self.config.arrive_vertical {
            if path.advance() {
                return true;
            }
            if let Some(rotation) = path.final_rotation() {
                body.set_rotation(rotation);
            }
            self.finish(body, pool, handle, true);
            return false;
        }

        let travel = if body.uses_gravity() {
            let down = body.gravity_direction();
            delta - down * delta.dot(down)
        } else {
            delta
        };
        let distance = travel.length();
        let direction = travel.normalize_or_zero();

        let speed = body.move_speed().unwrap_or(self.config.speed);
        let turn = body.turn_speed().unwrap_or(self.config.turn_speed) * dt;
        let can_move = match self.config.turn_policy {
            TurnPolicy::None => true,
            TurnPolicy::TurnWhileMoving => {
                body.rotate_towards(direction, turn);
                true
            }
            TurnPolicy::TurnThenMove { tolerance } => body.rotate_towards(direction, turn) <= tolerance,
        };

        let Some(path) = pool.get_mut(handle) else {
            return false;
        };
        if !can_move {
            path.reset_progress();
            return true;
        }
        let stuck_for = path.track_progress(delta.length(), self.config.stuck_tolerance, dt);
        if stuck_for > self.config.stuck_duration {
            debug!(body = ?body.id(), stuck_for, "navigation stuck, forcing completion");
            self.complete_now(body, pool, handle);
            return false;
        }

        let step = speed.min(distance / dt);
        body.move_along(direction * step);
        true
    }

    /// Place the body on the destination, apply the final rotation and finish.
    fn complete_now(&mut self, body: &mut MovableBody, pool: &mut PathPool, handle: PathHandle) {
        if let Some(path) = pool.get(handle) {
            if let Some(destination) = path.destination() {
                body.teleport(destination);
            }
            if let Some(rotation) = path.final_rotation() {
                body.set_rotation(rotation);
            }
        }
        self.finish(body, pool, handle, true);
    }

    /// End the active path and promote the pending one.
    fn finish(&mut self, body: &mut MovableBody, pool: &mut PathPool, handle: PathHandle, success: bool) {
        finalize(body, pool, handle, success);
        self.active = self.pending.take();
        if let Some(next) = self.active.and_then(|h| pool.get_mut(h)) {
            next.activate();
        }
    }
}

/// Release `handle`, then run its callback and notify the body.
fn finalize(body: &mut MovableBody, pool: &mut PathPool, handle: PathHandle, success: bool) {
    let callback = pool.get_mut(handle).and_then(|p| p.finish());
    pool.release(handle);
    debug!(body = ?body.id(), success, "navigation finished");
    if let Some(callback) = callback {
        callback(success);
    }
    body.navigation_completed(success);
}
