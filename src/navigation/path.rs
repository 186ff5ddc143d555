//! A single navigation request: waypoints, progress and completion.

use glam::{Quat, Vec3};

/// Invoked exactly once when a path finishes; `true` on completion, `false`
/// on cancellation.
pub type CompletionCallback = Box<dyn FnOnce(bool)>;

/// Lifecycle of a [`NavigationPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathState {
    #[default]
    Inactive,
    Active,
    Paused,
}

/// Waypoints toward a destination plus the bookkeeping to follow them.
#[derive(Default)]
pub struct NavigationPath {
    waypoints: Vec<Vec3>,
    index: usize,
    state: PathState,
    final_rotation: Option<Quat>,
    on_complete: Option<CompletionCallback>,
    complete_requested: bool,
    cancel_requested: bool,
    stuck_time: f32,
    last_distance: Option<f32>,
}

impl std::fmt::Debug for NavigationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationPath")
            .field("waypoints", &self.waypoints)
            .field("index", &self.index)
            .field("state", &self.state)
            .field("final_rotation", &self.final_rotation)
            .field("complete_requested", &self.complete_requested)
            .field("cancel_requested", &self.cancel_requested)
            .finish_non_exhaustive()
    }
}

impl NavigationPath {
    pub fn state(&self) -> PathState {
        self.state
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.waypoints.get(self.index).copied()
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }

    pub fn final_rotation(&self) -> Option<Quat> {
        self.final_rotation
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn is_complete_requested(&self) -> bool {
        self.complete_requested
    }

    /// Load a request. The path stays inactive until [`activate`](Self::activate).
    pub(crate) fn setup(
        &mut self,
        waypoints: &[Vec3],
        final_rotation: Option<Quat>,
        on_complete: Option<CompletionCallback>,
    ) {
        self.reset();
        self.waypoints.extend_from_slice(waypoints);
        self.final_rotation = final_rotation;
        self.on_complete = on_complete;
    }

    pub(crate) fn activate(&mut self) {
        if self.state == PathState::Inactive {
            self.state = PathState::Active;
        }
    }

    pub(crate) fn pause(&mut self) -> bool {
        if self.state == PathState::Active {
            self.state = PathState::Paused;
            true
        } else {
            false
        }
    }

    pub(crate) fn resume(&mut self) -> bool {
        if self.state == PathState::Paused {
            self.state = PathState::Active;
            true
        } else {
            false
        }
    }

    pub(crate) fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    pub(crate) fn request_complete(&mut self) {
        self.complete_requested = true;
    }

    /// Step to the next waypoint. Returns false when the current one was the last.
    pub(crate) fn advance(&mut self) -> bool {
        self.last_distance = None;
        self.stuck_time = 0.0;
        if self.index + 1 < self.waypoints.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Accumulate time spent without the distance to the waypoint changing
    /// by more than `tolerance`; returns the accumulated time.
    pub(crate) fn track_progress(&mut self, distance: f32, tolerance: f32, dt: f32) -> f32 {
        match self.last_distance {
            Some(last) if (last - distance).abs() < tolerance => self.stuck_time += dt,
            _ => self.stuck_time = 0.0,
        }
        self.last_distance = Some(distance);
        self.stuck_time
    }

    pub(crate) fn reset_progress(&mut self) {
        self.last_distance = None;
        self.stuck_time = 0.0;
    }

    /// Deactivate and hand back the callback for the caller to invoke.
    pub(crate) fn finish(&mut self) -> Option<CompletionCallback> {
        self.state = PathState::Inactive;
        self.complete_requested = false;
        self.cancel_requested = false;
        self.on_complete.take()
    }

    pub(crate) fn reset(&mut self) {
        self.waypoints.clear();
        self.index = 0;
        self.state = PathState::Inactive;
        self.final_rotation = None;
        self.on_complete = None;
        self.complete_requested = false;
        self.cancel_requested = false;
        self.reset_progress();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_state_transitions() {
        let mut path = NavigationPath::default();
        path.setup(&[Vec3::ZERO, Vec3::X], None, None);
        assert_eq!(path.state(), PathState::Inactive);
        assert!(!path.pause());

        path.activate();
        assert!(path.pause());
        assert_eq!(path.state(), PathState::Paused);
        assert!(!path.pause());
        assert!(path.resume());
        assert_eq!(path.state(), PathState::Active);

        assert!(path.advance());
        assert_eq!(path.current_waypoint(), Some(Vec3::X));
        assert!(!path.advance());
    }

    #[test]
    fn test_finish_hands_out_callback_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut path = NavigationPath::default();
        path.setup(&[Vec3::X], None, Some(Box::new(move |_| counter.set(counter.get() + 1))));
        path.activate();

        if let Some(callback) = path.finish() {
            callback(true);
        }
        assert!(path.finish().is_none());
        assert_eq!(calls.get(), 1);
        assert_eq!(path.state(), PathState::Inactive);
    }

    #[test]
    fn test_progress_tracking() {
        let mut path = NavigationPath::default();
        assert_eq!(path.track_progress(5.0, 1e-3, 0.1), 0.0);
        assert!((path.track_progress(5.0, 1e-3, 0.1) - 0.1).abs() < 1e-6);
        assert!((path.track_progress(5.0, 1e-3, 0.1) - 0.2).abs() < 1e-6);
        assert_eq!(path.track_progress(4.0, 1e-3, 0.1), 0.0);
    }
}
