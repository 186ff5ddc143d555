//! Waypoint navigation on top of movable bodies.
//!
//! Paths come from a [`NavMesh`] when one is installed and fall back to a
//! straight line otherwise. They are pooled in a [`PathPool`] and driven one
//! tick at a time by each body's [`Navigator`].

pub mod agent;
pub mod mesh;
pub mod path;
pub mod pool;

pub use self::agent::{NavigationConfig, Navigator, TurnPolicy};
pub use self::mesh::{plan_path, DirectPath, NavMesh};
pub use self::path::{CompletionCallback, NavigationPath, PathState};
pub use self::pool::{PathHandle, PathPool};
