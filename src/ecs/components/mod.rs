//! ECS components (transform, collision geometry, surface markers).

pub mod physics;
pub mod transform;

pub use physics::*;
pub use transform::*;
