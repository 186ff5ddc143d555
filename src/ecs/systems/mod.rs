//! ECS systems.

pub mod transform;

pub use transform::{commit_pose, transform_system};
