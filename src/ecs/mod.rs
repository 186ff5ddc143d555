//! hecs components and systems shared by the collision queries and movable bodies.

pub mod components;
pub mod systems;

pub mod prelude {
    pub use super::components::*;
    pub use super::systems::transform_system;
}
