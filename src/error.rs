//! Error types for body setup and shape validation.

use thiserror::Error;

use crate::world::BodyId;

/// A collision shape that cannot drive a movable body.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    #[error("unsupported collision shape for a movable body: {0}")]
    Unsupported(&'static str),
    #[error("invalid {shape} dimensions: {reason}")]
    InvalidDimensions {
        shape: &'static str,
        reason: &'static str,
    },
}

/// Errors raised while setting up movable bodies.
#[derive(Debug, Error)]
pub enum MotionError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: hecs::Entity,
        component: &'static str,
    },
    #[error("entity {0:?} is already driven by a movable body")]
    AlreadyMovable(hecs::Entity),
    #[error("entity {0:?} has a static rigid body and cannot be moved")]
    StaticBody(hecs::Entity),
    #[error("unknown movable body {0:?}")]
    UnknownBody(BodyId),
    #[error(transparent)]
    Despawned(#[from] hecs::NoSuchEntity),
}

pub type Result<T, E = MotionError> = std::result::Result<T, E>;
