use thiserror::Error;

use crate::types::EntityKey;

/// Errors raised by the collision system.
#[derive(Error, Debug)]
pub enum CollisionError {
    /// `set_dims` called on a system that already has a grid; call `reset` first.
    #[error("grid already defined, reset the collision system before re-dimensioning")]
    GridAlreadyDefined,

    /// The cell array for a new level could not be allocated.
    #[error("failed to allocate {cells} grid cells")]
    GridAllocation { cells: usize },

    #[error("entity {0} is not tracked")]
    EntityNotFound(EntityKey),

    #[error("entity {0} is already tracked")]
    DuplicateEntity(EntityKey),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
