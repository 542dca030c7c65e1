//! motocol: uniform-grid collision over static 2D level lines (broad phase,
//! wheel contacts, tracked point entities)

pub mod types;
pub mod api;
pub mod config;
pub mod error;
pub mod narrowphase;
pub mod system;
mod entities;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::config::{CollisionConfig, LineCulling, SurfaceConfig};
pub use crate::error::{CollisionError, ConfigError};
pub use crate::narrowphase::Narrowphase;
pub use crate::system::CollisionSystem;
