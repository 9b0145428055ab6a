//! Level lifecycle for a multi-level voxel server.
//!
//! A [`LevelManager`] builds levels by name on first request and caches
//! them; a [`LevelPool`] pre-builds a fixed set and spreads requests over
//! it. Both build through a [`LevelBuilder`], which picks a backend with the
//! [`WorldProviderFactory`], initializes the level and lights it when
//! `CalculateLights` is set. Secondary dimensions are derived on demand
//! with [`derive_dimension`].

mod builder;
pub mod config;
mod dimension;
mod error;
mod events;
mod factory;
mod pool;
mod registry;
mod source;

pub use builder::{LevelBuilder, settings_from_config};
pub use config::{Config, ConfigError};
pub use dimension::{derive_dimension, dimension_name};
pub use error::ManagerError;
pub use events::{LevelEvent, Subscribers};
pub use factory::{ProviderTag, WorldProviderFactory};
pub use pool::LevelPool;
pub use registry::LevelManager;
pub use source::{LevelSource, LevelStrategy, level_source_from_config};
