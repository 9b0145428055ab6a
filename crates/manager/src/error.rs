use crate::config::ConfigError;
use levelhost_common::Dimension;
use levelhost_kernel::LevelError;
use levelhost_light::LightError;
use levelhost_persist::StoreError;

/// Errors surfaced by level registries, pools and the dimension resolver.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The overworld is the level itself; only secondary dimensions derive.
    #[error("{dimension} is the primary dimension of {level} and cannot be derived")]
    PrimaryDimension { level: String, dimension: Dimension },
    #[error("a level pool needs at least one level")]
    EmptyPool,
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Light(#[from] LightError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
