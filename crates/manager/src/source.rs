use crate::builder::LevelBuilder;
use crate::config::{Config, keys};
use crate::error::ManagerError;
use crate::pool::LevelPool;
use crate::registry::LevelManager;
use levelhost_common::{Dimension, EntityId};
use levelhost_kernel::Level;
use std::str::FromStr;
use std::sync::Arc;

/// How a server hands out levels to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelStrategy {
    /// Build by name on first request ([`LevelManager`]).
    #[default]
    OnDemand,
    /// Spread players over a pre-built pool ([`LevelPool`]).
    Pooled,
}

impl FromStr for LevelStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "ondemand" | "on_demand" => Ok(Self::OnDemand),
            "pool" | "pooled" | "spread" => Ok(Self::Pooled),
            other => Err(format!("unknown level strategy: {other}")),
        }
    }
}

/// Common surface of level registries and pools.
pub trait LevelSource: Send + Sync {
    fn strategy(&self) -> LevelStrategy;

    fn get_level(&self, requester: EntityId, name: &str) -> Result<Arc<Level>, ManagerError>;

    fn remove_level(&self, level: &Arc<Level>) -> Result<(), ManagerError>;

    fn get_dimension(
        &self,
        level: &Level,
        dimension: Dimension,
    ) -> Result<Option<Arc<Level>>, ManagerError>;

    fn levels(&self) -> Vec<Arc<Level>>;

    fn builder(&self) -> &LevelBuilder;
}

impl LevelSource for LevelManager {
    fn strategy(&self) -> LevelStrategy {
        LevelStrategy::OnDemand
    }

    fn get_level(&self, requester: EntityId, name: &str) -> Result<Arc<Level>, ManagerError> {
        LevelManager::get_level(self, requester, name)
    }

    fn remove_level(&self, level: &Arc<Level>) -> Result<(), ManagerError> {
        LevelManager::remove_level(self, level)
    }

    fn get_dimension(
        &self,
        level: &Level,
        dimension: Dimension,
    ) -> Result<Option<Arc<Level>>, ManagerError> {
        LevelManager::get_dimension(self, level, dimension)
    }

    fn levels(&self) -> Vec<Arc<Level>> {
        LevelManager::levels(self)
    }

    fn builder(&self) -> &LevelBuilder {
        LevelManager::builder(self)
    }
}

impl LevelSource for LevelPool {
    fn strategy(&self) -> LevelStrategy {
        LevelStrategy::Pooled
    }

    fn get_level(&self, requester: EntityId, name: &str) -> Result<Arc<Level>, ManagerError> {
        LevelPool::get_level(self, requester, name)
    }

    fn remove_level(&self, level: &Arc<Level>) -> Result<(), ManagerError> {
        LevelPool::remove_level(self, level)
    }

    fn get_dimension(
        &self,
        level: &Level,
        dimension: Dimension,
    ) -> Result<Option<Arc<Level>>, ManagerError> {
        LevelPool::get_dimension(self, level, dimension)
    }

    fn levels(&self) -> Vec<Arc<Level>> {
        LevelPool::levels(self).to_vec()
    }

    fn builder(&self) -> &LevelBuilder {
        LevelPool::builder(self)
    }
}

/// Pick a registry or a pool from the `LevelStrategy` key. Pools take their
/// size from `LevelPoolSize`.
pub fn level_source_from_config(config: Arc<Config>) -> Result<Box<dyn LevelSource>, ManagerError> {
    let strategy = config.get(keys::LEVEL_STRATEGY, LevelStrategy::OnDemand);
    let builder = LevelBuilder::new(Arc::clone(&config));
    let source: Box<dyn LevelSource> = match strategy {
        LevelStrategy::OnDemand => Box::new(LevelManager::new(builder)),
        LevelStrategy::Pooled => {
            let size = config.get(keys::LEVEL_POOL_SIZE, 4usize);
            Box::new(LevelPool::new(builder, size)?)
        }
    };
    tracing::info!(?strategy, "level source ready");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> Config {
        Config::new()
            .with(keys::WORLD_FOLDER, dir.display())
            .with(keys::VIEW_DISTANCE, 0)
    }

    #[test]
    fn strategy_parses() {
        assert_eq!("Default".parse::<LevelStrategy>(), Ok(LevelStrategy::OnDemand));
        assert_eq!(" pool ".parse::<LevelStrategy>(), Ok(LevelStrategy::Pooled));
        assert!("roundrobin".parse::<LevelStrategy>().is_err());
    }

    #[test]
    fn default_strategy_is_on_demand() {
        let tmp = tempfile::tempdir().unwrap();
        let source = level_source_from_config(Arc::new(config(tmp.path()))).unwrap();
        assert_eq!(source.strategy(), LevelStrategy::OnDemand);
        assert!(source.levels().is_empty());
        let level = source.get_level(EntityId::new(), "hub").unwrap();
        assert_eq!(level.name(), "hub");
        assert_eq!(source.levels().len(), 1);
    }

    #[test]
    fn pooled_strategy_prebuilds() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path())
            .with(keys::LEVEL_STRATEGY, "pool")
            .with(keys::LEVEL_POOL_SIZE, 2);
        let source = level_source_from_config(Arc::new(config)).unwrap();
        assert_eq!(source.strategy(), LevelStrategy::Pooled);
        assert_eq!(source.levels().len(), 2);
        let level = source.get_level(EntityId::new(), "hub").unwrap();
        assert!(level.name().starts_with("Default"));
    }
}
