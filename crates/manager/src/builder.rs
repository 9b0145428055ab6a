use crate::config::{Config, keys};
use crate::error::ManagerError;
use crate::factory::WorldProviderFactory;
use levelhost_common::{Difficulty, GameMode};
use levelhost_kernel::{EntityManager, Level, LevelSettings, TickingFlags, WorldProvider};
use levelhost_light::LightEngine;
use std::sync::Arc;

/// Everything needed to turn a name into a ready level: configuration, the
/// provider factory, and the entity and light services levels share.
///
/// Registries and pools each own one; it is cheap to clone and `Sync`, so
/// parallel pool construction calls it from worker threads.
#[derive(Debug, Clone)]
pub struct LevelBuilder {
    config: Arc<Config>,
    factory: WorldProviderFactory,
    entities: Arc<EntityManager>,
    light: Arc<LightEngine>,
    settings: LevelSettings,
    calculate_lights: bool,
}

impl LevelBuilder {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            factory: WorldProviderFactory::from_config(&config),
            settings: settings_from_config(&config),
            calculate_lights: config.get(keys::CALCULATE_LIGHTS, false),
            entities: Arc::new(EntityManager::new()),
            light: Arc::new(LightEngine::new()),
            config,
        }
    }

    pub fn with_entities(mut self, entities: Arc<EntityManager>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_light_engine(mut self, light: Arc<LightEngine>) -> Self {
        self.light = light;
        self
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn factory(&self) -> &WorldProviderFactory {
        &self.factory
    }

    pub fn entities(&self) -> &Arc<EntityManager> {
        &self.entities
    }

    pub fn light_engine(&self) -> &Arc<LightEngine> {
        &self.light
    }

    pub fn settings(&self) -> LevelSettings {
        self.settings
    }

    pub fn calculate_lights(&self) -> bool {
        self.calculate_lights
    }

    /// Provider tag from configuration, `anvil` when unset.
    pub fn provider_tag(&self) -> String {
        self.config.get(keys::WORLD_PROVIDER, String::from("anvil"))
    }

    /// Construct, initialize and (when `CalculateLights` is on) light a level.
    /// Without an explicit provider the default stored backend is used.
    pub fn create_level(
        &self,
        name: &str,
        provider: Option<WorldProvider>,
    ) -> Result<Arc<Level>, ManagerError> {
        let provider = match provider {
            Some(provider) => provider,
            None => self.factory.default_provider(name)?,
        };
        let level = Level::new(name, provider, Arc::clone(&self.entities), self.settings);
        self.finish(level)
    }

    /// Shared tail of every build: initialize, then light if enabled. A
    /// failure closes the half-built level before the error is returned.
    pub(crate) fn finish(&self, level: Level) -> Result<Arc<Level>, ManagerError> {
        if let Err(e) = self.prepare(&level) {
            tracing::warn!(level = %level.name(), error = %e, "level build failed, discarding");
            if let Err(close) = level.close() {
                tracing::warn!(level = %level.name(), error = %close, "close after failed build");
            }
            return Err(e);
        }
        Ok(Arc::new(level))
    }

    fn prepare(&self, level: &Level) -> Result<(), ManagerError> {
        level.initialize()?;
        if self.calculate_lights {
            self.light.calculate(level)?;
        }
        Ok(())
    }
}

/// Per-level rules read from configuration.
pub fn settings_from_config(config: &Config) -> LevelSettings {
    let defaults = LevelSettings::default();
    LevelSettings {
        game_mode: config.get(keys::GAME_MODE, GameMode::Survival),
        difficulty: config.get(keys::DIFFICULTY, Difficulty::Normal),
        view_distance: config.get(keys::VIEW_DISTANCE, defaults.view_distance),
        ticking: TickingFlags {
            block_ticking: config.get(keys::ENABLE_BLOCK_TICKING, false),
            chunk_ticking: config.get(keys::ENABLE_CHUNK_TICKING, false),
            world_time_started: config.get(keys::IS_WORLD_TIME_STARTED, true),
        },
    }
}
