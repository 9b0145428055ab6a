use crate::block::Block;
use crate::entity::EntityManager;
use crate::provider::{ProviderError, WorldProvider};
use glam::{IVec3, Vec3};
use levelhost_common::{ChunkPos, Difficulty, Dimension, EntityId, GameMode, LevelId, level_key};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Errors from level lifecycle and block access.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("level {name}: {source}")]
    Provider {
        name: String,
        #[source]
        source: ProviderError,
    },
    #[error("level {0} is closed")]
    Closed(String),
}

/// Which simulation clocks run for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickingFlags {
    pub block_ticking: bool,
    pub chunk_ticking: bool,
    pub world_time_started: bool,
}

impl Default for TickingFlags {
    fn default() -> Self {
        Self {
            block_ticking: false,
            chunk_ticking: false,
            world_time_started: true,
        }
    }
}

/// Rules and radii a level is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSettings {
    pub game_mode: GameMode,
    pub difficulty: Difficulty,
    /// Radius in chunks generated around spawn by `initialize`.
    pub view_distance: i32,
    pub ticking: TickingFlags,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            game_mode: GameMode::default(),
            difficulty: Difficulty::default(),
            view_distance: 4,
            ticking: TickingFlags::default(),
        }
    }
}

/// One voxel-world instance with its own backend, rules and lifecycle.
///
/// A level is shared behind `Arc` once built. Its provider sits behind a
/// mutex: block reads, edits and light computation each take it for their
/// whole duration.
#[derive(Debug)]
pub struct Level {
    id: LevelId,
    name: String,
    key: String,
    dimension: Dimension,
    game_mode: GameMode,
    difficulty: Difficulty,
    view_distance: i32,
    world: Mutex<WorldProvider>,
    entities: Arc<EntityManager>,
    /// Registry key of the primary level. Set only on derived dimensions.
    primary: Option<String>,
    block_ticking: AtomicBool,
    chunk_ticking: AtomicBool,
    world_time_started: AtomicBool,
    initialized: AtomicBool,
    closed: AtomicBool,
}

impl Level {
    /// Spawn column; `initialize` generates a square around it.
    pub const SPAWN_CHUNK: ChunkPos = ChunkPos { x: 0, z: 0 };

    pub fn new(
        name: impl Into<String>,
        provider: WorldProvider,
        entities: Arc<EntityManager>,
        settings: LevelSettings,
    ) -> Self {
        let name = name.into();
        Self {
            id: LevelId::new(),
            key: level_key(&name),
            name,
            dimension: provider.dimension(),
            game_mode: settings.game_mode,
            difficulty: settings.difficulty,
            view_distance: settings.view_distance.max(0),
            world: Mutex::new(provider),
            entities,
            primary: None,
            block_ticking: AtomicBool::new(settings.ticking.block_ticking),
            chunk_ticking: AtomicBool::new(settings.ticking.chunk_ticking),
            world_time_started: AtomicBool::new(settings.ticking.world_time_started),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Link this level to the primary level it was derived from.
    pub fn with_primary(mut self, primary: &Level) -> Self {
        self.primary = Some(primary.key.clone());
        self
    }

    /// Identity of this instance; entities are owned by it.
    pub fn id(&self) -> LevelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-folded name used as the registry key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn game_mode(&self) -> GameMode {
        self.game_mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn view_distance(&self) -> i32 {
        self.view_distance
    }

    /// Registry key of the primary level, for derived dimensions.
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn settings(&self) -> LevelSettings {
        LevelSettings {
            game_mode: self.game_mode,
            difficulty: self.difficulty,
            view_distance: self.view_distance,
            ticking: self.ticking(),
        }
    }

    pub fn ticking(&self) -> TickingFlags {
        TickingFlags {
            block_ticking: self.block_ticking.load(Ordering::Relaxed),
            chunk_ticking: self.chunk_ticking.load(Ordering::Relaxed),
            world_time_started: self.world_time_started.load(Ordering::Relaxed),
        }
    }

    pub fn set_block_ticking(&self, enabled: bool) {
        self.block_ticking.store(enabled, Ordering::Relaxed);
    }

    pub fn set_chunk_ticking(&self, enabled: bool) {
        self.chunk_ticking.store(enabled, Ordering::Relaxed);
    }

    pub fn set_world_time_started(&self, started: bool) {
        self.world_time_started.store(started, Ordering::Relaxed);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn entities(&self) -> &Arc<EntityManager> {
        &self.entities
    }

    /// Exclusive access to the backend. Held for the guard's lifetime.
    pub fn lock_world(&self) -> MutexGuard<'_, WorldProvider> {
        self.world.lock()
    }

    fn provider_error(&self, source: ProviderError) -> LevelError {
        LevelError::Provider {
            name: self.name.clone(),
            source,
        }
    }

    fn ensure_open(&self) -> Result<(), LevelError> {
        if self.is_closed() {
            return Err(LevelError::Closed(self.name.clone()));
        }
        Ok(())
    }

    /// World-generation bootstrap: initialize the backend and generate every
    /// column within `view_distance` of the spawn column.
    pub fn initialize(&self) -> Result<(), LevelError> {
        self.ensure_open()?;
        let _span = tracing::info_span!("level_initialize", level = %self.name).entered();
        let mut world = self.world.lock();
        world.initialize().map_err(|e| self.provider_error(e))?;
        for pos in Self::SPAWN_CHUNK.square(self.view_distance) {
            world.chunk(pos).map_err(|e| self.provider_error(e))?;
        }
        self.initialized.store(true, Ordering::Release);
        tracing::info!(
            dimension = %self.dimension,
            chunks = world.cached_chunk_count(),
            light_sources = world.light_sources().len(),
            "level initialized"
        );
        Ok(())
    }

    /// Release backend resources. The first successful call saves and drops
    /// the chunk cache, then unregisters this level's entities; later calls
    /// return `Ok(false)` without touching anything.
    ///
    /// If saving fails the level stays open with its cache intact, so a
    /// later `close` retries the save.
    pub fn close(&self) -> Result<bool, LevelError> {
        let mut world = self.world.lock();
        if self.is_closed() {
            return Ok(false);
        }
        world.close().map_err(|e| self.provider_error(e))?;
        self.closed.store(true, Ordering::Release);
        drop(world);

        let removed = self.entities.unregister_level(self.id);
        tracing::info!(level = %self.name, id = %self.id, entities_removed = removed, "level closed");
        Ok(true)
    }

    pub fn get_block(&self, pos: IVec3) -> Result<Block, LevelError> {
        self.ensure_open()?;
        self.world.lock().get_block(pos).map_err(|e| self.provider_error(e))
    }

    pub fn set_block(&self, pos: IVec3, block: Block) -> Result<(), LevelError> {
        self.ensure_open()?;
        self.world
            .lock()
            .set_block(pos, block)
            .map_err(|e| self.provider_error(e))
    }

    /// Sky light at a cached coordinate.
    pub fn sky_light(&self, pos: IVec3) -> Option<u8> {
        self.world.lock().sky_light_at(pos)
    }

    /// Block light at a cached coordinate.
    pub fn block_light(&self, pos: IVec3) -> Option<u8> {
        self.world.lock().block_light_at(pos)
    }

    pub fn light_sources(&self) -> Vec<IVec3> {
        self.world.lock().light_sources().to_vec()
    }

    /// Cached chunk columns, sorted. Diagnostic only.
    pub fn cached_chunks(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<ChunkPos> = self.world.lock().cached_chunks().map(|(p, _)| p).collect();
        positions.sort();
        positions
    }

    pub fn add_entity(&self, kind: &str, position: Vec3) -> Result<EntityId, LevelError> {
        self.ensure_open()?;
        Ok(self.entities.register(self.id, kind, position))
    }

    pub fn remove_entity(&self, id: EntityId) -> bool {
        self.entities.unregister_in(self.id, id).is_some()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.count_in(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{FlatGenerator, Generator};
    use crate::provider::tests::MemoryStore;

    fn flat_level(name: &str, view_distance: i32) -> Level {
        Level::new(
            name,
            WorldProvider::flat(FlatGenerator::default()),
            Arc::new(EntityManager::new()),
            LevelSettings {
                view_distance,
                ..LevelSettings::default()
            },
        )
    }

    #[test]
    fn initialize_generates_spawn_square() {
        let level = flat_level("World", 1);
        assert!(!level.is_initialized());
        level.initialize().unwrap();
        assert!(level.is_initialized());
        assert_eq!(level.cached_chunks().len(), 9);
        assert_eq!(level.key(), "world");
        assert_eq!(level.dimension(), Dimension::Overworld);
    }

    #[test]
    fn settings_are_carried() {
        let level = Level::new(
            "Creative",
            WorldProvider::air(),
            Arc::new(EntityManager::new()),
            LevelSettings {
                game_mode: GameMode::Creative,
                difficulty: Difficulty::Hard,
                view_distance: 0,
                ticking: TickingFlags {
                    block_ticking: true,
                    chunk_ticking: false,
                    world_time_started: false,
                },
            },
        );
        assert_eq!(level.game_mode(), GameMode::Creative);
        assert_eq!(level.difficulty(), Difficulty::Hard);
        assert!(level.ticking().block_ticking);
        level.set_chunk_ticking(true);
        assert!(level.settings().ticking.chunk_ticking);
    }

    #[test]
    fn close_is_idempotent_and_blocks_access() {
        let level = flat_level("w", 0);
        level.initialize().unwrap();
        level.add_entity("player", Vec3::ZERO).unwrap();
        assert_eq!(level.entity_count(), 1);
        assert!(level.close().unwrap());
        assert!(!level.close().unwrap());
        assert!(level.is_closed());
        assert_eq!(level.entity_count(), 0);
        assert!(matches!(level.get_block(IVec3::ZERO), Err(LevelError::Closed(_))));
        assert!(matches!(level.initialize(), Err(LevelError::Closed(_))));
    }

    #[test]
    fn derived_level_points_at_primary_key() {
        let primary = flat_level("Overworld", 0);
        let store = MemoryStore {
            dimension: Dimension::Nether,
            ..MemoryStore::new(vec![Dimension::Nether])
        };
        let nether = Level::new(
            "Overworld_nether",
            WorldProvider::anvil(Box::new(store), Generator::Air),
            Arc::clone(primary.entities()),
            primary.settings(),
        )
        .with_primary(&primary);
        assert_eq!(nether.primary(), Some("overworld"));
        assert_eq!(nether.dimension(), Dimension::Nether);
        assert_eq!(primary.primary(), None);
    }

    #[test]
    fn entities_are_scoped_to_level() {
        let entities = Arc::new(EntityManager::new());
        let a = Level::new("a", WorldProvider::air(), Arc::clone(&entities), LevelSettings::default());
        let b = Level::new("b", WorldProvider::air(), Arc::clone(&entities), LevelSettings::default());
        let id = a.add_entity("player", Vec3::ONE).unwrap();
        assert!(!b.remove_entity(id));
        assert!(a.remove_entity(id));
        assert_eq!(entities.len(), 0);
    }

    #[test]
    fn same_name_instances_own_separate_entities() {
        let entities = Arc::new(EntityManager::new());
        let a = Level::new("arena", WorldProvider::air(), Arc::clone(&entities), LevelSettings::default());
        let b = Level::new("Arena", WorldProvider::air(), Arc::clone(&entities), LevelSettings::default());
        assert_ne!(a.id(), b.id());
        a.add_entity("zombie", Vec3::ZERO).unwrap();
        b.add_entity("skeleton", Vec3::ZERO).unwrap();
        assert_eq!(a.entity_count(), 1);

        a.close().unwrap();
        assert_eq!(b.entity_count(), 1);
        assert_eq!(entities.len(), 1);
    }

    #[test]
    fn failed_save_keeps_level_open_for_retry() {
        let store = MemoryStore::new(vec![]);
        let fail_flush = Arc::clone(&store.fail_flush);
        let chunks = Arc::clone(&store.chunks);
        let level = Level::new(
            "fragile",
            WorldProvider::anvil(Box::new(store), Generator::Air).with_save(true),
            Arc::new(EntityManager::new()),
            LevelSettings {
                view_distance: 0,
                ..LevelSettings::default()
            },
        );
        level.initialize().unwrap();
        level.add_entity("villager", Vec3::ZERO).unwrap();
        level.set_block(IVec3::new(1, 1, 1), Block::Stone).unwrap();

        fail_flush.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(level.close().is_err());
        assert!(!level.is_closed());
        assert_eq!(level.entity_count(), 1);
        assert_eq!(level.get_block(IVec3::new(1, 1, 1)).unwrap(), Block::Stone);

        fail_flush.store(false, std::sync::atomic::Ordering::SeqCst);
        assert!(level.close().unwrap());
        assert!(level.is_closed());
        assert_eq!(level.entity_count(), 0);
        assert!(chunks.lock().contains_key(&ChunkPos::new(0, 0)));
        assert!(!level.close().unwrap());
    }

    #[test]
    fn out_of_height_is_a_provider_error() {
        let level = flat_level("w", 0);
        let err = level.get_block(IVec3::new(0, 500, 0)).unwrap_err();
        assert!(matches!(
            err,
            LevelError::Provider {
                source: ProviderError::OutOfHeight(500),
                ..
            }
        ));
    }
}
