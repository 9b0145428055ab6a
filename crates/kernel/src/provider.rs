//! World providers: the backend that owns a level's chunks.
//!
//! A provider is a chunk cache in front of a terrain [`Generator`] and,
//! for the persisted (anvil) variant, a [`ChunkStore`]. Chunks the store has
//! never seen are produced by the fallback generator. Every newly materialized
//! chunk contributes its emitting blocks to the provider's light sources.

use crate::block::Block;
use crate::chunk::{CHUNK_HEIGHT, Chunk, ChunkDecodeError};
use crate::generator::{CoolGenerator, ExperimentalGenerator, FlatGenerator, Generator};
use glam::IVec3;
use levelhost_common::{ChunkPos, Dimension};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

/// Boxed error type returned by chunk store implementations.
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// Persistent chunk storage for one dimension of a world.
pub trait ChunkStore: Send {
    /// Root directory shared by every dimension of the world.
    fn base_path(&self) -> &Path;

    /// Dimension this store reads and writes.
    fn dimension(&self) -> Dimension;

    /// Whether the world on disk has data for `dimension`.
    fn has_dimension(&self, dimension: Dimension) -> bool;

    fn load_chunk(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StorageError>;

    fn save_chunk(&mut self, chunk: &Chunk) -> Result<(), StorageError>;

    /// Write any buffered state to disk.
    fn flush(&mut self) -> Result<(), StorageError>;
}

/// Errors from world provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("chunk storage error: {0}")]
    Storage(#[source] StorageError),
    #[error(transparent)]
    Decode(#[from] ChunkDecodeError),
    #[error("y={0} is outside the world height")]
    OutOfHeight(i32),
}

/// Which backend variant a provider is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Flat,
    Anvil,
    Cool,
    Experimental,
    Air,
}

impl ProviderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Anvil => "anvil",
            Self::Cool => "cool",
            Self::Experimental => "experimental",
            Self::Air => "air",
        }
    }
}

/// The backend powering one level. Exclusively owned by that level.
pub struct WorldProvider {
    kind: ProviderKind,
    dimension: Dimension,
    generator: Generator,
    store: Option<Box<dyn ChunkStore>>,
    read_sky_light: bool,
    read_block_light: bool,
    save_enabled: bool,
    chunks: HashMap<ChunkPos, Chunk>,
    light_sources: Vec<IVec3>,
    initialized: bool,
}

impl std::fmt::Debug for WorldProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldProvider")
            .field("kind", &self.kind)
            .field("dimension", &self.dimension)
            .field("generator", &self.generator.name())
            .field("base_path", &self.base_path())
            .field("cached_chunks", &self.chunks.len())
            .field("light_sources", &self.light_sources.len())
            .finish()
    }
}

impl WorldProvider {
    fn with_generator(kind: ProviderKind, generator: Generator) -> Self {
        Self {
            kind,
            dimension: Dimension::Overworld,
            generator,
            store: None,
            read_sky_light: true,
            read_block_light: true,
            save_enabled: false,
            chunks: HashMap::new(),
            light_sources: Vec::new(),
            initialized: false,
        }
    }

    pub fn flat(generator: FlatGenerator) -> Self {
        Self::with_generator(ProviderKind::Flat, Generator::Flat(generator))
    }

    pub fn cool(seed: u64) -> Self {
        Self::with_generator(ProviderKind::Cool, Generator::Cool(CoolGenerator::new(seed)))
    }

    pub fn experimental(seed: u64) -> Self {
        Self::with_generator(
            ProviderKind::Experimental,
            Generator::Experimental(ExperimentalGenerator::new(seed)),
        )
    }

    pub fn air() -> Self {
        Self::with_generator(ProviderKind::Air, Generator::Air)
    }

    /// Persisted regions from `store`, with `fallback` for chunks never saved.
    /// The provider's dimension is the store's.
    pub fn anvil(store: Box<dyn ChunkStore>, fallback: Generator) -> Self {
        let dimension = store.dimension();
        Self {
            dimension,
            store: Some(store),
            ..Self::with_generator(ProviderKind::Anvil, fallback)
        }
    }

    /// Whether stored sky and block light are trusted on load. A channel
    /// that is not read is zeroed so it can be recomputed.
    pub fn with_light_reads(mut self, sky: bool, block: bool) -> Self {
        self.read_sky_light = sky;
        self.read_block_light = block;
        self
    }

    pub fn with_save(mut self, enabled: bool) -> Self {
        self.save_enabled = enabled;
        self
    }

    /// Override the dimension of a generator-only provider. Ignored for
    /// stored providers, whose dimension is fixed by their store.
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        if self.store.is_none() {
            self.dimension = dimension;
        }
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.store.as_ref().map(|s| s.base_path())
    }

    pub fn read_sky_light(&self) -> bool {
        self.read_sky_light
    }

    pub fn read_block_light(&self) -> bool {
        self.read_block_light
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn initialize(&mut self) -> Result<(), ProviderError> {
        if self.initialized {
            return Ok(());
        }
        tracing::debug!(
            kind = self.kind.as_str(),
            dimension = %self.dimension,
            generator = self.generator.name(),
            base_path = ?self.base_path(),
            "initializing world provider"
        );
        self.initialized = true;
        Ok(())
    }

    pub fn has_nether(&self) -> bool {
        self.store
            .as_ref()
            .is_some_and(|s| s.has_dimension(Dimension::Nether))
    }

    pub fn has_the_end(&self) -> bool {
        self.store
            .as_ref()
            .is_some_and(|s| s.has_dimension(Dimension::TheEnd))
    }

    pub fn supports(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Overworld => true,
            Dimension::Nether => self.has_nether(),
            Dimension::TheEnd => self.has_the_end(),
        }
    }

    /// Emitting blocks found in every chunk materialized so far.
    pub fn light_sources(&self) -> &[IVec3] {
        &self.light_sources
    }

    /// Get a chunk, loading it from the store or generating it on a miss.
    pub fn chunk(&mut self, pos: ChunkPos) -> Result<&mut Chunk, ProviderError> {
        match self.chunks.entry(pos) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let stored = match self.store.as_mut() {
                    Some(store) => store.load_chunk(pos).map_err(ProviderError::Storage)?,
                    None => None,
                };
                let chunk = match stored {
                    Some(mut chunk) => {
                        if !self.read_sky_light {
                            chunk.clear_sky_light();
                        }
                        if !self.read_block_light {
                            chunk.clear_block_light();
                        }
                        tracing::trace!(%pos, "loaded stored chunk");
                        chunk
                    }
                    None => {
                        tracing::trace!(%pos, generator = self.generator.name(), "generating chunk");
                        self.generator.generate(pos, self.dimension)
                    }
                };
                self.light_sources.extend(chunk.emitters());
                Ok(e.insert(chunk))
            }
        }
    }

    pub fn cached_chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn cached_chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }

    pub fn cached_chunks(&self) -> impl Iterator<Item = (ChunkPos, &Chunk)> {
        self.chunks.iter().map(|(pos, chunk)| (*pos, chunk))
    }

    pub fn cached_chunks_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Block at a world coordinate, if its chunk is cached and y is in range.
    pub fn block_at(&self, pos: IVec3) -> Option<Block> {
        let chunk = self.chunks.get(&ChunkPos::of_block(pos))?;
        chunk.to_local(pos).map(|local| chunk.block(local))
    }

    pub fn sky_light_at(&self, pos: IVec3) -> Option<u8> {
        let chunk = self.chunks.get(&ChunkPos::of_block(pos))?;
        chunk.to_local(pos).map(|local| chunk.sky_light(local))
    }

    pub fn block_light_at(&self, pos: IVec3) -> Option<u8> {
        let chunk = self.chunks.get(&ChunkPos::of_block(pos))?;
        chunk.to_local(pos).map(|local| chunk.block_light(local))
    }

    /// Write block light at a cached coordinate. Returns false if not cached.
    pub fn set_block_light_at(&mut self, pos: IVec3, value: u8) -> bool {
        let Some(chunk) = self.chunks.get_mut(&ChunkPos::of_block(pos)) else {
            return false;
        };
        match chunk.to_local(pos) {
            Some(local) => {
                chunk.set_block_light(local, value);
                true
            }
            None => false,
        }
    }

    /// Block at a world coordinate, materializing its chunk if needed.
    pub fn get_block(&mut self, pos: IVec3) -> Result<Block, ProviderError> {
        if !(0..CHUNK_HEIGHT).contains(&pos.y) {
            return Err(ProviderError::OutOfHeight(pos.y));
        }
        let chunk = self.chunk(ChunkPos::of_block(pos))?;
        let local = pos - chunk.pos().origin(0);
        Ok(chunk.block(local))
    }

    /// Place a block, materializing its chunk if needed. Emitting blocks
    /// join the light sources.
    pub fn set_block(&mut self, pos: IVec3, block: Block) -> Result<(), ProviderError> {
        if !(0..CHUNK_HEIGHT).contains(&pos.y) {
            return Err(ProviderError::OutOfHeight(pos.y));
        }
        let chunk = self.chunk(ChunkPos::of_block(pos))?;
        let local = pos - chunk.pos().origin(0);
        chunk.set_block(local, block);
        if block.emission() > 0 {
            self.light_sources.push(pos);
        }
        Ok(())
    }

    /// Write dirty chunks to the store. Returns how many were written.
    pub fn save(&mut self) -> Result<usize, ProviderError> {
        let Some(store) = self.store.as_mut() else {
            return Ok(0);
        };
        if !self.save_enabled {
            return Ok(0);
        }
        let mut written = 0;
        for chunk in self.chunks.values_mut().filter(|c| c.is_dirty()) {
            store.save_chunk(chunk).map_err(ProviderError::Storage)?;
            chunk.mark_clean();
            written += 1;
        }
        store.flush().map_err(ProviderError::Storage)?;
        tracing::debug!(written, dimension = %self.dimension, "saved chunks");
        Ok(written)
    }

    /// Save, then drop the chunk cache and the collected light sources.
    pub fn close(&mut self) -> Result<(), ProviderError> {
        self.save()?;
        self.chunks.clear();
        self.light_sources.clear();
        Ok(())
    }
}
