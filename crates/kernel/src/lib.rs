//! Voxel kernel: blocks, chunk columns, world providers, levels and the
//! shared entity-registration service.
//!
//! # Invariants
//! - A level's provider is exclusively owned by that level.
//! - Light values are always in `0..=15`.
//! - Every chunk a provider materializes contributes its emitting blocks to
//!   the provider's light sources.

pub mod block;
pub mod chunk;
pub mod entity;
pub mod generator;
pub mod level;
pub mod provider;

pub use block::{Block, MAX_LIGHT};
pub use chunk::{CHUNK_HEIGHT, Chunk, ChunkDecodeError, ChunkRecord};
pub use entity::{EntityManager, EntityRecord};
pub use generator::{CoolGenerator, ExperimentalGenerator, FlatGenerator, Generator};
pub use level::{Level, LevelError, LevelSettings, TickingFlags};
pub use provider::{ChunkStore, ProviderError, ProviderKind, StorageError, WorldProvider};
