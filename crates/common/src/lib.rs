//! Shared types for the level-lifecycle core: coordinates, ids, rule enums.
//!
//! # Invariants
//! - Level names compare case-insensitively; `level_key` is the only way to
//!   derive a registry key from a name.
//! - Enum parsing is case-insensitive and whitespace tolerant.

mod dimension;
mod types;

pub use dimension::Dimension;
pub use types::{CHUNK_WIDTH, ChunkPos, Difficulty, EntityId, GameMode, LevelId, ParseError, level_key};
