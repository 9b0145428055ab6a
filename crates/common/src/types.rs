use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Width of a chunk column along X and Z, in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// Errors from parsing configuration values into shared types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown game mode: {0:?}")]
    GameMode(String),
    #[error("unknown difficulty: {0:?}")]
    Difficulty(String),
    #[error("unknown dimension: {0:?}")]
    Dimension(String),
}

/// Unique identifier for an entity registered with a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one level instance. Two levels with the same name (a
/// rebuilt primary, repeated dimension derivations) never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelId(pub Uuid);

impl LevelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LevelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Horizontal coordinate of a chunk column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The column containing a block coordinate.
    pub fn of_block(pos: IVec3) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_WIDTH),
            z: pos.z.div_euclid(CHUNK_WIDTH),
        }
    }

    /// World coordinate of the column's (0, y, 0) corner.
    pub fn origin(self, y: i32) -> IVec3 {
        IVec3::new(self.x * CHUNK_WIDTH, y, self.z * CHUNK_WIDTH)
    }

    /// Every column in the square of `radius` around `self`, row-major.
    pub fn square(self, radius: i32) -> impl Iterator<Item = ChunkPos> {
        (-radius..=radius).flat_map(move |dz| {
            (-radius..=radius).map(move |dx| ChunkPos::new(self.x + dx, self.z + dz))
        })
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Registry key for a level name. Names are compared case-insensitively.
pub fn level_key(name: &str) -> String {
    name.to_lowercase()
}

/// Player rules applied to a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Survival => "survival",
            Self::Creative => "creative",
            Self::Adventure => "adventure",
            Self::Spectator => "spectator",
        }
    }
}

impl FromStr for GameMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "survival" | "0" => Ok(Self::Survival),
            "creative" | "1" => Ok(Self::Creative),
            "adventure" | "2" => Ok(Self::Adventure),
            "spectator" | "3" => Ok(Self::Spectator),
            _ => Err(ParseError::GameMode(s.to_string())),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mob and damage rules applied to a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Peaceful,
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Peaceful => "peaceful",
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peaceful" | "0" => Ok(Self::Peaceful),
            "easy" | "1" => Ok(Self::Easy),
            "normal" | "2" => Ok(Self::Normal),
            "hard" | "3" => Ok(Self::Hard),
            _ => Err(ParseError::Difficulty(s.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn chunk_pos_of_negative_block() {
        assert_eq!(ChunkPos::of_block(IVec3::new(-1, 10, 15)), ChunkPos::new(-1, 0));
        assert_eq!(ChunkPos::of_block(IVec3::new(16, 0, -17)), ChunkPos::new(1, -2));
        assert_eq!(ChunkPos::new(-1, 2).origin(5), IVec3::new(-16, 5, 32));
    }

    #[test]
    fn square_covers_radius() {
        let cols: Vec<ChunkPos> = ChunkPos::new(0, 0).square(1).collect();
        assert_eq!(cols.len(), 9);
        assert!(cols.contains(&ChunkPos::new(-1, 1)));
        assert_eq!(ChunkPos::new(3, 3).square(0).count(), 1);
    }

    #[test]
    fn level_key_ignores_case() {
        assert_eq!(level_key("World"), level_key("wORLD"));
        assert_ne!(level_key("world"), level_key("world2"));
    }

    #[test]
    fn game_mode_parses_names_and_numbers() {
        assert_eq!(" Creative ".parse::<GameMode>(), Ok(GameMode::Creative));
        assert_eq!("3".parse::<GameMode>(), Ok(GameMode::Spectator));
        assert!("god".parse::<GameMode>().is_err());
        assert_eq!(GameMode::default(), GameMode::Survival);
    }

    #[test]
    fn difficulty_parses_and_defaults() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!("0".parse::<Difficulty>(), Ok(Difficulty::Peaceful));
        assert_eq!(Difficulty::default(), Difficulty::Normal);
    }
}
