use serde::{Deserialize, Serialize};

/// Highest value of either light channel.
pub const MAX_LIGHT: u8 = 15;

/// The closed block palette.
///
/// Each block has an opacity (how much light it absorbs, 15 = fully opaque)
/// and an emission (light it gives off, 0 for most blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Block {
    #[default]
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Bedrock = 4,
    Sand = 5,
    Water = 6,
    Leaves = 7,
    Glass = 8,
    Torch = 9,
    Glowstone = 10,
    Lava = 11,
    Netherrack = 12,
    EndStone = 13,
}

impl Block {
    const PALETTE: [Block; 14] = [
        Block::Air,
        Block::Stone,
        Block::Dirt,
        Block::Grass,
        Block::Bedrock,
        Block::Sand,
        Block::Water,
        Block::Leaves,
        Block::Glass,
        Block::Torch,
        Block::Glowstone,
        Block::Lava,
        Block::Netherrack,
        Block::EndStone,
    ];

    /// Stable numeric id used by chunk storage.
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::PALETTE.get(id as usize).copied()
    }

    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Light absorbed when light passes through this block.
    pub const fn opacity(self) -> u8 {
        match self {
            Self::Air | Self::Glass | Self::Torch => 0,
            Self::Leaves => 1,
            Self::Water => 2,
            _ => MAX_LIGHT,
        }
    }

    pub const fn is_opaque(self) -> bool {
        self.opacity() >= MAX_LIGHT
    }

    /// Block light emitted by this block.
    pub const fn emission(self) -> u8 {
        match self {
            Self::Torch => 14,
            Self::Glowstone | Self::Lava => 15,
            _ => 0,
        }
    }
}
