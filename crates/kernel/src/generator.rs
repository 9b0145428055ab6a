//! Terrain generators used directly or as the fallback for chunks a store
//! has never persisted. Generation is deterministic in (seed, column).

use crate::block::Block;
use crate::chunk::{CHUNK_HEIGHT, Chunk};
use glam::IVec3;
use levelhost_common::{CHUNK_WIDTH, ChunkPos, Dimension};

/// The closed set of terrain generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generator {
    Flat(FlatGenerator),
    Cool(CoolGenerator),
    Experimental(ExperimentalGenerator),
    /// Empty space. Used for derived dimensions so that never-generated
    /// columns read as air instead of flat terrain.
    Air,
}

impl Generator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat(_) => "flat",
            Self::Cool(_) => "cool",
            Self::Experimental(_) => "experimental",
            Self::Air => "air",
        }
    }

    pub fn generate(&self, pos: ChunkPos, dimension: Dimension) -> Chunk {
        let mut chunk = Chunk::new(pos);
        match self {
            Self::Flat(g) => g.fill(&mut chunk, dimension),
            Self::Cool(g) => g.fill(&mut chunk, dimension),
            Self::Experimental(g) => g.fill(&mut chunk),
            Self::Air => {}
        }
        chunk.mark_clean();
        chunk
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::Flat(FlatGenerator::default())
    }
}

/// Superflat terrain: the same stack of layers in every column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatGenerator {
    /// Blocks from y = 0 upward.
    pub layers: Vec<Block>,
    /// Place a torch on the surface at the centre of every chunk whose
    /// coordinates are both multiples of this spacing.
    pub torch_spacing: Option<i32>,
}

impl Default for FlatGenerator {
    fn default() -> Self {
        Self {
            layers: vec![Block::Bedrock, Block::Dirt, Block::Dirt, Block::Grass],
            torch_spacing: None,
        }
    }
}

impl FlatGenerator {
    pub fn with_layers(layers: Vec<Block>) -> Self {
        Self {
            layers,
            torch_spacing: None,
        }
    }

    pub fn with_torches(mut self, spacing: i32) -> Self {
        self.torch_spacing = Some(spacing.max(1));
        self
    }

    /// Surface height: the first y above the layer stack.
    pub fn surface(&self) -> i32 {
        (self.layers.len() as i32).min(CHUNK_HEIGHT)
    }

    fn fill(&self, chunk: &mut Chunk, dimension: Dimension) {
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                for (y, block) in self.layers.iter().take(CHUNK_HEIGHT as usize).enumerate() {
                    let block = match (dimension, *block) {
                        (Dimension::Nether, Block::Dirt | Block::Grass) => Block::Netherrack,
                        (Dimension::TheEnd, Block::Dirt | Block::Grass) => Block::EndStone,
                        (_, b) => b,
                    };
                    chunk.set_block(IVec3::new(x, y as i32, z), block);
                }
            }
        }
        let pos = chunk.pos();
        if let Some(spacing) = self.torch_spacing
            && pos.x.rem_euclid(spacing) == 0
            && pos.z.rem_euclid(spacing) == 0
            && self.surface() < CHUNK_HEIGHT
        {
            chunk.set_block(IVec3::new(8, self.surface(), 8), Block::Torch);
        }
    }
}

/// Rolling hills with a sea level and scattered surface torches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoolGenerator {
    pub seed: u64,
}

impl CoolGenerator {
    pub const SEA_LEVEL: i32 = 44;
    const BASE_HEIGHT: i32 = 40;
    const AMPLITUDE: i32 = 16;
    const CELL: i32 = 16;

    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Terrain height at a world column, bilinear value noise over a coarse lattice.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let cx = x.div_euclid(Self::CELL);
        let cz = z.div_euclid(Self::CELL);
        let fx = x.rem_euclid(Self::CELL);
        let fz = z.rem_euclid(Self::CELL);
        let corner = |dx: i32, dz: i32| (hash2(self.seed, cx + dx, cz + dz) % Self::AMPLITUDE as u64) as i32;
        let top = corner(0, 0) * (Self::CELL - fx) + corner(1, 0) * fx;
        let bottom = corner(0, 1) * (Self::CELL - fx) + corner(1, 1) * fx;
        let blended = (top * (Self::CELL - fz) + bottom * fz) / (Self::CELL * Self::CELL);
        Self::BASE_HEIGHT + blended
    }

    fn fill(&self, chunk: &mut Chunk, dimension: Dimension) {
        let origin = chunk.pos().origin(0);
        let (surface, filler) = match dimension {
            Dimension::Overworld => (Block::Grass, Block::Dirt),
            Dimension::Nether => (Block::Netherrack, Block::Netherrack),
            Dimension::TheEnd => (Block::EndStone, Block::EndStone),
        };
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                let (wx, wz) = (origin.x + x, origin.z + z);
                let height = self.height_at(wx, wz).min(CHUNK_HEIGHT - 1);
                chunk.set_block(IVec3::new(x, 0, z), Block::Bedrock);
                for y in 1..height {
                    let block = if y < height - 3 { Block::Stone } else { filler };
                    chunk.set_block(IVec3::new(x, y, z), block);
                }
                if height <= Self::SEA_LEVEL {
                    chunk.set_block(IVec3::new(x, height, z), Block::Sand);
                    for y in height + 1..=Self::SEA_LEVEL {
                        chunk.set_block(IVec3::new(x, y, z), Block::Water);
                    }
                } else {
                    chunk.set_block(IVec3::new(x, height, z), surface);
                    if hash2(self.seed ^ 0x7f4a, wx, wz) % 199 == 0 && height + 1 < CHUNK_HEIGHT {
                        chunk.set_block(IVec3::new(x, height + 1, z), Block::Torch);
                    }
                }
            }
        }
    }
}

/// Terraced terrain with glowstone veins and bedrock lava pockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExperimentalGenerator {
    pub seed: u64,
}

impl ExperimentalGenerator {
    const BASE_HEIGHT: i32 = 30;
    const STEP: i32 = 3;

    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let terrace = (x.div_euclid(8) + z.div_euclid(8)).rem_euclid(6);
        let jitter = (hash2(self.seed, x.div_euclid(8), z.div_euclid(8)) % 2) as i32;
        Self::BASE_HEIGHT + (terrace + jitter) * Self::STEP
    }

    fn fill(&self, chunk: &mut Chunk) {
        let origin = chunk.pos().origin(0);
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                let (wx, wz) = (origin.x + x, origin.z + z);
                let height = self.height_at(wx, wz).min(CHUNK_HEIGHT - 1);
                let column = hash2(self.seed, wx, wz);
                chunk.set_block(IVec3::new(x, 0, z), Block::Bedrock);
                for y in 1..=height {
                    let vein = hash2(column, y, 0) % 173 == 0;
                    let block = match y {
                        1 | 2 if column % 11 == 0 => Block::Lava,
                        _ if vein && y < height - 2 => Block::Glowstone,
                        _ if y == height => Block::Grass,
                        _ if y > height - 3 => Block::Dirt,
                        _ => Block::Stone,
                    };
                    chunk.set_block(IVec3::new(x, y, z), block);
                }
            }
        }
    }
}

/// Splitmix64 step. Used to derive deterministic per-column values.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn hash2(seed: u64, a: i32, b: i32) -> u64 {
    let mixed = seed
        ^ (a as i64 as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (b as i64 as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f);
    splitmix64(mixed)
}
