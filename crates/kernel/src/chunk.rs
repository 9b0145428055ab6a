use crate::block::{Block, MAX_LIGHT};
use glam::IVec3;
use levelhost_common::{CHUNK_WIDTH, ChunkPos};
use serde::{Deserialize, Serialize};

/// Height of a chunk column, in blocks.
pub const CHUNK_HEIGHT: i32 = 128;

const WIDTH: usize = CHUNK_WIDTH as usize;
const HEIGHT: usize = CHUNK_HEIGHT as usize;
const VOLUME: usize = WIDTH * WIDTH * HEIGHT;

/// A fixed-size column of voxels with sky-light and block-light channels.
///
/// Local coordinates are `x, z in 0..16` and `y in 0..128`. Light values are
/// clamped to `0..=15` on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pos: ChunkPos,
    blocks: Vec<Block>,
    sky_light: Vec<u8>,
    block_light: Vec<u8>,
    /// Per column: one above the highest non-air block, 0 for an empty column.
    height_map: Vec<u8>,
    dirty: bool,
}

/// Serialized form of a chunk used by chunk stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub pos: ChunkPos,
    pub blocks: Vec<u8>,
    pub sky_light: Vec<u8>,
    pub block_light: Vec<u8>,
}

/// Errors from decoding a stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkDecodeError {
    #[error("chunk {pos}: expected {expected} voxels, found {found}")]
    WrongVolume {
        pos: ChunkPos,
        expected: usize,
        found: usize,
    },
    #[error("chunk {pos}: unknown block id {id}")]
    UnknownBlock { pos: ChunkPos, id: u8 },
}

impl Chunk {
    /// An all-air chunk with no light.
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            blocks: vec![Block::Air; VOLUME],
            sky_light: vec![0; VOLUME],
            block_light: vec![0; VOLUME],
            height_map: vec![0; WIDTH * WIDTH],
            dirty: false,
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Convert a world coordinate to this chunk's local coordinate, if inside.
    pub fn to_local(&self, world: IVec3) -> Option<IVec3> {
        let local = world - self.pos.origin(0);
        Self::in_bounds(local).then_some(local)
    }

    pub fn in_bounds(local: IVec3) -> bool {
        (0..CHUNK_WIDTH).contains(&local.x)
            && (0..CHUNK_HEIGHT).contains(&local.y)
            && (0..CHUNK_WIDTH).contains(&local.z)
    }

    fn index(local: IVec3) -> usize {
        debug_assert!(Self::in_bounds(local), "local coordinate out of chunk: {local}");
        (local.y as usize * WIDTH + local.z as usize) * WIDTH + local.x as usize
    }

    pub fn block(&self, local: IVec3) -> Block {
        self.blocks[Self::index(local)]
    }

    /// Place a block, keeping the height map current.
    pub fn set_block(&mut self, local: IVec3, block: Block) {
        self.blocks[Self::index(local)] = block;
        let column = local.z as usize * WIDTH + local.x as usize;
        let top = self.height_map[column] as i32;
        if !block.is_air() && local.y >= top {
            self.height_map[column] = (local.y + 1) as u8;
        } else if block.is_air() && local.y + 1 == top {
            self.height_map[column] = self.scan_height(local.x, local.z);
        }
        self.dirty = true;
    }

    /// One above the highest non-air block in the column, 0 if empty.
    pub fn height(&self, x: i32, z: i32) -> i32 {
        self.height_map[z as usize * WIDTH + x as usize] as i32
    }

    fn scan_height(&self, x: i32, z: i32) -> u8 {
        (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| !self.block(IVec3::new(x, y, z)).is_air())
            .map_or(0, |y| (y + 1) as u8)
    }

    pub fn recalculate_height_map(&mut self) {
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                self.height_map[z as usize * WIDTH + x as usize] = self.scan_height(x, z);
            }
        }
    }

    pub fn sky_light(&self, local: IVec3) -> u8 {
        self.sky_light[Self::index(local)]
    }

    pub fn set_sky_light(&mut self, local: IVec3, value: u8) {
        self.sky_light[Self::index(local)] = value.min(MAX_LIGHT);
        self.dirty = true;
    }

    pub fn block_light(&self, local: IVec3) -> u8 {
        self.block_light[Self::index(local)]
    }

    pub fn set_block_light(&mut self, local: IVec3, value: u8) {
        self.block_light[Self::index(local)] = value.min(MAX_LIGHT);
        self.dirty = true;
    }

    pub fn clear_sky_light(&mut self) {
        self.sky_light.fill(0);
    }

    pub fn clear_block_light(&mut self) {
        self.block_light.fill(0);
    }

    /// Whether the chunk changed since it was generated, loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// World coordinates of every light-emitting block, bottom to top.
    pub fn emitters(&self) -> Vec<IVec3> {
        let origin = self.pos.origin(0);
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.emission() > 0)
            .map(|(i, _)| {
                let x = (i % WIDTH) as i32;
                let z = ((i / WIDTH) % WIDTH) as i32;
                let y = (i / (WIDTH * WIDTH)) as i32;
                origin + IVec3::new(x, y, z)
            })
            .collect()
    }

    pub fn to_record(&self) -> ChunkRecord {
        ChunkRecord {
            pos: self.pos,
            blocks: self.blocks.iter().map(|b| b.id()).collect(),
            sky_light: self.sky_light.clone(),
            block_light: self.block_light.clone(),
        }
    }

    /// Rebuild a chunk from its stored form. The result is clean.
    pub fn from_record(record: ChunkRecord) -> Result<Self, ChunkDecodeError> {
        let pos = record.pos;
        for len in [record.blocks.len(), record.sky_light.len(), record.block_light.len()] {
            if len != VOLUME {
                return Err(ChunkDecodeError::WrongVolume {
                    pos,
                    expected: VOLUME,
                    found: len,
                });
            }
        }
        let blocks = record
            .blocks
            .iter()
            .map(|&id| Block::from_id(id).ok_or(ChunkDecodeError::UnknownBlock { pos, id }))
            .collect::<Result<Vec<_>, _>>()?;
        let mut chunk = Self {
            pos,
            blocks,
            sky_light: record.sky_light,
            block_light: record.block_light,
            height_map: vec![0; WIDTH * WIDTH],
            dirty: false,
        };
        chunk.recalculate_height_map();
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_is_dark_air() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        assert_eq!(chunk.block(IVec3::new(3, 60, 3)), Block::Air);
        assert_eq!(chunk.sky_light(IVec3::new(3, 60, 3)), 0);
        assert_eq!(chunk.height(3, 3), 0);
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn height_map_tracks_placement_and_removal() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_block(IVec3::new(1, 4, 2), Block::Stone);
        chunk.set_block(IVec3::new(1, 9, 2), Block::Glass);
        assert_eq!(chunk.height(1, 2), 10);
        chunk.set_block(IVec3::new(1, 9, 2), Block::Air);
        assert_eq!(chunk.height(1, 2), 5);
        assert!(chunk.is_dirty());
    }

    #[test]
    fn to_local_rejects_other_columns() {
        let chunk = Chunk::new(ChunkPos::new(-1, 2));
        assert_eq!(chunk.to_local(IVec3::new(-16, 0, 32)), Some(IVec3::new(0, 0, 0)));
        assert_eq!(chunk.to_local(IVec3::new(0, 0, 32)), None);
        assert_eq!(chunk.to_local(IVec3::new(-1, CHUNK_HEIGHT, 33)), None);
    }

    #[test]
    fn light_writes_are_clamped() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_block_light(IVec3::new(0, 0, 0), 40);
        assert_eq!(chunk.block_light(IVec3::new(0, 0, 0)), MAX_LIGHT);
    }

    #[test]
    fn emitters_are_world_coordinates() {
        let mut chunk = Chunk::new(ChunkPos::new(1, -1));
        chunk.set_block(IVec3::new(2, 5, 7), Block::Torch);
        chunk.set_block(IVec3::new(0, 1, 0), Block::Stone);
        assert_eq!(chunk.emitters(), vec![IVec3::new(18, 5, -9)]);
    }

    #[test]
    fn record_round_trip_keeps_light() {
        let mut chunk = Chunk::new(ChunkPos::new(4, 4));
        chunk.set_block(IVec3::new(5, 3, 5), Block::Glowstone);
        chunk.set_sky_light(IVec3::new(5, 4, 5), 15);
        let restored = Chunk::from_record(chunk.to_record()).unwrap();
        assert_eq!(restored.block(IVec3::new(5, 3, 5)), Block::Glowstone);
        assert_eq!(restored.sky_light(IVec3::new(5, 4, 5)), 15);
        assert_eq!(restored.height(5, 5), 4);
        assert!(!restored.is_dirty());
    }

    #[test]
    fn record_with_bad_volume_is_rejected() {
        let mut record = Chunk::new(ChunkPos::new(0, 0)).to_record();
        record.blocks.truncate(10);
        assert!(matches!(
            Chunk::from_record(record),
            Err(ChunkDecodeError::WrongVolume { found: 10, .. })
        ));
    }
}
