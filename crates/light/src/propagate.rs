use glam::IVec3;
use levelhost_kernel::WorldProvider;
use std::collections::VecDeque;

const NEIGHBOURS: [IVec3; 6] = [
    IVec3::X,
    IVec3::NEG_X,
    IVec3::Y,
    IVec3::NEG_Y,
    IVec3::Z,
    IVec3::NEG_Z,
];

/// Counters from one block-light flood fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockPassStats {
    /// Sources that still emitted light when re-read.
    pub sources_seeded: usize,
    /// Sources whose block no longer emits (edited since collection).
    pub stale_sources: usize,
    /// Neighbour writes that raised a stored value.
    pub voxels_updated: usize,
    pub dequeued: usize,
}

/// Flood block light outward from every collected light source.
///
/// Positions are re-resolved against the provider when dequeued, never
/// trusted from the queue. A neighbour receives `value - 1 - opacity` and is
/// enqueued only if that is strictly greater than what it holds. Fully opaque
/// neighbours and uncached chunks are skipped.
pub fn block_pass(world: &mut WorldProvider) -> BlockPassStats {
    let sources = world.light_sources().to_vec();
    let mut stats = BlockPassStats::default();
    let mut queue: VecDeque<IVec3> = VecDeque::with_capacity(sources.len());

    for pos in sources {
        let emission = world.block_at(pos).map_or(0, |b| b.emission());
        if emission == 0 {
            stats.stale_sources += 1;
            continue;
        }
        if emission > world.block_light_at(pos).unwrap_or(0) {
            world.set_block_light_at(pos, emission);
        }
        queue.push_back(pos);
        stats.sources_seeded += 1;
    }

    while let Some(pos) = queue.pop_front() {
        stats.dequeued += 1;
        let Some(block) = world.block_at(pos) else {
            continue;
        };
        let value = block
            .emission()
            .max(world.block_light_at(pos).unwrap_or(0));
        if value <= 1 {
            continue;
        }
        for offset in NEIGHBOURS {
            let neighbour = pos + offset;
            let Some(target) = world.block_at(neighbour) else {
                continue;
            };
            if target.is_opaque() {
                continue;
            }
            let incoming = value.saturating_sub(1 + target.opacity());
            let current = world.block_light_at(neighbour).unwrap_or(0);
            if incoming > current {
                world.set_block_light_at(neighbour, incoming);
                queue.push_back(neighbour);
                stats.voxels_updated += 1;
            }
        }
    }

    tracing::trace!(
        seeded = stats.sources_seeded,
        stale = stats.stale_sources,
        updated = stats.voxels_updated,
        "block pass complete"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelhost_common::ChunkPos;
    use levelhost_kernel::{Block, Chunk, FlatGenerator};

    fn block_light_field(world: &WorldProvider) -> Vec<(ChunkPos, Vec<u8>)> {
        let mut field: Vec<(ChunkPos, Vec<u8>)> = world
            .cached_chunks()
            .map(|(pos, chunk)| (pos, chunk.to_record().block_light))
            .collect();
        field.sort_by_key(|(pos, _)| *pos);
        field
    }

    fn torch_world() -> WorldProvider {
        let mut world = WorldProvider::flat(FlatGenerator::default().with_torches(4));
        for pos in ChunkPos::new(0, 0).square(1) {
            world.chunk(pos).unwrap();
        }
        world
    }

    #[test]
    fn no_sources_leaves_everything_dark() {
        let mut world = WorldProvider::flat(FlatGenerator::default());
        world.chunk(ChunkPos::new(0, 0)).unwrap();
        let stats = block_pass(&mut world);
        assert_eq!(stats, BlockPassStats::default());
        let (_, chunk) = world.cached_chunks().next().unwrap();
        assert!(chunk.to_record().block_light.iter().all(|&v| v == 0));
    }

    #[test]
    fn torch_light_falls_off_with_distance() {
        let mut world = torch_world();
        let stats = block_pass(&mut world);
        assert_eq!(stats.sources_seeded, 1);

        let torch = IVec3::new(8, 4, 8);
        assert_eq!(world.block_light_at(torch), Some(14));
        assert_eq!(world.block_light_at(torch + IVec3::X), Some(13));
        assert_eq!(world.block_light_at(torch + IVec3::new(5, 0, 0)), Some(9));
        assert_eq!(world.block_light_at(torch + IVec3::new(13, 0, 0)), Some(1));
        assert_eq!(world.block_light_at(torch + IVec3::new(14, 0, 0)), Some(0));
        assert_eq!(world.block_light_at(torch + IVec3::new(0, 3, 2)), Some(9));
        // grass under the torch is opaque
        assert_eq!(world.block_light_at(torch - IVec3::Y), Some(0));
    }

    #[test]
    fn light_crosses_chunk_borders() {
        let mut world = torch_world();
        block_pass(&mut world);
        // x = -1 is in chunk (-1, 0), nine steps from the torch
        assert_eq!(world.block_light_at(IVec3::new(-1, 4, 8)), Some(5));
    }

    #[test]
    fn uncached_chunks_are_not_generated() {
        let mut world = WorldProvider::flat(FlatGenerator::default().with_torches(1));
        world.chunk(ChunkPos::new(0, 0)).unwrap();
        block_pass(&mut world);
        assert_eq!(world.cached_chunk_count(), 1);
        assert_eq!(world.block_light_at(IVec3::new(-1, 4, 8)), None);
    }

    #[test]
    fn second_run_is_identical() {
        let mut world = torch_world();
        block_pass(&mut world);
        let first = block_light_field(&world);
        let again = block_pass(&mut world);
        assert_eq!(again.voxels_updated, 0);
        assert_eq!(block_light_field(&world), first);
    }

    #[test]
    fn opacity_reduces_incoming_light() {
        let mut world = WorldProvider::air();
        world.chunk(ChunkPos::new(0, 0)).unwrap();
        world.set_block(IVec3::new(4, 10, 4), Block::Glowstone).unwrap();
        world.set_block(IVec3::new(5, 10, 4), Block::Water).unwrap();
        world.set_block(IVec3::new(4, 10, 5), Block::Stone).unwrap();
        block_pass(&mut world);
        assert_eq!(world.block_light_at(IVec3::new(3, 10, 4)), Some(14));
        assert_eq!(world.block_light_at(IVec3::new(5, 10, 4)), Some(12));
        assert_eq!(world.block_light_at(IVec3::new(4, 10, 5)), Some(0));
    }

    #[test]
    fn stale_sources_are_skipped() {
        let mut world = WorldProvider::air();
        world.set_block(IVec3::new(1, 1, 1), Block::Torch).unwrap();
        world.set_block(IVec3::new(1, 1, 1), Block::Air).unwrap();
        let stats = block_pass(&mut world);
        assert_eq!(stats.stale_sources, 1);
        assert_eq!(stats.sources_seeded, 0);
        assert_eq!(world.block_light_at(IVec3::new(1, 2, 1)), Some(0));
    }

    #[test]
    fn touching_sources_do_not_cycle() {
        let mut world = WorldProvider::air();
        let mut chunk_count = 0;
        for x in 0..6 {
            world.set_block(IVec3::new(x, 20, 0), Block::Glowstone).unwrap();
            chunk_count = world.cached_chunk_count();
        }
        let stats = block_pass(&mut world);
        assert_eq!(chunk_count, 1);
        assert_eq!(stats.sources_seeded, 6);
        let chunk: &Chunk = world.cached_chunk(ChunkPos::new(0, 0)).unwrap();
        assert_eq!(chunk.block_light(IVec3::new(6, 20, 0)), 14);
    }
}
