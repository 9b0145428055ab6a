use glam::IVec3;
use levelhost_common::CHUNK_WIDTH;
use levelhost_kernel::{CHUNK_HEIGHT, Chunk, MAX_LIGHT, WorldProvider};

/// Sky light for one column, bottom to top, from the height map and block
/// opacity alone.
///
/// Everything at or above the height map is open sky. Below it light falls
/// through non-opaque blocks losing each block's opacity, and stops at the
/// first fully opaque block. Dimensions without a sky are dark throughout.
pub fn column_sky_light(chunk: &Chunk, x: i32, z: i32, has_sky: bool) -> Vec<u8> {
    let mut column = vec![0u8; CHUNK_HEIGHT as usize];
    if !has_sky {
        return column;
    }
    let height = chunk.height(x, z);
    let mut light = MAX_LIGHT;
    for y in (0..CHUNK_HEIGHT).rev() {
        if y < height && light > 0 {
            let block = chunk.block(IVec3::new(x, y, z));
            light = if block.is_opaque() {
                0
            } else {
                light.saturating_sub(block.opacity())
            };
        }
        column[y as usize] = light;
    }
    column
}

/// Recompute sky light for every cached chunk. Returns the number of columns lit.
pub fn sky_pass(world: &mut WorldProvider) -> usize {
    let has_sky = world.dimension().has_sky();
    let mut columns = 0;
    for chunk in world.cached_chunks_mut() {
        for z in 0..CHUNK_WIDTH {
            for x in 0..CHUNK_WIDTH {
                let values = column_sky_light(chunk, x, z, has_sky);
                for (y, value) in values.into_iter().enumerate() {
                    chunk.set_sky_light(IVec3::new(x, y as i32, z), value);
                }
                columns += 1;
            }
        }
    }
    tracing::trace!(columns, has_sky, "sky pass complete");
    columns
}
