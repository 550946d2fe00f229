use gabbro_shared::block::BlockId;
use gabbro_shared::coords::{ChunkPos, CHUNK_SIZE};

/// Villages anchor to a coarse grid of 8x8-chunk cells. Whether a cell hosts
/// a village, and where inside the cell, is a pure function of the world
/// seed, so placement survives unload/reload without coordination.
pub const VILLAGE_CELL_CHUNKS: i32 = 8;

/// Every chunk within this radius of the anchor must exist before a village
/// commits, so buildings never span ungenerated terrain.
pub const VILLAGE_CHUNK_RADIUS: i32 = 2;

const CELL_BLOCKS: i32 = VILLAGE_CELL_CHUNKS * CHUNK_SIZE as i32;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VillageAnchor {
    pub x: i32,
    pub z: i32,
}

impl VillageAnchor {
    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::new(
            self.x.div_euclid(CHUNK_SIZE as i32),
            self.z.div_euclid(CHUNK_SIZE as i32),
        )
    }
}

fn cell_hash(seed: u64, cell_x: i32, cell_z: i32, salt: u64) -> u64 {
    seed.wrapping_add(salt)
        .wrapping_mul(6364136223846793005)
        .wrapping_add((cell_x as i64 as u64).wrapping_mul(1442695040888963407))
        .wrapping_add((cell_z as i64 as u64).wrapping_mul(1103515245))
}

/// The anchor hosted by a grid cell, if any. One cell in three hosts a
/// village, jittered inside the cell with a margin so the radius-2 gate stays
/// within the cell's own chunk neighborhood.
pub fn village_in_cell(seed: u64, cell_x: i32, cell_z: i32) -> Option<VillageAnchor> {
    let hash = cell_hash(seed, cell_x, cell_z, 51_001);
    if hash % 3 != 0 {
        return None;
    }

    let jitter_x = 32 + ((hash >> 8) % 64) as i32;
    let jitter_z = 32 + ((hash >> 24) % 64) as i32;

    Some(VillageAnchor {
        x: cell_x * CELL_BLOCKS + jitter_x,
        z: cell_z * CELL_BLOCKS + jitter_z,
    })
}

/// Candidate anchors whose cell touches the 3x3 cell neighborhood of the
/// given chunk. Repeatable for any caller with the same seed.
pub fn villages_near(seed: u64, chunk: ChunkPos) -> Vec<VillageAnchor> {
    let cell_x = chunk.x.div_euclid(VILLAGE_CELL_CHUNKS);
    let cell_z = chunk.z.div_euclid(VILLAGE_CELL_CHUNKS);

    let mut anchors = Vec::new();
    for dz in -1..=1 {
        for dx in -1..=1 {
            if let Some(anchor) = village_in_cell(seed, cell_x + dx, cell_z + dz) {
                anchors.push(anchor);
            }
        }
    }
    anchors
}

/// Writes one village through the chunk store's collaborator functions:
/// `surface_height` grounds each building, `write_block` performs the edit.
/// Layout is deterministic from the seed and anchor.
pub fn place_village(
    anchor: VillageAnchor,
    seed: u64,
    surface_height: &impl Fn(i32, i32) -> i32,
    write_block: &mut impl FnMut(i32, i32, i32, BlockId),
) {
    let hash = cell_hash(seed, anchor.x, anchor.z, 51_777);
    let hut_count = 3 + (hash % 3) as i32;

    build_well(anchor, surface_height, write_block);

    for i in 0..hut_count {
        // Huts sit on a ring around the well, one per compass slot.
        let slot = (hash >> (8 + i * 4)) % 4;
        let distance = 9 + ((hash >> (16 + i * 3)) % 5) as i32;
        let (dx, dz) = match slot {
            0 => (distance, i * 3 - 3),
            1 => (-distance, 3 - i * 3),
            2 => (i * 3 - 3, distance),
            _ => (3 - i * 3, -distance),
        };
        build_hut(anchor.x + dx, anchor.z + dz, surface_height, write_block);
    }

    build_lamp_post(anchor.x + 3, anchor.z + 3, surface_height, write_block);
    build_lamp_post(anchor.x - 3, anchor.z - 3, surface_height, write_block);
}

fn build_well(
    anchor: VillageAnchor,
    surface_height: &impl Fn(i32, i32) -> i32,
    write_block: &mut impl FnMut(i32, i32, i32, BlockId),
) {
    let base = surface_height(anchor.x, anchor.z);

    for dz in -1..=1 {
        for dx in -1..=1 {
            let rim = dx != 0 || dz != 0;
            write_block(
                anchor.x + dx,
                base + 1,
                anchor.z + dz,
                if rim {
                    BlockId::COBBLESTONE
                } else {
                    BlockId::WATER
                },
            );
        }
    }
    // Water column under the rim opening.
    write_block(anchor.x, base, anchor.z, BlockId::WATER);
    write_block(anchor.x, base - 1, anchor.z, BlockId::WATER);
    write_block(anchor.x, base - 2, anchor.z, BlockId::COBBLESTONE);
}

fn build_hut(
    center_x: i32,
    center_z: i32,
    surface_height: &impl Fn(i32, i32) -> i32,
    write_block: &mut impl FnMut(i32, i32, i32, BlockId),
) {
    // Ground the whole footprint on its lowest corner so huts on slopes do
    // not float.
    let mut base = i32::MAX;
    for dz in -2..=2 {
        for dx in -2..=2 {
            base = base.min(surface_height(center_x + dx, center_z + dz));
        }
    }

    for dz in -2..=2i32 {
        for dx in -2..=2i32 {
            let x = center_x + dx;
            let z = center_z + dz;

            write_block(x, base, z, BlockId::PLANKS);
            write_block(x, base + 4, z, BlockId::PLANKS);

            let wall = dx.abs() == 2 || dz.abs() == 2;
            // Door gap on the -Z wall.
            let door = dz == -2 && dx == 0;
            for dy in 1..=3 {
                let block = if !wall || (door && dy <= 2) {
                    BlockId::AIR
                } else if dy == 2 && (dx == 0 || dz == 0) {
                    // One window midway along each wall.
                    BlockId::GLASS
                } else {
                    BlockId::COBBLESTONE
                };
                write_block(x, base + dy, z, block);
            }
        }
    }
}

fn build_lamp_post(
    x: i32,
    z: i32,
    surface_height: &impl Fn(i32, i32) -> i32,
    write_block: &mut impl FnMut(i32, i32, i32, BlockId),
) {
    let base = surface_height(x, z);
    for dy in 1..=2 {
        write_block(x, base + dy, z, BlockId::LOG);
    }
    write_block(x, base + 3, z, BlockId::GLASS);
}
