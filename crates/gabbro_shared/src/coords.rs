use std::ops::{Add, Sub};

use glam::IVec3;
use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_HEIGHT: usize = 128;
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_HEIGHT * CHUNK_SIZE;

/// Position of a chunk column in the infinite XZ grid. Chunks span the full
/// world height, so there is no Y component.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for ChunkPos {
    type Output = ChunkPos;

    fn sub(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

pub fn y_in_bounds(y: i32) -> bool {
    (0..CHUNK_HEIGHT as i32).contains(&y)
}

/// Splits a world position into its owning chunk and the chunk-local cell.
/// `world_pos.y` must already be within `[0, CHUNK_HEIGHT)`.
pub fn world_to_chunk(world_pos: IVec3) -> (ChunkPos, LocalPos) {
    debug_assert!(
        y_in_bounds(world_pos.y),
        "world y out of chunk bounds: {}",
        world_pos.y
    );

    let size = CHUNK_SIZE as i32;
    let (chunk_x, local_x) = div_rem_floor(world_pos.x, size);
    let (chunk_z, local_z) = div_rem_floor(world_pos.z, size);

    (
        ChunkPos {
            x: chunk_x,
            z: chunk_z,
        },
        LocalPos {
            x: local_x as u8,
            y: world_pos.y as u8,
            z: local_z as u8,
        },
    )
}

pub fn chunk_to_world(chunk_pos: ChunkPos, local: LocalPos) -> IVec3 {
    let size = CHUNK_SIZE as i32;
    IVec3::new(
        chunk_pos.x * size + i32::from(local.x),
        i32::from(local.y),
        chunk_pos.z * size + i32::from(local.z),
    )
}

/// Column-major layout: a whole Y column is contiguous per (x, z) pair.
pub fn local_to_index(local: LocalPos) -> usize {
    (usize::from(local.x) * CHUNK_HEIGHT + usize::from(local.y)) * CHUNK_SIZE
        + usize::from(local.z)
}

pub fn index_to_local(index: usize) -> LocalPos {
    assert!(index < CHUNK_VOLUME, "chunk index out of bounds: {index}");

    let z = index % CHUNK_SIZE;
    let rem = index / CHUNK_SIZE;
    let y = rem % CHUNK_HEIGHT;
    let x = rem / CHUNK_HEIGHT;

    LocalPos {
        x: x as u8,
        y: y as u8,
        z: z as u8,
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{
        chunk_to_world, index_to_local, local_to_index, world_to_chunk, y_in_bounds, ChunkPos,
        LocalPos, CHUNK_HEIGHT, CHUNK_SIZE,
    };

    #[test]
    fn local_to_index_round_trips_back_to_local_coords() {
        for x in 0..CHUNK_SIZE {
            for y in 0..CHUNK_HEIGHT {
                for z in 0..CHUNK_SIZE {
                    let local = LocalPos {
                        x: x as u8,
                        y: y as u8,
                        z: z as u8,
                    };
                    let index = local_to_index(local);
                    assert_eq!(index_to_local(index), local);
                }
            }
        }
    }

    #[test]
    fn column_cells_are_contiguous_in_memory() {
        let a = local_to_index(LocalPos { x: 5, y: 10, z: 7 });
        let b = local_to_index(LocalPos { x: 5, y: 11, z: 7 });
        assert_eq!(b - a, CHUNK_SIZE);
    }

    #[test]
    fn world_to_chunk_handles_negative_and_positive_coordinates() {
        let (chunk0, local0) = world_to_chunk(IVec3::new(-1, 0, -1));
        assert_eq!(chunk0, ChunkPos { x: -1, z: -1 });
        assert_eq!(
            local0,
            LocalPos {
                x: (CHUNK_SIZE - 1) as u8,
                y: 0,
                z: (CHUNK_SIZE - 1) as u8,
            }
        );

        let (chunk1, local1) = world_to_chunk(IVec3::new(16, 64, 0));
        assert_eq!(chunk1, ChunkPos { x: 1, z: 0 });
        assert_eq!(local1, LocalPos { x: 0, y: 64, z: 0 });

        let world = IVec3::new(-33, 95, 66);
        let (chunk2, local2) = world_to_chunk(world);
        assert_eq!(chunk_to_world(chunk2, local2), world);
    }

    #[test]
    fn chunk_pos_arithmetic_is_component_wise() {
        let a = ChunkPos { x: 10, z: 4 };
        let b = ChunkPos { x: -3, z: 1 };

        assert_eq!(a + b, ChunkPos { x: 7, z: 5 });
        assert_eq!(a - b, ChunkPos { x: 13, z: 3 });
        assert_eq!(a.offset(1, -1), ChunkPos { x: 11, z: 3 });
    }

    #[test]
    fn y_bounds_check_matches_chunk_height() {
        assert!(!y_in_bounds(-1));
        assert!(y_in_bounds(0));
        assert!(y_in_bounds(CHUNK_HEIGHT as i32 - 1));
        assert!(!y_in_bounds(CHUNK_HEIGHT as i32));
    }
}
