use gabbro_shared::block::BlockId;

/// Face indices follow the mesher's direction table: +X, -X, +Y, -Y, +Z, -Z.
pub const FACE_POS_X: usize = 0;
pub const FACE_NEG_X: usize = 1;
pub const FACE_POS_Y: usize = 2;
pub const FACE_NEG_Y: usize = 3;
pub const FACE_POS_Z: usize = 4;
pub const FACE_NEG_Z: usize = 5;

/// Texture lookup consumed by the mesher. The atlas image itself lives with
/// the render collaborator; this core only needs tile origins and the tile
/// extent in atlas space.
pub trait AtlasUv {
    fn uv_origin(&self, block: BlockId, face: usize) -> [f32; 2];
    fn tile_size(&self) -> f32;
}

/// Row-major grid atlas. Most blocks use one tile for all six faces; the
/// exceptions (grass, log) pick per-face tiles.
#[derive(Copy, Clone, Debug)]
pub struct GridAtlas {
    pub tiles_per_row: u16,
}

impl Default for GridAtlas {
    fn default() -> Self {
        Self { tiles_per_row: 16 }
    }
}

// Tile slots in the atlas grid. Grass and log carry extra side/end tiles
// beyond their block id slot.
const TILE_GRASS_TOP: u16 = 4;
const TILE_GRASS_SIDE: u16 = 19;
const TILE_LOG_END: u16 = 11;
const TILE_LOG_SIDE: u16 = 20;

impl GridAtlas {
    fn tile_index(&self, block: BlockId, face: usize) -> u16 {
        match block {
            BlockId::GRASS => match face {
                FACE_POS_Y => TILE_GRASS_TOP,
                FACE_NEG_Y => u16::from(BlockId::DIRT.0),
                _ => TILE_GRASS_SIDE,
            },
            BlockId::LOG => match face {
                FACE_POS_Y | FACE_NEG_Y => TILE_LOG_END,
                _ => TILE_LOG_SIDE,
            },
            _ => u16::from(block.0),
        }
    }
}

impl AtlasUv for GridAtlas {
    fn uv_origin(&self, block: BlockId, face: usize) -> [f32; 2] {
        let index = self.tile_index(block, face);
        let size = self.tile_size();
        [
            f32::from(index % self.tiles_per_row) * size,
            f32::from(index / self.tiles_per_row) * size,
        ]
    }

    fn tile_size(&self) -> f32 {
        1.0 / f32::from(self.tiles_per_row)
    }
}
