use gabbro_shared::block::BlockId;
use gabbro_shared::chunk::ChunkData;
use gabbro_shared::coords::{ChunkPos, LocalPos, CHUNK_HEIGHT, CHUNK_SIZE};
use gabbro_shared::noise::SimplexNoise;

pub const SEA_LEVEL: i32 = 40;

// Trees keep this margin to the chunk edge so a canopy never has to reach
// into a neighbor that may not exist yet.
const TREE_EDGE_MARGIN: usize = 3;
const TREE_GATE_THRESHOLD: f64 = 0.6;

// Fixed offsets deriving the independent noise channels from the world seed.
const DETAIL_CHANNEL_OFFSET: u64 = 101;
const BIOME_CHANNEL_OFFSET: u64 = 211;
const TREE_CHANNEL_OFFSET: u64 = 307;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Biome {
    Plains,
    Desert,
    Snow,
}

/// Deterministic chunk population. Everything here is a pure function of the
/// world seed and the chunk coordinate; regenerating a chunk reproduces it
/// byte for byte, trees included.
pub struct TerrainGenerator {
    seed: u64,
    continental: SimplexNoise,
    detail: SimplexNoise,
    biome: SimplexNoise,
    tree: SimplexNoise,
}

impl TerrainGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            continental: SimplexNoise::new(seed),
            detail: SimplexNoise::new(seed.wrapping_add(DETAIL_CHANNEL_OFFSET)),
            biome: SimplexNoise::new(seed.wrapping_add(BIOME_CHANNEL_OFFSET)),
            tree: SimplexNoise::new(seed.wrapping_add(TREE_CHANNEL_OFFSET)),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Terrain height of a column before any structure edits.
    pub fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let wx = f64::from(world_x);
        let wz = f64::from(world_z);

        let continentalness = self.continental.fbm2d(wx * 0.001, wz * 0.001, 4, 2.0, 0.5);
        let erosion = self.detail.fbm2d(wx * 0.004, wz * 0.004, 6, 2.0, 0.5);
        let detail = self
            .detail
            .fbm2d(wx * 0.02 + 413.7, wz * 0.02 - 289.3, 3, 2.0, 0.45);

        // Positive continentalness at full weight, negative reduced: tall
        // landmasses are allowed, large ocean basins are suppressed.
        let continent = if continentalness > 0.0 {
            continentalness * 12.0
        } else {
            continentalness * 2.0
        };

        let mut raw = continent + erosion * 6.0 + detail * 3.0;
        if raw < 0.0 {
            // Keeps lakes shallow: underwater relief is squashed into [-3, 0].
            raw = (raw * 0.25).max(-3.0);
        }

        ((f64::from(SEA_LEVEL) + raw).floor() as i32).clamp(1, CHUNK_HEIGHT as i32 - 2)
    }

    pub fn biome_at(&self, world_x: i32, world_z: i32) -> Biome {
        let wx = f64::from(world_x);
        let wz = f64::from(world_z);

        let temperature = self.biome.noise2d(wx * 0.002, wz * 0.002);
        let moisture = self.biome.noise2d(wx * 0.002 + 523.0, wz * 0.002 - 351.0);

        if temperature < -0.4 {
            Biome::Snow
        } else if temperature > 0.3 && moisture < -0.1 {
            Biome::Desert
        } else {
            Biome::Plains
        }
    }

    fn is_beach(height: i32) -> bool {
        (SEA_LEVEL - 1..=SEA_LEVEL + 2).contains(&height)
    }

    fn is_cave(&self, wx: i32, wy: i32, wz: i32) -> bool {
        let x = f64::from(wx);
        let y = f64::from(wy);
        let z = f64::from(wz);

        // Two independent 3D fields AND-ed together; the intersection of
        // their high bands forms winding tunnels instead of open caverns.
        let n1 = self.continental.noise3d(x * 0.05, y * 0.08, z * 0.05);
        let n2 = self
            .detail
            .noise3d(x * 0.05 + 317.0, y * 0.08 - 211.0, z * 0.05 + 89.0);
        n1 > 0.3 && n2 > 0.3
    }

    fn stone_layer_block(&self, wx: i32, wy: i32, wz: i32, height: i32) -> BlockId {
        if wy > 5 && wy < height - 8 && self.is_cave(wx, wy, wz) {
            return BlockId::AIR;
        }

        let x = f64::from(wx);
        let y = f64::from(wy);
        let z = f64::from(wz);

        if wy < 20
            && self
                .detail
                .noise3d(x * 0.18 - 373.0, y * 0.18, z * 0.18 + 241.0)
                > 0.72
        {
            return BlockId::IRON_ORE;
        }
        if wy < 50
            && self
                .detail
                .noise3d(x * 0.16 + 911.0, y * 0.16 - 57.0, z * 0.16)
                > 0.68
        {
            return BlockId::COAL_ORE;
        }
        if wy < 40
            && self
                .continental
                .noise3d(x * 0.09 + 57.0, y * 0.09 + 631.0, z * 0.09)
                > 0.62
        {
            return BlockId::GRAVEL;
        }

        BlockId::STONE
    }

    fn column_hash(&self, wx: i32, wz: i32, salt: u64) -> u64 {
        self.seed
            .wrapping_add(salt)
            .wrapping_mul(6364136223846793005)
            .wrapping_add((wx as i64 as u64).wrapping_mul(2654435761))
            .wrapping_add((wz as i64 as u64).wrapping_mul(40503))
    }

    fn tree_eligible(&self, biome: Biome, beach: bool, height: i32) -> bool {
        biome == Biome::Plains && !beach && height > SEA_LEVEL + 1
    }

    fn should_place_tree(&self, wx: i32, wz: i32) -> bool {
        self.tree.noise2d(f64::from(wx) * 0.8, f64::from(wz) * 0.8) > TREE_GATE_THRESHOLD
    }

    pub fn generate_chunk(&self, pos: ChunkPos) -> ChunkData {
        let mut chunk = ChunkData::new_empty();

        let mut heights = [[0i32; CHUNK_SIZE]; CHUNK_SIZE];
        let mut biomes = [[Biome::Plains; CHUNK_SIZE]; CHUNK_SIZE];

        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let wx = pos.x * CHUNK_SIZE as i32 + x as i32;
                let wz = pos.z * CHUNK_SIZE as i32 + z as i32;
                heights[z][x] = self.surface_height(wx, wz);
                biomes[z][x] = self.biome_at(wx, wz);
            }
        }

        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let wx = pos.x * CHUNK_SIZE as i32 + x as i32;
                let wz = pos.z * CHUNK_SIZE as i32 + z as i32;
                let height = heights[z][x];
                let biome = biomes[z][x];
                let beach = Self::is_beach(height);
                let sandy = beach || biome == Biome::Desert;

                for y in 0..CHUNK_HEIGHT as i32 {
                    let block = if y == 0 {
                        BlockId::BEDROCK
                    } else if y < height - 4 {
                        self.stone_layer_block(wx, y, wz, height)
                    } else if y < height {
                        if sandy {
                            BlockId::SAND
                        } else {
                            BlockId::DIRT
                        }
                    } else if y == height {
                        if sandy {
                            BlockId::SAND
                        } else if biome == Biome::Snow {
                            BlockId::SNOW
                        } else {
                            BlockId::GRASS
                        }
                    } else if y <= SEA_LEVEL {
                        BlockId::WATER
                    } else {
                        BlockId::AIR
                    };

                    chunk.set(
                        LocalPos {
                            x: x as u8,
                            y: y as u8,
                            z: z as u8,
                        },
                        block,
                    );
                }
            }
        }

        for z in TREE_EDGE_MARGIN..CHUNK_SIZE - TREE_EDGE_MARGIN {
            for x in TREE_EDGE_MARGIN..CHUNK_SIZE - TREE_EDGE_MARGIN {
                let wx = pos.x * CHUNK_SIZE as i32 + x as i32;
                let wz = pos.z * CHUNK_SIZE as i32 + z as i32;
                let height = heights[z][x];
                let biome = biomes[z][x];

                if !self.tree_eligible(biome, Self::is_beach(height), height) {
                    continue;
                }
                if !self.should_place_tree(wx, wz) {
                    continue;
                }

                self.place_tree(&mut chunk, x, z, wx, wz, height);
            }
        }

        chunk
    }

    fn place_tree(
        &self,
        chunk: &mut ChunkData,
        x: usize,
        z: usize,
        wx: i32,
        wz: i32,
        surface_y: i32,
    ) {
        let trunk_height = 4 + (self.column_hash(wx, wz, 17_001) >> 16) % 3;
        let trunk_height = trunk_height as i32;
        let top = surface_y + trunk_height;

        // Canopy reaches two blocks above the trunk.
        if top + 2 >= CHUNK_HEIGHT as i32 - 1 {
            return;
        }

        for dy in 1..=trunk_height {
            chunk.set(
                LocalPos {
                    x: x as u8,
                    y: (surface_y + dy) as u8,
                    z: z as u8,
                },
                BlockId::LOG,
            );
        }

        let layers: [(i32, i32); 4] = [(top - 1, 2), (top, 2), (top + 1, 1), (top + 2, 1)];
        for (ly, radius) in layers {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    // Round the very top into a plus shape.
                    if ly == top + 2 && dx * dx + dz * dz > 1 {
                        continue;
                    }

                    let lx = x as i32 + dx;
                    let lz = z as i32 + dz;
                    let cell = LocalPos {
                        x: lx as u8,
                        y: ly as u8,
                        z: lz as u8,
                    };

                    // Leaves never overwrite the trunk or anything else.
                    if chunk.get(cell) == BlockId::AIR {
                        chunk.set(cell, BlockId::LEAVES);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gabbro_shared::block::{is_water_block, BlockId};
    use gabbro_shared::coords::{ChunkPos, LocalPos, CHUNK_HEIGHT, CHUNK_SIZE};

    use super::{TerrainGenerator, SEA_LEVEL};

    #[test]
    fn generation_is_deterministic_across_instances() {
        let a = TerrainGenerator::new(12345);
        let b = TerrainGenerator::new(12345);

        for pos in [
            ChunkPos::new(0, 0),
            ChunkPos::new(3, -2),
            ChunkPos::new(-7, 11),
        ] {
            assert_eq!(a.generate_chunk(pos), b.generate_chunk(pos));
        }
    }

    #[test]
    fn different_seeds_shape_different_terrain() {
        let a = TerrainGenerator::new(1);
        let b = TerrainGenerator::new(99);
        assert_ne!(
            a.generate_chunk(ChunkPos::new(0, 0)),
            b.generate_chunk(ChunkPos::new(0, 0))
        );
    }

    #[test]
    fn every_column_is_bedrock_floored_and_water_sealed() {
        let generator = TerrainGenerator::new(0xA11CE);

        for pos in [ChunkPos::new(0, 0), ChunkPos::new(-4, 6)] {
            let chunk = generator.generate_chunk(pos);

            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    assert_eq!(
                        chunk.get(LocalPos {
                            x: x as u8,
                            y: 0,
                            z: z as u8
                        }),
                        BlockId::BEDROCK
                    );

                    for y in 0..CHUNK_HEIGHT {
                        let block = chunk.get(LocalPos {
                            x: x as u8,
                            y: y as u8,
                            z: z as u8,
                        });
                        if is_water_block(block) {
                            assert!(
                                y as i32 <= SEA_LEVEL,
                                "generated water above sea level at y={y}"
                            );
                            assert_eq!(block, BlockId::WATER, "generation only emits full water");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn surface_height_matches_column_contents() {
        let generator = TerrainGenerator::new(42);
        let pos = ChunkPos::new(2, 2);
        let chunk = generator.generate_chunk(pos);

        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let wx = pos.x * CHUNK_SIZE as i32 + x as i32;
                let wz = pos.z * CHUNK_SIZE as i32 + z as i32;
                let height = generator.surface_height(wx, wz);

                assert!((1..CHUNK_HEIGHT as i32 - 1).contains(&height));

                let surface = chunk.get(LocalPos {
                    x: x as u8,
                    y: height as u8,
                    z: z as u8,
                });
                assert!(
                    matches!(surface, BlockId::GRASS | BlockId::SAND | BlockId::SNOW),
                    "unexpected surface block {surface:?} at ({wx}, {height}, {wz})"
                );
            }
        }
    }

    #[test]
    fn trees_stay_clear_of_chunk_borders() {
        let generator = TerrainGenerator::new(7);

        for cx in -2..=2 {
            for cz in -2..=2 {
                let chunk = generator.generate_chunk(ChunkPos::new(cx, cz));
                for z in 0..CHUNK_SIZE {
                    for x in 0..CHUNK_SIZE {
                        if (3..CHUNK_SIZE - 3).contains(&x) && (3..CHUNK_SIZE - 3).contains(&z) {
                            continue;
                        }
                        for y in 0..CHUNK_HEIGHT {
                            let block = chunk.get(LocalPos {
                                x: x as u8,
                                y: y as u8,
                                z: z as u8,
                            });
                            assert_ne!(block, BlockId::LOG, "trunk in the border margin");
                        }
                    }
                }
            }
        }
    }
}
