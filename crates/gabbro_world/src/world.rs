use glam::{IVec3, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use gabbro_shared::block::{
    is_foliage_block, is_water_block, register_default_blocks, BlockId, BlockRegistry,
};
use gabbro_shared::chunk::ChunkData;
use gabbro_shared::coords::{
    chunk_to_world, index_to_local, world_to_chunk, y_in_bounds, ChunkPos, CHUNK_HEIGHT,
    CHUNK_SIZE,
};

use crate::events::{EventSender, WorldEvent};
use crate::fluid::WaterFlow;
use crate::terrain::{TerrainGenerator, SEA_LEVEL};
use crate::village::{self, VillageAnchor, VILLAGE_CHUNK_RADIUS};

/// Vertical offset from the supporting block's top face to the spawn eye
/// point: one block of clearance plus standing eye height.
const SPAWN_EYE_OFFSET: f32 = 2.62;
const SPAWN_RING_MIN: i32 = 2;
const SPAWN_RING_MAX: i32 = 39;
const SPAWN_CELL_SEARCH_RADIUS: i32 = 8;

/// A generated chunk plus its remesh marker. The dirty flag is the only
/// coordination between mutation and mesh rebuild.
pub struct Chunk {
    pub blocks: ChunkData,
    pub dirty: bool,
}

/// The chunk store: sole long-lived owner of every generated chunk, the
/// world seed and its derived noise channels, village placement state, and
/// the fluid engine. All block queries are total; out-of-range or
/// ungenerated space reads as air.
pub struct World {
    seed: u64,
    registry: BlockRegistry,
    generator: TerrainGenerator,
    chunks: FxHashMap<ChunkPos, Chunk>,
    placed_villages: FxHashSet<(i32, i32)>,
    water: WaterFlow,
    events: Option<EventSender<WorldEvent>>,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            registry: register_default_blocks(),
            generator: TerrainGenerator::new(seed),
            chunks: FxHashMap::default(),
            placed_villages: FxHashSet::default(),
            water: WaterFlow::default(),
            events: None,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Routes world side effects (block break/place, water settling) to a
    /// collaborator. Delivery is synchronous and best-effort.
    pub fn set_event_sender(&mut self, sender: EventSender<WorldEvent>) {
        self.events = Some(sender);
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn is_generated(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Generates the chunk at `(cx, cz)` unless it already exists; double
    /// generation is an idempotent no-op. Freshly generated chunks dirty
    /// their already-present edge neighbors, since the new terrain may cover
    /// or expose faces on the shared border.
    pub fn generate_chunk(&mut self, cx: i32, cz: i32) -> &Chunk {
        let pos = ChunkPos::new(cx, cz);
        if !self.chunks.contains_key(&pos) {
            let blocks = self.generator.generate_chunk(pos);
            self.chunks.insert(
                pos,
                Chunk {
                    blocks,
                    dirty: true,
                },
            );
            for neighbor in [
                pos.offset(1, 0),
                pos.offset(-1, 0),
                pos.offset(0, 1),
                pos.offset(0, -1),
            ] {
                self.mark_dirty(neighbor);
            }
            debug!(cx, cz, "generated chunk");
        }

        self.chunks.get(&pos).expect("chunk exists after insert")
    }

    /// Installs a persisted chunk without running generation. The chunk is
    /// marked dirty for its first mesh build.
    pub fn load_chunk_from_data(&mut self, cx: i32, cz: i32, blocks: ChunkData) {
        let pos = ChunkPos::new(cx, cz);
        self.chunks.insert(
            pos,
            Chunk {
                blocks,
                dirty: true,
            },
        );
        for neighbor in [
            pos.offset(1, 0),
            pos.offset(-1, 0),
            pos.offset(0, 1),
            pos.offset(0, -1),
        ] {
            self.mark_dirty(neighbor);
        }
    }

    /// Drops a chunk from the store, returning its blocks so the caller can
    /// persist them. Mesh disposal is the render collaborator's concern.
    pub fn unload_chunk(&mut self, cx: i32, cz: i32) -> Option<ChunkData> {
        self.chunks
            .remove(&ChunkPos::new(cx, cz))
            .map(|chunk| chunk.blocks)
    }

    /// World-space block read; air for out-of-range Y or ungenerated chunks.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockId {
        if !y_in_bounds(y) {
            return BlockId::AIR;
        }
        let (chunk_pos, local) = world_to_chunk(IVec3::new(x, y, z));
        match self.chunks.get(&chunk_pos) {
            Some(chunk) => chunk.blocks.get(local),
            None => BlockId::AIR,
        }
    }

    /// World-space block write; silently ignored for out-of-range Y or
    /// ungenerated chunks. Marks the owning chunk dirty, and for border
    /// cells the facing neighbor(s) too, so culled faces on both sides of
    /// the border get rebuilt.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) {
        let pos = IVec3::new(x, y, z);
        let previous = self.get_block(x, y, z);
        if !self.write_block(pos, block, true) {
            return;
        }

        // Placing water seeds its spread targets; the horizontal neighbors
        // already sit one lateral step out, which keeps the flood inside the
        // spread cap measured from the placed source. Removing a block seeds
        // the hole so adjacent water can reclaim it.
        if is_water_block(block) {
            self.water.enqueue_at(pos + IVec3::NEG_Y, 0);
            for dir in crate::fluid::HORIZONTAL_DIRECTIONS {
                self.water.enqueue_at(pos + dir, 1);
            }
        } else if block == BlockId::AIR && previous != BlockId::AIR {
            self.water.enqueue_at(pos, 0);
        }

        if let Some(events) = &self.events {
            let event = if block == BlockId::AIR && self.registry.is_solid(previous) {
                WorldEvent::BlockBroken {
                    pos,
                    block: previous,
                }
            } else if block != BlockId::AIR {
                WorldEvent::BlockPlaced { pos, block }
            } else {
                return;
            };
            let _ = events.send(event);
        }
    }

    /// Shared write path. `propagate_borders` is true for normal edits and
    /// fluid updates; village placement writes owning-chunk-dirty only and
    /// dirties its whole neighborhood once at the end.
    pub(crate) fn write_block(&mut self, pos: IVec3, block: BlockId, propagate_borders: bool) -> bool {
        if !y_in_bounds(pos.y) {
            return false;
        }
        let (chunk_pos, local) = world_to_chunk(pos);
        let Some(chunk) = self.chunks.get_mut(&chunk_pos) else {
            return false;
        };

        chunk.blocks.set(local, block);
        chunk.dirty = true;

        if propagate_borders {
            let edge = CHUNK_SIZE as u8 - 1;
            if local.x == 0 {
                self.mark_dirty(chunk_pos.offset(-1, 0));
            } else if local.x == edge {
                self.mark_dirty(chunk_pos.offset(1, 0));
            }
            if local.z == 0 {
                self.mark_dirty(chunk_pos.offset(0, -1));
            } else if local.z == edge {
                self.mark_dirty(chunk_pos.offset(0, 1));
            }
        }

        true
    }

    /// Breaks a block and reports what it drops. Unbreakable blocks
    /// (infinite hardness) and empty cells are left alone.
    pub fn break_block(&mut self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        let block = self.get_block(x, y, z);
        if block == BlockId::AIR || is_water_block(block) {
            return None;
        }
        let props = self.registry.get_properties(block);
        if props.hardness.is_infinite() {
            return None;
        }
        let drops = props.drops;

        self.set_block(x, y, z, BlockId::AIR);
        drops
    }

    pub(crate) fn notify_water_settled(&mut self, pos: IVec3) {
        if let Some(events) = &self.events {
            let _ = events.send(WorldEvent::WaterSettled { pos });
        }
    }

    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.registry.is_solid(self.get_block(x, y, z))
    }

    pub fn is_transparent(&self, x: i32, y: i32, z: i32) -> bool {
        self.registry.is_transparent(self.get_block(x, y, z))
    }

    /// Topmost block that counts as ground: not air, not water, not part of
    /// a tree. Used for spawn search and structure grounding.
    pub fn get_surface_height(&self, x: i32, z: i32) -> i32 {
        for y in (0..CHUNK_HEIGHT as i32).rev() {
            let block = self.get_block(x, y, z);
            if block == BlockId::AIR || is_water_block(block) || is_foliage_block(block) {
                continue;
            }
            return y;
        }
        0
    }

    /// Spawn search: spiral outward ring by ring from the seed-derived
    /// village anchor and take the first dry column. A column is rejected
    /// the moment the downward scan meets water. Falls back to a high point
    /// above the anchor when no dry ground exists in range.
    pub fn get_spawn_point(&self) -> Vec3 {
        let (anchor_x, anchor_z) = self.spawn_anchor();

        for radius in SPAWN_RING_MIN..=SPAWN_RING_MAX {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs().max(dz.abs()) != radius {
                        continue;
                    }
                    let x = anchor_x + dx;
                    let z = anchor_z + dz;

                    if let Some(y) = self.dry_surface(x, z) {
                        return Vec3::new(
                            x as f32 + 0.5,
                            y as f32 + SPAWN_EYE_OFFSET,
                            z as f32 + 0.5,
                        );
                    }
                }
            }
        }

        Vec3::new(
            anchor_x as f32 + 0.5,
            CHUNK_HEIGHT as f32 - 2.0,
            anchor_z as f32 + 0.5,
        )
    }

    fn dry_surface(&self, x: i32, z: i32) -> Option<i32> {
        for y in (1..CHUNK_HEIGHT as i32).rev() {
            let block = self.get_block(x, y, z);
            if block == BlockId::AIR || is_foliage_block(block) {
                continue;
            }
            if is_water_block(block) {
                return None;
            }
            return Some(y);
        }
        None
    }

    fn spawn_anchor(&self) -> (i32, i32) {
        for radius in 0..=SPAWN_CELL_SEARCH_RADIUS {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs().max(dz.abs()) != radius {
                        continue;
                    }
                    if let Some(anchor) = village::village_in_cell(self.seed, dx, dz) {
                        return (anchor.x, anchor.z);
                    }
                }
            }
        }
        (0, 0)
    }

    /// Seeds a fluid candidate cell (deduplicated within the episode).
    pub fn flow_water(&mut self, x: i32, y: i32, z: i32) {
        self.water.enqueue(IVec3::new(x, y, z));
    }

    /// One budgeted propagation step. `true` means a block changed and dirty
    /// chunk meshes should be rebuilt.
    pub fn update_water(&mut self, dt: f32) -> bool {
        let mut water = std::mem::take(&mut self.water);
        let changed = water.update(self, dt);
        self.water = water;
        changed
    }

    /// One-time synchronous flood after initial load: fills air pockets next
    /// to full water at or below sea level so lake and ocean edges are not
    /// visibly hollow. Same spread rules as the incremental engine, run to
    /// completion inline.
    pub fn seed_initial_water_flow(&mut self) {
        let mut water = std::mem::take(&mut self.water);

        let mut seeds = Vec::new();
        for (&chunk_pos, chunk) in &self.chunks {
            for (index, &block) in chunk.blocks.blocks.iter().enumerate() {
                if block != BlockId::WATER {
                    continue;
                }
                let local = index_to_local(index);
                if i32::from(local.y) > SEA_LEVEL {
                    continue;
                }
                let world_pos = chunk_to_world(chunk_pos, local);
                for neighbor in [
                    world_pos + IVec3::NEG_Y,
                    world_pos + IVec3::X,
                    world_pos + IVec3::NEG_X,
                    world_pos + IVec3::Z,
                    world_pos + IVec3::NEG_Z,
                ] {
                    if self.get_block(neighbor.x, neighbor.y, neighbor.z) == BlockId::AIR {
                        seeds.push(neighbor);
                    }
                }
            }
        }

        for seed in seeds {
            water.enqueue(seed);
        }
        water.run_to_completion(self);
        self.water = water;
    }

    /// Commits any due village near the given chunk. Anchors whose radius-2
    /// chunk neighborhood is not fully generated are silently deferred, not
    /// marked used, and retried on a later call.
    pub fn place_villages_near(&mut self, cx: i32, cz: i32) {
        let candidates = village::villages_near(self.seed, ChunkPos::new(cx, cz));

        for anchor in candidates {
            let key = (anchor.x, anchor.z);
            if self.placed_villages.contains(&key) {
                continue;
            }
            if !self.village_dependencies_ready(anchor) {
                continue;
            }

            let mut writes: Vec<(IVec3, BlockId)> = Vec::new();
            {
                let height = |x: i32, z: i32| self.get_surface_height(x, z);
                village::place_village(anchor, self.seed, &height, &mut |x, y, z, block| {
                    writes.push((IVec3::new(x, y, z), block));
                });
            }

            for (pos, block) in writes {
                self.write_block(pos, block, false);
            }

            let center = anchor.chunk();
            for dz in -VILLAGE_CHUNK_RADIUS..=VILLAGE_CHUNK_RADIUS {
                for dx in -VILLAGE_CHUNK_RADIUS..=VILLAGE_CHUNK_RADIUS {
                    self.mark_dirty(center.offset(dx, dz));
                }
            }

            self.placed_villages.insert(key);
            debug!(x = anchor.x, z = anchor.z, "placed village");
        }
    }

    fn village_dependencies_ready(&self, anchor: VillageAnchor) -> bool {
        let center = anchor.chunk();
        for dz in -VILLAGE_CHUNK_RADIUS..=VILLAGE_CHUNK_RADIUS {
            for dx in -VILLAGE_CHUNK_RADIUS..=VILLAGE_CHUNK_RADIUS {
                if !self.is_generated(center.offset(dx, dz)) {
                    return false;
                }
            }
        }
        true
    }

    pub fn dirty_chunks(&self) -> Vec<ChunkPos> {
        self.chunks
            .iter()
            .filter(|(_, chunk)| chunk.dirty)
            .map(|(&pos, _)| pos)
            .collect()
    }

    pub fn clear_dirty(&mut self, pos: ChunkPos) {
        if let Some(chunk) = self.chunks.get_mut(&pos) {
            chunk.dirty = false;
        }
    }

    fn mark_dirty(&mut self, pos: ChunkPos) {
        if let Some(chunk) = self.chunks.get_mut(&pos) {
            chunk.dirty = true;
        }
    }
}
