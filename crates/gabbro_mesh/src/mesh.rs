use bytemuck::{Pod, Zeroable};

use gabbro_shared::block::{is_water_block, water_fill_level, BlockId, BlockRegistry};
use gabbro_shared::chunk::ChunkData;
use gabbro_shared::coords::{ChunkPos, LocalPos, CHUNK_HEIGHT, CHUNK_SIZE};
use gabbro_world::world::World;

use crate::atlas::{AtlasUv, GridAtlas};

const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;

// Fixed directional shading stands in for a lighting pass: sunlit tops,
// dim undersides, two side tones.
const SHADE_TOP: f32 = 1.0;
const SHADE_BOTTOM: f32 = 0.5;
const SHADE_FRONT_BACK: f32 = 0.8;
const SHADE_SIDE: f32 = 0.6;

const MAX_AO: u8 = 3;

// Exposed water tops sit slightly below the cell ceiling; partial fills
// scale with their level.
const FULL_WATER_SURFACE: f32 = 0.875;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub brightness: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// One rebuild's worth of geometry: opaque terrain, then water, then glass,
/// in the order the render collaborator draws them (alpha passes last,
/// depth-write off).
#[derive(Debug, Clone, Default)]
pub struct ChunkMeshes {
    pub solid: ChunkMesh,
    pub water: ChunkMesh,
    pub glass: ChunkMesh,
}

/// Read-only views of the XZ-adjacent chunks, for culling and occlusion at
/// the borders. A missing neighbor reads as air, matching the chunk store's
/// out-of-bounds semantics.
#[derive(Copy, Clone, Default)]
pub struct ChunkNeighbors<'a> {
    pub pos_x: Option<&'a ChunkData>,
    pub neg_x: Option<&'a ChunkData>,
    pub pos_z: Option<&'a ChunkData>,
    pub neg_z: Option<&'a ChunkData>,
}

#[derive(Copy, Clone)]
struct FaceSpec {
    axis: usize,
    sign: i32,
    u_axis: usize,
    v_axis: usize,
    normal: [f32; 3],
    shade: f32,
}

// u/v axis assignments keep every face wound counter-clockwise from outside.
const FACE_SPECS: [FaceSpec; 6] = [
    // +X
    FaceSpec {
        axis: 0,
        sign: 1,
        u_axis: 1,
        v_axis: 2,
        normal: [1.0, 0.0, 0.0],
        shade: SHADE_SIDE,
    },
    // -X
    FaceSpec {
        axis: 0,
        sign: -1,
        u_axis: 2,
        v_axis: 1,
        normal: [-1.0, 0.0, 0.0],
        shade: SHADE_SIDE,
    },
    // +Y
    FaceSpec {
        axis: 1,
        sign: 1,
        u_axis: 2,
        v_axis: 0,
        normal: [0.0, 1.0, 0.0],
        shade: SHADE_TOP,
    },
    // -Y
    FaceSpec {
        axis: 1,
        sign: -1,
        u_axis: 0,
        v_axis: 2,
        normal: [0.0, -1.0, 0.0],
        shade: SHADE_BOTTOM,
    },
    // +Z
    FaceSpec {
        axis: 2,
        sign: 1,
        u_axis: 0,
        v_axis: 1,
        normal: [0.0, 0.0, 1.0],
        shade: SHADE_FRONT_BACK,
    },
    // -Z
    FaceSpec {
        axis: 2,
        sign: -1,
        u_axis: 1,
        v_axis: 0,
        normal: [0.0, 0.0, -1.0],
        shade: SHADE_FRONT_BACK,
    },
];

fn sample_block(chunk: &ChunkData, neighbors: &ChunkNeighbors<'_>, coords: [i32; 3]) -> BlockId {
    let [x, y, z] = coords;
    if !(0..CHUNK_HEIGHT as i32).contains(&y) {
        return BlockId::AIR;
    }

    let (source, local_x, local_z) = if x < 0 {
        (neighbors.neg_x, x + CHUNK_SIZE_I32, z)
    } else if x >= CHUNK_SIZE_I32 {
        (neighbors.pos_x, x - CHUNK_SIZE_I32, z)
    } else if z < 0 {
        (neighbors.neg_z, x, z + CHUNK_SIZE_I32)
    } else if z >= CHUNK_SIZE_I32 {
        (neighbors.pos_z, x, z - CHUNK_SIZE_I32)
    } else {
        (Some(chunk), x, z)
    };

    // Diagonal neighbors are out of reach; they read as air like any other
    // missing chunk.
    if !(0..CHUNK_SIZE_I32).contains(&local_x) || !(0..CHUNK_SIZE_I32).contains(&local_z) {
        return BlockId::AIR;
    }

    match source {
        Some(data) => data.get(LocalPos {
            x: local_x as u8,
            y: y as u8,
            z: local_z as u8,
        }),
        None => BlockId::AIR,
    }
}

/// A face is drawn only toward see-through space: never between two opaque
/// blocks, never between two cells of the same transparent type, and never
/// between two water cells regardless of their fill levels.
fn face_visible(block: BlockId, neighbor: BlockId, registry: &BlockRegistry) -> bool {
    if is_water_block(block) {
        return !is_water_block(neighbor) && registry.is_transparent(neighbor);
    }

    if !registry.is_transparent(neighbor) {
        return false;
    }
    if registry.is_transparent(block) && neighbor == block {
        return false;
    }
    true
}

/// Corner occlusion term: two edge-adjacent samples and the diagonal between
/// them. Both edges occluded forces full darkness no matter the diagonal,
/// which keeps inside corners from popping bright.
fn corner_ao(side1: bool, side2: bool, corner: bool) -> u8 {
    if side1 && side2 {
        0
    } else {
        MAX_AO - (u8::from(side1) + u8::from(side2) + u8::from(corner))
    }
}

fn face_corner_ao(
    chunk: &ChunkData,
    neighbors: &ChunkNeighbors<'_>,
    registry: &BlockRegistry,
    face: FaceSpec,
    coords: [i32; 3],
) -> [u8; 4] {
    let mut adjacent = coords;
    adjacent[face.axis] += face.sign;

    let solid_at = |offset_u: i32, offset_v: i32| -> bool {
        let mut probe = adjacent;
        probe[face.u_axis] += offset_u;
        probe[face.v_axis] += offset_v;
        registry.is_solid(sample_block(chunk, neighbors, probe))
    };

    // Quad corner order matches the emitted vertex order: (u, v) in
    // (0,0), (1,0), (1,1), (0,1).
    let corner_signs = [(-1, -1), (1, -1), (1, 1), (-1, 1)];
    let mut ao = [MAX_AO; 4];
    for (index, (su, sv)) in corner_signs.into_iter().enumerate() {
        let side1 = solid_at(su, 0);
        let side2 = solid_at(0, sv);
        let corner = solid_at(su, sv);
        ao[index] = corner_ao(side1, side2, corner);
    }
    ao
}

fn push_quad(
    mesh: &mut ChunkMesh,
    positions: [[f32; 3]; 4],
    normal: [f32; 3],
    uvs: [[f32; 2]; 4],
    brightness: [f32; 4],
    flip_diagonal: bool,
) {
    let base = mesh.vertices.len() as u32;
    for i in 0..4 {
        mesh.vertices.push(MeshVertex {
            position: positions[i],
            normal,
            uv: uvs[i],
            brightness: brightness[i],
        });
    }

    // Split along the diagonal joining the darker corner pair so occlusion
    // interpolates along the gradient instead of across it.
    let order: [u32; 6] = if flip_diagonal {
        [0, 1, 3, 1, 2, 3]
    } else {
        [0, 1, 2, 0, 2, 3]
    };
    mesh.indices.extend(order.iter().map(|i| base + i));
}

fn water_surface_height(fill: u8) -> f32 {
    if fill >= 4 {
        FULL_WATER_SURFACE
    } else {
        f32::from(fill) * 0.25
    }
}

/// Rebuilds every buffer for one chunk from its block array plus read-only
/// neighbor access. Pure and idempotent: unchanged input yields identical
/// geometry, and the returned value replaces (and thereby disposes) any
/// previous build.
pub fn build_chunk_meshes(
    chunk: &ChunkData,
    registry: &BlockRegistry,
    neighbors: &ChunkNeighbors<'_>,
    chunk_pos: ChunkPos,
    atlas: &dyn AtlasUv,
) -> ChunkMeshes {
    let mut meshes = ChunkMeshes::default();
    let world_offset = [
        (chunk_pos.x * CHUNK_SIZE_I32) as f32,
        0.0,
        (chunk_pos.z * CHUNK_SIZE_I32) as f32,
    ];

    for x in 0..CHUNK_SIZE {
        for y in 0..CHUNK_HEIGHT {
            for z in 0..CHUNK_SIZE {
                let block = chunk.get(LocalPos {
                    x: x as u8,
                    y: y as u8,
                    z: z as u8,
                });
                if block == BlockId::AIR {
                    continue;
                }

                let coords = [x as i32, y as i32, z as i32];
                let water_fill = water_fill_level(block);

                for (face_index, face) in FACE_SPECS.iter().enumerate() {
                    let mut adjacent = coords;
                    adjacent[face.axis] += face.sign;
                    let neighbor = sample_block(chunk, neighbors, adjacent);

                    if !face_visible(block, neighbor, registry) {
                        continue;
                    }

                    if let Some(fill) = water_fill {
                        emit_fluid_face(
                            &mut meshes.water,
                            *face,
                            face_index,
                            coords,
                            world_offset,
                            block,
                            fill,
                            atlas,
                        );
                    } else if block == BlockId::GLASS {
                        emit_flat_face(
                            &mut meshes.glass,
                            *face,
                            face_index,
                            coords,
                            world_offset,
                            block,
                            atlas,
                        );
                    } else {
                        emit_solid_face(
                            &mut meshes.solid,
                            chunk,
                            neighbors,
                            registry,
                            *face,
                            face_index,
                            coords,
                            world_offset,
                            block,
                            atlas,
                        );
                    }
                }
            }
        }
    }

    meshes
}

fn face_positions(face: FaceSpec, coords: [i32; 3], world_offset: [f32; 3]) -> [[f32; 3]; 4] {
    let slice = coords[face.axis];
    let plane = if face.sign > 0 { slice + 1 } else { slice };
    let u = coords[face.u_axis];
    let v = coords[face.v_axis];

    let mut positions = [[0.0f32; 3]; 4];
    for (index, (du, dv)) in [(0, 0), (1, 0), (1, 1), (0, 1)].into_iter().enumerate() {
        let mut p = [0.0f32; 3];
        p[face.axis] = plane as f32;
        p[face.u_axis] = (u + du) as f32;
        p[face.v_axis] = (v + dv) as f32;
        positions[index] = [
            p[0] + world_offset[0],
            p[1] + world_offset[1],
            p[2] + world_offset[2],
        ];
    }
    positions
}

fn face_uvs(block: BlockId, face_index: usize, atlas: &dyn AtlasUv) -> [[f32; 2]; 4] {
    let [u0, v0] = atlas.uv_origin(block, face_index);
    let ts = atlas.tile_size();
    [
        [u0, v0],
        [u0 + ts, v0],
        [u0 + ts, v0 + ts],
        [u0, v0 + ts],
    ]
}

fn emit_solid_face(
    mesh: &mut ChunkMesh,
    chunk: &ChunkData,
    neighbors: &ChunkNeighbors<'_>,
    registry: &BlockRegistry,
    face: FaceSpec,
    face_index: usize,
    coords: [i32; 3],
    world_offset: [f32; 3],
    block: BlockId,
    atlas: &dyn AtlasUv,
) {
    let ao = face_corner_ao(chunk, neighbors, registry, face, coords);

    let mut brightness = [0.0f32; 4];
    for i in 0..4 {
        brightness[i] = (0.5 + 0.5 * f32::from(ao[i]) / f32::from(MAX_AO)) * face.shade;
    }

    // Darker corner pair decides the split diagonal.
    let flip_diagonal = u16::from(ao[0]) + u16::from(ao[2]) > u16::from(ao[1]) + u16::from(ao[3]);

    push_quad(
        mesh,
        face_positions(face, coords, world_offset),
        face.normal,
        face_uvs(block, face_index, atlas),
        brightness,
        flip_diagonal,
    );
}

fn emit_flat_face(
    mesh: &mut ChunkMesh,
    face: FaceSpec,
    face_index: usize,
    coords: [i32; 3],
    world_offset: [f32; 3],
    block: BlockId,
    atlas: &dyn AtlasUv,
) {
    // Alpha-blended faces skip occlusion entirely: flat maximum AO.
    push_quad(
        mesh,
        face_positions(face, coords, world_offset),
        face.normal,
        face_uvs(block, face_index, atlas),
        [face.shade; 4],
        false,
    );
}

fn emit_fluid_face(
    mesh: &mut ChunkMesh,
    face: FaceSpec,
    face_index: usize,
    coords: [i32; 3],
    world_offset: [f32; 3],
    block: BlockId,
    fill: u8,
    atlas: &dyn AtlasUv,
) {
    let mut positions = face_positions(face, coords, world_offset);

    // Pull the top edge down to the fill surface so partial cells read as
    // partially full.
    let cell_top = coords[1] as f32 + 1.0;
    let surface = coords[1] as f32 + water_surface_height(fill);
    for position in &mut positions {
        if (position[1] - cell_top).abs() < f32::EPSILON {
            position[1] = surface;
        }
    }

    push_quad(
        mesh,
        positions,
        face.normal,
        face_uvs(block, face_index, atlas),
        [face.shade; 4],
        false,
    );
}

/// Chunk-store-aware wrapper: resolves neighbors, builds all three buffers,
/// and clears the chunk's dirty flag on completion.
pub struct ChunkMesher {
    atlas: GridAtlas,
}

impl Default for ChunkMesher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkMesher {
    pub fn new() -> Self {
        Self {
            atlas: GridAtlas::default(),
        }
    }

    pub fn with_atlas(atlas: GridAtlas) -> Self {
        Self { atlas }
    }

    pub fn build_mesh(&self, world: &mut World, pos: ChunkPos) -> Option<ChunkMeshes> {
        let meshes = {
            let chunk = world.chunk(pos)?;
            let neighbors = ChunkNeighbors {
                pos_x: world.chunk(pos.offset(1, 0)).map(|c| &c.blocks),
                neg_x: world.chunk(pos.offset(-1, 0)).map(|c| &c.blocks),
                pos_z: world.chunk(pos.offset(0, 1)).map(|c| &c.blocks),
                neg_z: world.chunk(pos.offset(0, -1)).map(|c| &c.blocks),
            };
            build_chunk_meshes(&chunk.blocks, world.registry(), &neighbors, pos, &self.atlas)
        };

        world.clear_dirty(pos);
        Some(meshes)
    }
}
