use gabbro_shared::block::{is_water_block, water_fill_level, BlockId, MAX_WATER_FILL};
use gabbro_shared::chunk::ChunkData;
use gabbro_shared::coords::{ChunkPos, LocalPos, CHUNK_SIZE};
use gabbro_world::terrain::SEA_LEVEL;
use gabbro_world::village;
use gabbro_world::world::World;

#[test]
fn end_to_end_generation_and_water_propagation() {
    let mut world = World::new(12345);
    world.generate_chunk(0, 0);

    assert_eq!(world.get_block(8, 0, 8), BlockId::BEDROCK);

    // The column transitions from ground to open space at its surface, and
    // anything between the surface and sea level is water.
    let surface = world.get_surface_height(8, 8);
    assert!(surface >= 1);
    let above = world.get_block(8, surface + 1, 8);
    assert!(above == BlockId::AIR || is_water_block(above));
    if surface < SEA_LEVEL {
        assert_eq!(world.get_block(8, SEA_LEVEL, 8), BlockId::WATER);
    }

    // Record pre-existing water around the edit site. The source goes well
    // above any canopy so its neighborhood is guaranteed open air.
    let source_y = (surface + 12).min(125);
    let mut pre_existing = std::collections::HashSet::new();
    for y in 0..128 {
        for dz in -6..=6 {
            for dx in -6..=6 {
                if is_water_block(world.get_block(8 + dx, y, 8 + dz)) {
                    pre_existing.insert((8 + dx, y, 8 + dz));
                }
            }
        }
    }

    world.set_block(8, source_y, 8, BlockId::WATER);

    let mut saw_partial_neighbor = false;
    let mut guard = 0;
    while world.update_water(0.2) {
        guard += 1;
        assert!(guard < 10_000, "water propagation failed to settle");

        for (nx, nz) in [(7, 8), (9, 8), (8, 7), (8, 9)] {
            if let Some(level) = water_fill_level(world.get_block(nx, source_y, nz)) {
                if level < MAX_WATER_FILL {
                    saw_partial_neighbor = true;
                }
            }
        }
    }

    assert!(
        saw_partial_neighbor,
        "lateral spread should pass through partial fill levels"
    );

    // Nothing the edit created may sit further than 4 lateral steps out.
    for y in 0..128 {
        for dz in -6..=6i32 {
            for dx in -6..=6i32 {
                let cell = (8 + dx, y, 8 + dz);
                if pre_existing.contains(&cell) {
                    continue;
                }
                if is_water_block(world.get_block(cell.0, cell.1, cell.2)) {
                    assert!(
                        dx.abs() + dz.abs() <= 4,
                        "water escaped containment at {cell:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn water_spread_is_contained_and_monotonic_on_a_flat_plane() {
    let mut world = World::new(0);
    let mut blocks = ChunkData::new_empty();
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            blocks.set(
                LocalPos {
                    x: x as u8,
                    y: 20,
                    z: z as u8,
                },
                BlockId::STONE,
            );
        }
    }
    world.load_chunk_from_data(0, 0, blocks);

    world.set_block(8, 21, 8, BlockId::WATER);

    let mut last_levels = [[0u8; CHUNK_SIZE]; CHUNK_SIZE];
    last_levels[8][8] = MAX_WATER_FILL;

    let mut guard = 0;
    while world.update_water(0.2) {
        guard += 1;
        assert!(guard < 5_000, "flat-plane flood failed to settle");

        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let level =
                    water_fill_level(world.get_block(x as i32, 21, z as i32)).unwrap_or(0);
                assert!(
                    level >= last_levels[z][x],
                    "fill level regressed at ({x}, {z})"
                );
                last_levels[z][x] = level;
            }
        }
    }

    for z in 0..CHUNK_SIZE as i32 {
        for x in 0..CHUNK_SIZE as i32 {
            let filled = is_water_block(world.get_block(x, 21, z));
            let distance = (x - 8).abs() + (z - 8).abs();
            if filled {
                assert!(distance <= 4, "water at ({x}, {z}) escaped the diamond");
            }
            if distance == 0 {
                assert!(filled);
            }
        }
    }

    // The four direct neighbors of a lone source end up full.
    assert_eq!(world.get_block(7, 21, 8), BlockId::WATER);
    assert_eq!(world.get_block(8, 21, 7), BlockId::WATER);
}

#[test]
fn flow_water_candidate_fills_from_an_adjacent_source() {
    let mut world = World::new(0);
    let mut blocks = ChunkData::new_empty();
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            blocks.set(
                LocalPos {
                    x: x as u8,
                    y: 20,
                    z: z as u8,
                },
                BlockId::STONE,
            );
        }
    }
    // Source installed directly in the data, so only the explicit candidate
    // seeds the queue.
    blocks.set(LocalPos { x: 8, y: 21, z: 8 }, BlockId::WATER);
    world.load_chunk_from_data(0, 0, blocks);

    world.flow_water(9, 21, 8);
    // Re-seeding the same cell within an episode is deduplicated.
    world.flow_water(9, 21, 8);

    let mut guard = 0;
    while world.update_water(0.2) {
        guard += 1;
        assert!(guard < 5_000);
    }

    assert_eq!(world.get_block(9, 21, 8), BlockId::WATER);
    for z in 0..CHUNK_SIZE as i32 {
        for x in 0..CHUNK_SIZE as i32 {
            if (x, z) == (8, 8) {
                continue;
            }
            if is_water_block(world.get_block(x, 21, z)) {
                assert!(
                    (x - 9).abs() + (z - 8).abs() <= 4,
                    "spread escaped the candidate's diamond at ({x}, {z})"
                );
            }
        }
    }
}

#[test]
fn villages_defer_until_their_neighborhood_exists() {
    // A seed whose origin cell hosts a village keeps the test local.
    let seed = (0..)
        .find(|&seed| village::village_in_cell(seed, 0, 0).is_some())
        .expect("some seed hosts a village in cell (0, 0)");
    let anchor = village::village_in_cell(seed, 0, 0).expect("anchor exists");

    let mut world = World::new(seed);
    let center = anchor.chunk();

    // Nothing is generated yet: placement defers silently.
    world.place_villages_near(center.x, center.z);

    world.generate_chunk(center.x, center.z);
    let before = count_village_blocks(&world, anchor);

    // One missing neighbor still defers.
    world.place_villages_near(center.x, center.z);
    assert_eq!(count_village_blocks(&world, anchor), before);

    for dz in -village::VILLAGE_CHUNK_RADIUS..=village::VILLAGE_CHUNK_RADIUS {
        for dx in -village::VILLAGE_CHUNK_RADIUS..=village::VILLAGE_CHUNK_RADIUS {
            world.generate_chunk(center.x + dx, center.z + dz);
        }
    }

    world.place_villages_near(center.x, center.z);
    let placed = count_village_blocks(&world, anchor);
    assert!(placed > before, "village should commit once chunks exist");

    // Committed anchors are never re-placed: overwrite one village block and
    // confirm a repeat call leaves the edit alone.
    let well_y = world.get_surface_height(anchor.x, anchor.z);
    world.set_block(anchor.x, well_y + 1, anchor.z, BlockId::SNOW);
    world.place_villages_near(center.x, center.z);
    assert_eq!(world.get_block(anchor.x, well_y + 1, anchor.z), BlockId::SNOW);
}

fn count_village_blocks(world: &World, anchor: village::VillageAnchor) -> usize {
    let mut count = 0;
    for y in 0..128 {
        for dz in -20..=20 {
            for dx in -20..=20 {
                let block = world.get_block(anchor.x + dx, y, anchor.z + dz);
                if block == BlockId::COBBLESTONE || block == BlockId::PLANKS {
                    count += 1;
                }
            }
        }
    }
    count
}

#[test]
fn initial_flood_fills_pockets_beside_sea_water() {
    let mut world = World::new(0);
    let mut blocks = ChunkData::new_empty();

    // Floor below sea level, one full water cell, one air pocket beside it.
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            blocks.set(
                LocalPos {
                    x: x as u8,
                    y: 30,
                    z: z as u8,
                },
                BlockId::STONE,
            );
        }
    }
    blocks.set(LocalPos { x: 5, y: 31, z: 5 }, BlockId::WATER);
    world.load_chunk_from_data(0, 0, blocks);

    world.seed_initial_water_flow();

    // Pocket next to the seeded water is filled, and the fill is bounded.
    assert!(is_water_block(world.get_block(6, 31, 5)));
    assert!(is_water_block(world.get_block(4, 31, 5)));
    assert_eq!(world.get_block(5, 31, 5), BlockId::WATER);
    for z in 0..CHUNK_SIZE as i32 {
        for x in 0..CHUNK_SIZE as i32 {
            if is_water_block(world.get_block(x, 31, z)) {
                assert!((x - 5).abs() + (z - 5).abs() <= 5);
            }
        }
    }
}

#[test]
fn two_worlds_with_one_seed_are_byte_identical() {
    let mut a = World::new(777);
    let mut b = World::new(777);

    for (cx, cz) in [(0, 0), (1, 0), (-2, 3)] {
        a.generate_chunk(cx, cz);
        b.generate_chunk(cx, cz);

        let chunk_a = a.chunk(ChunkPos::new(cx, cz)).expect("chunk a");
        let chunk_b = b.chunk(ChunkPos::new(cx, cz)).expect("chunk b");
        assert_eq!(chunk_a.blocks, chunk_b.blocks);
    }
}
