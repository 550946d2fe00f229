use std::env;
use std::sync::Arc;
use std::time::Instant;

use glam::{IVec3, Vec3};
use tracing::info;

use gabbro_mesh::worker::{MeshRequest, MeshWorker};
use gabbro_shared::block::{is_water_block, BlockId};
use gabbro_shared::coords::{ChunkPos, CHUNK_HEIGHT, CHUNK_SIZE};
use gabbro_shared::physics::{Axis, KinematicBody};
use gabbro_world::world::World;

const PLAYER_WIDTH: f32 = 0.6;
const PLAYER_HEIGHT: f32 = 1.8;
const GRAVITY: f32 = -24.0;
const SETTLE_TICK: f32 = 1.0 / 60.0;

struct ProbeConfig {
    seed: u64,
    radius: i32,
    mesh: bool,
    water_ticks: u32,
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut config = ProbeConfig {
        seed: 12345,
        radius: 3,
        mesh: false,
        water_ticks: 0,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let Some(value) = args.next() else {
                    eprintln!("--seed expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u64>() {
                    Ok(parsed) => config.seed = parsed,
                    Err(err) => {
                        eprintln!("invalid seed '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--radius" => {
                let Some(value) = args.next() else {
                    eprintln!("--radius expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<i32>() {
                    Ok(parsed) if parsed >= 0 => config.radius = parsed,
                    Ok(_) => {
                        eprintln!("--radius must be non-negative");
                        std::process::exit(2);
                    }
                    Err(err) => {
                        eprintln!("invalid radius '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--water-ticks" => {
                let Some(value) = args.next() else {
                    eprintln!("--water-ticks expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u32>() {
                    Ok(parsed) => config.water_ticks = parsed,
                    Err(err) => {
                        eprintln!("invalid tick count '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--mesh" => config.mesh = true,
            "--help" | "-h" => {
                println!(
                    "Usage: world_probe [--seed <u64>] [--radius <chunks>] [--mesh] [--water-ticks <n>]"
                );
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    run(config);
}

fn run(config: ProbeConfig) {
    let mut world = World::new(config.seed);

    let started = Instant::now();
    for cz in -config.radius..=config.radius {
        for cx in -config.radius..=config.radius {
            world.generate_chunk(cx, cz);
        }
    }
    info!(
        seed = config.seed,
        chunks = world.chunk_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generated region"
    );

    for cz in -config.radius..=config.radius {
        for cx in -config.radius..=config.radius {
            world.place_villages_near(cx, cz);
        }
    }

    let flood_started = Instant::now();
    world.seed_initial_water_flow();
    info!(
        elapsed_ms = flood_started.elapsed().as_millis() as u64,
        "initial water flood settled"
    );

    let mut rebuilds = 0u32;
    for _ in 0..config.water_ticks {
        if world.update_water(0.2) {
            rebuilds += 1;
        }
    }
    if config.water_ticks > 0 {
        info!(
            ticks = config.water_ticks,
            rebuilds, "ran incremental water updates"
        );
    }

    report_terrain(&world, config.radius);

    let spawn = world.get_spawn_point();
    info!(x = spawn.x, y = spawn.y, z = spawn.z, "spawn point");

    settle_player(&world, spawn);

    if config.mesh {
        report_meshes(&mut world, config.radius);
    }
}

/// Drops a player-sized body at the spawn point until it rests on solid
/// ground, as a sanity pass over collision against the generated terrain.
fn settle_player(world: &World, spawn: Vec3) {
    let mut body = KinematicBody::new(spawn, PLAYER_WIDTH, PLAYER_HEIGHT);
    let is_solid = |cell: IVec3| world.is_solid(cell.x, cell.y, cell.z);

    let mut ticks = 0u32;
    while !body.on_ground && ticks < 1200 {
        body.velocity.y += GRAVITY * SETTLE_TICK;
        body.move_axis(Axis::Y, body.velocity.y * SETTLE_TICK, &is_solid);
        ticks += 1;
    }

    info!(
        ticks,
        x = body.position.x,
        y = body.position.y,
        z = body.position.z,
        on_ground = body.on_ground,
        "player settled"
    );
}

fn report_terrain(world: &World, radius: i32) {
    let mut min_height = CHUNK_HEIGHT as i32;
    let mut max_height = 0;
    let mut water_columns = 0u32;
    let mut solid_blocks = 0u64;

    let span = radius * CHUNK_SIZE as i32;
    for z in -span..span + CHUNK_SIZE as i32 {
        for x in -span..span + CHUNK_SIZE as i32 {
            let height = world.get_surface_height(x, z);
            min_height = min_height.min(height);
            max_height = max_height.max(height);
            if is_water_block(world.get_block(x, height + 1, z)) {
                water_columns += 1;
            }
            for y in 0..CHUNK_HEIGHT as i32 {
                let block = world.get_block(x, y, z);
                if block != BlockId::AIR && !is_water_block(block) {
                    solid_blocks += 1;
                }
            }
        }
    }

    info!(
        min_height,
        max_height, water_columns, solid_blocks, "terrain summary"
    );
}

fn report_meshes(world: &mut World, radius: i32) {
    let worker = MeshWorker::new();
    let registry = Arc::new(world.registry().clone());

    let started = Instant::now();
    let mut submitted = 0usize;
    for cz in -radius..=radius {
        for cx in -radius..=radius {
            let pos = ChunkPos::new(cx, cz);
            let Some(chunk) = world.chunk(pos) else {
                continue;
            };
            let neighbor_data = |p: ChunkPos| world.chunk(p).map(|c| c.blocks.clone());
            worker.submit(MeshRequest {
                chunk_pos: pos,
                chunk: chunk.blocks.clone(),
                neighbors: [
                    neighbor_data(pos.offset(1, 0)),
                    neighbor_data(pos.offset(-1, 0)),
                    neighbor_data(pos.offset(0, 1)),
                    neighbor_data(pos.offset(0, -1)),
                ],
                registry: Arc::clone(&registry),
                version: 0,
            });
            submitted += 1;
        }
    }

    let mut solid_quads = 0usize;
    let mut water_quads = 0usize;
    let mut glass_quads = 0usize;
    let mut completed = 0usize;
    while completed < submitted {
        for (pos, meshes, _) in worker.poll() {
            solid_quads += meshes.solid.quad_count();
            water_quads += meshes.water.quad_count();
            glass_quads += meshes.glass.quad_count();
            world.clear_dirty(pos);
            completed += 1;
        }
        std::thread::yield_now();
    }

    info!(
        chunks = submitted,
        solid_quads,
        water_quads,
        glass_quads,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "meshed region"
    );
}
