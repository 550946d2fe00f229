use std::collections::VecDeque;

use glam::IVec3;
use rustc_hash::FxHashSet;
use tracing::debug;

use gabbro_shared::block::{
    is_water_block, water_block_from_fill, water_fill_level, BlockId, MAX_WATER_FILL,
};

use crate::world::World;

/// Minimum simulated time between propagation steps.
pub const WATER_TICK_INTERVAL: f32 = 0.15;

/// Lateral spread never exceeds this many steps from its seed; lakes stay
/// lakes instead of flooding the map.
pub const MAX_HORIZONTAL_SPREAD: u8 = 4;

/// Level-changes allowed per episode before the engine gives up and resets.
/// Applied changes persist; only unprocessed queue entries are dropped.
pub const EPISODE_CHANGE_BUDGET: u32 = 200;

pub(crate) const HORIZONTAL_DIRECTIONS: [IVec3; 4] = [
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

enum CellOutcome {
    Advanced,
    Skipped,
}

/// Incremental water propagation. Cells advance through discrete fill levels,
/// one visible change per update call, so flooding animates at the rebuild
/// cadence of the render loop instead of landing in a single frame.
#[derive(Default)]
pub struct WaterFlow {
    queue: VecDeque<(IVec3, u8)>,
    visited: FxHashSet<IVec3>,
    accumulator: f32,
    episode_changes: u32,
}

impl WaterFlow {
    /// Seeds a candidate cell, deduplicated within the current episode.
    pub fn enqueue(&mut self, pos: IVec3) {
        self.enqueue_spread(pos, 0);
    }

    /// Seeds a candidate with a pre-attributed lateral distance, e.g. the
    /// direct neighbors of a freshly placed source sit one step out already.
    pub(crate) fn enqueue_at(&mut self, pos: IVec3, horizontal_distance: u8) {
        self.enqueue_spread(pos, horizontal_distance);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    fn enqueue_spread(&mut self, pos: IVec3, horizontal_distance: u8) {
        if self.visited.insert(pos) {
            self.queue.push_back((pos, horizontal_distance));
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.visited.clear();
        self.episode_changes = 0;
    }

    /// Runs at most one visible change. Returns `true` when a block changed
    /// and the caller should rebuild dirty chunk meshes; `false` when the
    /// time gate is closed, the queue drained, or the episode budget ran out
    /// (the latter two reset queue and visited set).
    pub fn update(&mut self, world: &mut World, dt: f32) -> bool {
        self.accumulator += dt;
        if self.accumulator < WATER_TICK_INTERVAL {
            return false;
        }
        self.accumulator = 0.0;

        while let Some((pos, horizontal_distance)) = self.queue.pop_front() {
            match self.advance_cell(world, pos, horizontal_distance) {
                CellOutcome::Skipped => continue,
                CellOutcome::Advanced => {
                    self.episode_changes += 1;
                    if self.episode_changes >= EPISODE_CHANGE_BUDGET {
                        debug!(
                            budget = EPISODE_CHANGE_BUDGET,
                            dropped = self.queue.len(),
                            "water episode budget exhausted, resetting queue"
                        );
                        self.reset();
                        return false;
                    }
                    return true;
                }
            }
        }

        self.reset();
        false
    }

    /// The synchronous variant behind `seed_initial_water_flow`: same rules,
    /// no time gate, no budget, runs until the queue drains.
    pub fn run_to_completion(&mut self, world: &mut World) {
        let mut changes = 0u32;
        while let Some((pos, horizontal_distance)) = self.queue.pop_front() {
            if let CellOutcome::Advanced = self.advance_cell(world, pos, horizontal_distance) {
                changes += 1;
            }
        }
        self.reset();
        debug!(changes, "initial water flood settled");
    }

    fn advance_cell(&mut self, world: &mut World, pos: IVec3, horizontal_distance: u8) -> CellOutcome {
        let block = world.get_block(pos.x, pos.y, pos.z);
        let fill = water_fill_level(block);

        // Solid blocks are never displaced; full water is terminal.
        if block != BlockId::AIR && fill.is_none() {
            return CellOutcome::Skipped;
        }
        if fill == Some(MAX_WATER_FILL) {
            return CellOutcome::Skipped;
        }

        let fed_from_above = is_water_block(world.get_block(pos.x, pos.y + 1, pos.z));
        let fed_from_side = HORIZONTAL_DIRECTIONS.iter().any(|dir| {
            let n = pos + *dir;
            is_water_block(world.get_block(n.x, n.y, n.z))
        });

        // Nothing to flow from; drop the entry.
        if !fed_from_above && !fed_from_side {
            return CellOutcome::Skipped;
        }

        // Gravity-fed cells fill in one step; lateral feeds advance a level
        // at a time. Within an episode a cell's level only ever increases.
        let new_fill = if fed_from_above {
            MAX_WATER_FILL
        } else {
            fill.unwrap_or(0) + 1
        };

        if !world.write_block(pos, water_block_from_fill(new_fill), true) {
            return CellOutcome::Skipped;
        }

        if new_fill < MAX_WATER_FILL {
            // Not full yet: keep filling on a later tick.
            self.queue.push_back((pos, horizontal_distance));
        } else {
            world.notify_water_settled(pos);
            self.enqueue_spread(pos + IVec3::NEG_Y, horizontal_distance);
            if horizontal_distance < MAX_HORIZONTAL_SPREAD {
                for dir in HORIZONTAL_DIRECTIONS {
                    self.enqueue_spread(pos + dir, horizontal_distance + 1);
                }
            }
        }

        CellOutcome::Advanced
    }
}
