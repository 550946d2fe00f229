use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use gabbro_shared::block::BlockRegistry;
use gabbro_shared::chunk::ChunkData;
use gabbro_shared::coords::ChunkPos;

use crate::atlas::GridAtlas;
use crate::mesh::{build_chunk_meshes, ChunkMeshes, ChunkNeighbors};

/// Owned snapshot of everything one rebuild needs. Copies keep the workers
/// free of locks: the store can keep mutating while a build runs, and stale
/// results are discarded by the version tag.
pub struct MeshRequest {
    pub chunk_pos: ChunkPos,
    pub chunk: ChunkData,
    /// Neighbor order: +X, -X, +Z, -Z.
    pub neighbors: [Option<ChunkData>; 4],
    pub registry: Arc<BlockRegistry>,
    pub version: u64,
}

/// Background chunk meshing on a rayon pool, results drained through an
/// mpsc channel by the caller's tick.
pub struct MeshWorker {
    pool: ThreadPool,
    atlas: GridAtlas,
    completed_tx: Sender<(ChunkPos, ChunkMeshes, u64)>,
    completed_rx: Receiver<(ChunkPos, ChunkMeshes, u64)>,
}

impl MeshWorker {
    pub fn new() -> Self {
        let available = std::thread::available_parallelism()
            .map(|parallelism| parallelism.get())
            .unwrap_or(4);
        let worker_threads = available.saturating_sub(1).clamp(2, 8);
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|index| format!("mesh-worker-{index}"))
            .build()
            .expect("failed to create mesh worker thread pool");
        let (completed_tx, completed_rx) = mpsc::channel();
        debug!(worker_threads, "mesh worker pool started");

        Self {
            pool,
            atlas: GridAtlas::default(),
            completed_tx,
            completed_rx,
        }
    }

    pub fn submit(&self, request: MeshRequest) {
        let completed_tx = self.completed_tx.clone();
        let atlas = self.atlas;
        self.pool.spawn(move || {
            let neighbors = ChunkNeighbors {
                pos_x: request.neighbors[0].as_ref(),
                neg_x: request.neighbors[1].as_ref(),
                pos_z: request.neighbors[2].as_ref(),
                neg_z: request.neighbors[3].as_ref(),
            };
            let meshes = build_chunk_meshes(
                &request.chunk,
                &request.registry,
                &neighbors,
                request.chunk_pos,
                &atlas,
            );
            let _ = completed_tx.send((request.chunk_pos, meshes, request.version));
        });
    }

    /// Finished builds, in completion order. Non-blocking.
    pub fn poll(&self) -> Vec<(ChunkPos, ChunkMeshes, u64)> {
        let mut completed = Vec::new();
        while let Ok(result) = self.completed_rx.try_recv() {
            completed.push(result);
        }
        completed
    }
}

impl Default for MeshWorker {
    fn default() -> Self {
        Self::new()
    }
}
