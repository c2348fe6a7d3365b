//! The refresh pass: ship dirty chunks to the worker, mesh dirty voxel
//! blocks, install results that are still current.

use bevy::prelude::*;
use futures::future::try_join_all;

use crate::actions::ActionLog;
use crate::mesh::MeshBuffers;
use crate::voxel::{Voxel, VoxelBlock, mesh_block};
use crate::worker::{ExtractionRequest, GeometryWorker, WorkerError};
use crate::{CELL_SCALE, FIELD_SIZE};

use super::SculptSession;

struct BlockSnapshot {
    coord: IVec3,
    revision: u64,
    cells: Vec<Option<Voxel>>,
}

impl<W: GeometryWorker, L: ActionLog> SculptSession<W, L> {
    /// Re-extracts every dirty chunk and re-meshes every dirty voxel block.
    ///
    /// At most one pass runs at a time. Calling while a pass is in flight
    /// queues a rerun and returns immediately, so the running flight always
    /// ends with a pass that saw the caller's mutations. Use
    /// [`SculptSession::wait_refresh_idle`] to observe the installed result.
    pub async fn refresh(&self) -> Result<(), WorkerError> {
        if !self.inner.refresh_flight.try_begin() {
            return Ok(());
        }
        loop {
            match self.run_refresh_pass().await {
                Ok(()) => {
                    if !self.inner.refresh_flight.finish_pass() {
                        return Ok(());
                    }
                }
                Err(error) => {
                    // Dirty flags were never cleared, so the next refresh
                    // retries the same work.
                    self.inner.refresh_flight.abort();
                    return Err(error);
                }
            }
        }
    }

    /// Resolves once no refresh pass is running or queued.
    pub async fn wait_refresh_idle(&self) {
        self.inner.refresh_flight.wait_idle().await;
    }

    async fn run_refresh_pass(&self) -> Result<(), WorkerError> {
        let (chunk_meta, requests, block_snapshots) = {
            let state = self.lock_state();
            let mut chunk_meta = Vec::new();
            let mut requests = Vec::new();
            for chunk in state.chunks.iter().filter(|c| c.dirty) {
                chunk_meta.push((chunk.coord(), chunk.revision));
                requests.push(ExtractionRequest {
                    dims: UVec3::splat(FIELD_SIZE),
                    potential: chunk.field.potential().to_vec(),
                    color_field: chunk.field.color_field().to_vec(),
                    origin_shift: chunk.origin().as_vec3(),
                    cell_scale: Vec3::splat(CELL_SCALE),
                });
            }
            let block_snapshots: Vec<BlockSnapshot> = state
                .blocks
                .iter()
                .filter(|b| b.dirty)
                .map(|block| BlockSnapshot {
                    coord: block.coord(),
                    revision: block.revision,
                    cells: block.cells().to_vec(),
                })
                .collect();
            (chunk_meta, requests, block_snapshots)
        };

        if chunk_meta.is_empty() && block_snapshots.is_empty() {
            return Ok(());
        }
        debug!(
            chunks = chunk_meta.len(),
            blocks = block_snapshots.len(),
            "running extraction pass"
        );

        let extracts: Vec<_> = requests
            .into_iter()
            .map(|request| self.inner.worker.extract(request))
            .collect();
        let responses = try_join_all(extracts).await?;

        let block_meshes: Vec<MeshBuffers> = block_snapshots
            .iter()
            .map(|snapshot| mesh_block(&snapshot.cells, VoxelBlock::dims()))
            .collect();

        let mut state = self.lock_state();
        for (&(coord, revision), response) in chunk_meta.iter().zip(responses) {
            // A commit may have destroyed the chunk while the request was in
            // flight.
            let Some(chunk) = state.chunks.lookup_mut(coord) else {
                continue;
            };
            if response.indices.is_empty() {
                chunk.visible = false;
            } else {
                chunk.mesh = MeshBuffers::from_triangles(
                    response.positions,
                    response.colors,
                    response.indices,
                );
                chunk.visible = true;
            }
            if chunk.revision == revision {
                chunk.dirty = false;
            }
        }
        for (snapshot, mesh) in block_snapshots.iter().zip(block_meshes) {
            let Some(block) = state.blocks.lookup_mut(snapshot.coord) else {
                continue;
            };
            block.visible = !mesh.is_empty();
            block.mesh = mesh;
            if block.revision == snapshot.revision {
                block.dirty = false;
            }
        }
        Ok(())
    }
}
