//! The commit pipelines: freeze the edited volume into a static object.

use std::sync::Arc;

use bevy::math::Affine3A;
use bevy::prelude::*;

use crate::CELL_SCALE;
use crate::actions::{ActionLog, SculptObject, SharedObject, UndoAction};
use crate::mesh::MeshBuffers;
use crate::worker::{GeometryWorker, UvRequest, WorkerError};

use super::SculptSession;

impl<W: GeometryWorker, L: ActionLog> SculptSession<W, L> {
    /// Commits the potential-field volume: refreshes, merges every visible
    /// chunk mesh into one recentered object, destroys the chunks, records
    /// the add action, then installs the worker's UV parameterization.
    ///
    /// Returns `Ok(None)` when the volume holds no visible surface (the
    /// chunks are left alone) or when the call coalesced into a field
    /// commit that was already running. Field and voxel commits run on
    /// separate flights, so neither ever coalesces into the other.
    pub async fn commit(&self) -> Result<Option<SharedObject>, WorkerError> {
        if !self.inner.commit_flight.try_begin() {
            self.inner.commit_flight.wait_idle().await;
            return Ok(None);
        }
        let mut committed = None;
        loop {
            match self.run_commit_pass().await {
                Ok(object) => {
                    // A trailing pass commits anything painted while the
                    // first pass ran; its object still reaches the host
                    // through the action log.
                    if committed.is_none() {
                        committed = object;
                    }
                    if !self.inner.commit_flight.finish_pass() {
                        return Ok(committed);
                    }
                }
                Err(error) => {
                    self.inner.commit_flight.abort();
                    Err(error)?
                }
            }
        }
    }

    async fn run_commit_pass(&self) -> Result<Option<SharedObject>, WorkerError> {
        // Every mutation made before the commit call lands in the merge.
        self.refresh().await?;
        self.wait_refresh_idle().await;

        let staged = {
            let mut state = self.lock_state();
            let mut merged = MeshBuffers::new();
            for chunk in state.chunks.iter().filter(|c| c.visible && !c.mesh.is_empty()) {
                merged.merge(&chunk.mesh);
            }
            let Some(center) = merged.center() else {
                return Ok(None);
            };
            merged.translate(-center);

            // Chunk meshes live in container space; the committed object is
            // scene-level, so the container transform is factored out.
            let container = state.container;
            let container_affine = Affine3A::from_scale_rotation_translation(
                container.scale,
                container.rotation,
                container.translation,
            );
            let transform = Transform::from_matrix(Mat4::from(
                container_affine.inverse() * Affine3A::from_translation(center),
            ));

            state.chunks.clear();

            let object = SculptObject {
                id: self.next_object_id(),
                mesh: merged,
                transform,
            }
            .into_shared();
            self.inner
                .log
                .record(UndoAction::AddObjects(vec![Arc::clone(&object)]));
            object
        };

        let request = {
            let object = staged.lock().expect("object poisoned");
            UvRequest {
                positions: object.mesh.positions.clone(),
                colors: object.mesh.colors.clone(),
                indices: object.mesh.indices.clone(),
            }
        };
        let response = self.inner.worker.parameterize(request).await?;
        {
            // Seam splits may have changed the vertex set; install every
            // buffer, not just the UV layer.
            let mut object = staged.lock().expect("object poisoned");
            object.mesh.positions = response.positions;
            object.mesh.colors = response.colors;
            object.mesh.uvs = Some(response.uvs);
            object.mesh.indices = response.indices;
            object.mesh.recompute_normals();
            object.mesh.debug_validate();
        }
        info!("committed sculpted volume into one object");
        Ok(Some(staged))
    }

    /// Commits the voxel layer: merges every visible block mesh into one
    /// object scaled from grid to world units. No UV pass; voxel objects
    /// stay flat-colored.
    ///
    /// Coalesces like [`SculptSession::commit`], but on its own flight: a
    /// voxel commit issued while a field commit runs (or vice versa) still
    /// executes.
    pub async fn commit_voxels(&self) -> Result<Option<SharedObject>, WorkerError> {
        if !self.inner.voxel_commit_flight.try_begin() {
            self.inner.voxel_commit_flight.wait_idle().await;
            return Ok(None);
        }
        let mut committed = None;
        loop {
            match self.run_voxel_commit_pass().await {
                Ok(object) => {
                    if committed.is_none() {
                        committed = object;
                    }
                    if !self.inner.voxel_commit_flight.finish_pass() {
                        return Ok(committed);
                    }
                }
                Err(error) => {
                    self.inner.voxel_commit_flight.abort();
                    Err(error)?
                }
            }
        }
    }

    async fn run_voxel_commit_pass(&self) -> Result<Option<SharedObject>, WorkerError> {
        self.refresh().await?;
        self.wait_refresh_idle().await;

        let mut state = self.lock_state();
        let mut merged = MeshBuffers::new();
        for block in state.blocks.iter().filter(|b| b.visible && !b.mesh.is_empty()) {
            // Block meshes are local grid units; shift into the shared grid
            // frame before merging.
            let mut mesh = block.mesh.clone();
            mesh.translate(block.origin().as_vec3());
            merged.merge(&mesh);
        }
        let Some(center) = merged.center() else {
            return Ok(None);
        };
        merged.translate(-center);

        let transform = Transform {
            translation: center * CELL_SCALE,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(CELL_SCALE),
        };

        state.blocks.clear();

        let object = SculptObject {
            id: self.next_object_id(),
            mesh: merged,
            transform,
        }
        .into_shared();
        self.inner
            .log
            .record(UndoAction::AddObjects(vec![Arc::clone(&object)]));
        info!("committed voxel volume into one object");
        Ok(Some(object))
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::{Mutex as StdMutex, mpsc};

    use futures::executor::block_on;

    use super::*;
    use crate::actions::MemoryActionLog;
    use crate::config::{BrushSettings, Tool};
    use crate::session::testing::ScriptedWorker;
    use crate::worker::{CutRequest, CutResponse, ExtractionRequest, ExtractionResponse, UvResponse};

    fn session() -> SculptSession<ScriptedWorker, MemoryActionLog> {
        SculptSession::new(ScriptedWorker::default(), MemoryActionLog::default())
    }

    #[test]
    fn test_commit_merges_recenters_and_parameterizes() {
        let s = session();
        s.paint(IVec3::splat(5));
        // No explicit refresh: commit runs its own.
        let object = block_on(s.commit()).unwrap().expect("non-empty volume");

        assert_eq!(s.chunk_count(), 0);
        let object = object.lock().unwrap();
        assert!(object.mesh.center().unwrap().length() < 1e-5);
        assert!(object.mesh.uvs.is_some());
        // 8 chunks × one scripted triangle.
        assert_eq!(object.mesh.triangle_count(), 8);
        // Scripted triangles span x,y ∈ [0,2], z ∈ [0,1] in container space.
        assert_eq!(object.transform.translation, Vec3::new(1.0, 1.0, 0.5));

        let actions = s.log().take();
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], UndoAction::AddObjects(objects) if objects.len() == 1));
    }

    #[test]
    fn test_commit_empty_volume_returns_none() {
        let s = session();
        assert!(block_on(s.commit()).unwrap().is_none());
        assert!(s.log().is_empty());
        // Flight is idle again.
        assert!(block_on(s.commit()).unwrap().is_none());
    }

    #[test]
    fn test_commit_factors_out_container_transform() {
        let s = session();
        s.set_container(Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        s.paint(IVec3::splat(5));
        let object = block_on(s.commit()).unwrap().unwrap();

        let object = object.lock().unwrap();
        assert_eq!(object.transform.translation, Vec3::new(-1.0, 1.0, 0.5));
    }

    #[test]
    fn test_commit_leaves_chunks_when_surface_is_empty() {
        // A fully eroded volume extracts to nothing everywhere.
        let s = SculptSession::new(
            ScriptedWorker {
                empty_extract: true,
                ..Default::default()
            },
            MemoryActionLog::default(),
        );
        s.paint(IVec3::splat(5));
        assert!(block_on(s.commit()).unwrap().is_none());
        // Chunks survive an empty commit.
        assert_eq!(s.chunk_count(), 8);
    }

    #[test]
    fn test_voxel_commit_scales_grid_to_world() {
        let s = session();
        s.set_brush(BrushSettings {
            tool: Tool::Voxel,
            ..Default::default()
        });
        s.apply_brush(IVec3::ZERO);
        let object = block_on(s.commit_voxels()).unwrap().expect("one voxel");

        assert_eq!(s.block_count(), 0);
        let object = object.lock().unwrap();
        assert_eq!(object.transform.scale, Vec3::splat(CELL_SCALE));
        assert_eq!(object.transform.translation, Vec3::splat(0.05));
        assert!(object.mesh.uvs.is_none());
        assert_eq!(object.mesh.triangle_count(), 12);

        let actions = s.log().take();
        assert!(matches!(&actions[0], UndoAction::AddObjects(_)));
    }

    #[test]
    fn test_voxel_commit_merges_across_blocks() {
        let s = session();
        s.place_voxel(IVec3::new(9, 0, 0));
        s.place_voxel(IVec3::new(10, 0, 0));
        let object = block_on(s.commit_voxels()).unwrap().unwrap();

        let object = object.lock().unwrap();
        // Grid center (10, 0.5, 0.5) scaled to world units.
        assert_eq!(object.transform.translation, Vec3::new(1.0, 0.05, 0.05));
        // Two cubes meshed in separate blocks keep their shared faces.
        assert_eq!(object.mesh.triangle_count(), 24);
    }

    #[test]
    fn test_voxel_commit_with_no_blocks_returns_none() {
        let s = session();
        assert!(block_on(s.commit_voxels()).unwrap().is_none());
        assert!(s.log().is_empty());
    }

    /// Worker whose UV pass blocks on a gate channel, so a field commit can
    /// be held mid-flight while the test drives the voxel pipeline.
    struct GatedUvWorker {
        uv_started: StdMutex<mpsc::Sender<()>>,
        uv_release: StdMutex<mpsc::Receiver<()>>,
    }

    impl GeometryWorker for GatedUvWorker {
        fn extract(
            &self,
            request: ExtractionRequest,
        ) -> impl Future<Output = Result<ExtractionResponse, WorkerError>> + Send {
            let shift = request.origin_shift * request.cell_scale;
            async move {
                Ok(ExtractionResponse {
                    positions: vec![
                        [shift.x, shift.y, shift.z],
                        [shift.x + 1.0, shift.y, shift.z],
                        [shift.x, shift.y + 1.0, shift.z],
                    ],
                    colors: vec![[1.0, 0.0, 0.0]; 3],
                    indices: vec![0, 1, 2],
                })
            }
        }

        fn parameterize(
            &self,
            request: UvRequest,
        ) -> impl Future<Output = Result<UvResponse, WorkerError>> + Send {
            let _ = self.uv_started.lock().unwrap().send(());
            let _ = self.uv_release.lock().unwrap().recv();
            let uvs = vec![[0.0, 0.0]; request.positions.len()];
            async move {
                Ok(UvResponse {
                    positions: request.positions,
                    colors: request.colors,
                    uvs,
                    indices: request.indices,
                })
            }
        }

        fn cut(
            &self,
            _request: CutRequest,
        ) -> impl Future<Output = Result<CutResponse, WorkerError>> + Send {
            async move {
                Err(WorkerError::Rejected {
                    reason: "unused".into(),
                })
            }
        }
    }

    #[test]
    fn test_voxel_commit_runs_while_field_commit_awaits_uv() {
        let (uv_started_tx, uv_started_rx) = mpsc::channel();
        let (uv_release_tx, uv_release_rx) = mpsc::channel();
        let s = SculptSession::new(
            GatedUvWorker {
                uv_started: StdMutex::new(uv_started_tx),
                uv_release: StdMutex::new(uv_release_rx),
            },
            MemoryActionLog::default(),
        );
        s.paint(IVec3::splat(5));
        s.place_voxel(IVec3::ZERO);

        let field = {
            let s = s.clone();
            std::thread::spawn(move || block_on(s.commit()))
        };
        uv_started_rx.recv().unwrap();

        // The field commit is parked in its UV pass; the voxel layer must
        // still commit rather than coalesce into it.
        let voxel = block_on(s.commit_voxels())
            .unwrap()
            .expect("voxel layer committed");
        assert_eq!(s.block_count(), 0);
        assert_eq!(
            voxel.lock().unwrap().transform.scale,
            Vec3::splat(CELL_SCALE)
        );

        uv_release_tx.send(()).unwrap();
        assert!(field.join().unwrap().unwrap().is_some());
        // One add action per layer.
        assert_eq!(s.log().take().len(), 2);
    }
}
