//! The cut pipeline: split a committed object along a plane.

use std::sync::Arc;

use bevy::prelude::*;

use crate::actions::{ActionLog, SculptObject, SharedObject, UndoAction};
use crate::mesh::MeshBuffers;
use crate::worker::{CutRequest, GeometryWorker, WorkerError};

use super::SculptSession;

impl<W: GeometryWorker, L: ActionLog> SculptSession<W, L> {
    /// Cuts `target` along a plane given in the object's local space and
    /// records the swap. Either half may come back with no triangles when
    /// the plane misses the mesh.
    ///
    /// Both halves inherit the target's transform and its uniform color;
    /// any UV layout is discarded (the halves have new topology along the
    /// cut caps).
    pub async fn cut(
        &self,
        target: &SharedObject,
        plane_position: Vec3,
        plane_orientation: Quat,
        plane_scale: Vec3,
    ) -> Result<[SharedObject; 2], WorkerError> {
        let (request, color, transform, old_id) = {
            let object = target.lock().expect("object poisoned");
            (
                CutRequest {
                    positions: object.mesh.positions.clone(),
                    indices: object.mesh.indices.clone(),
                    plane_position,
                    plane_orientation,
                    plane_scale,
                },
                object.mesh.uniform_color().unwrap_or([1.0; 3]),
                object.transform,
                object.id,
            )
        };
        let response = self.inner.worker.cut(request).await?;

        let half = |positions: Vec<[f32; 3]>, indices: Vec<u32>| {
            let colors = vec![color; positions.len()];
            SculptObject {
                id: self.next_object_id(),
                mesh: MeshBuffers::from_triangles(positions, colors, indices),
                transform,
            }
            .into_shared()
        };
        let a = half(response.positions_a, response.indices_a);
        let b = half(response.positions_b, response.indices_b);

        {
            // The original is gone; stale pointers to it must not linger.
            let mut state = self.lock_state();
            if state.hovered == Some(old_id) {
                state.hovered = None;
            }
            if state.selected == Some(old_id) {
                state.selected = None;
            }
        }
        self.inner.log.record(UndoAction::SwapObjects {
            old: vec![Arc::clone(target)],
            new: vec![Arc::clone(&a), Arc::clone(&b)],
        });
        info!("cut object into two halves");
        Ok([a, b])
    }
}
