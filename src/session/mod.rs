//! The sculpting session: shared editing state plus the asynchronous
//! refresh, commit and cut pipelines.
//!
//! A [`SculptSession`] is a cheap-to-clone handle over shared state, so the
//! input side can keep applying brush strokes while an extraction pass is in
//! flight. The state mutex is never held across an await; every pipeline
//! snapshots what it needs, awaits the worker, then re-locks to install
//! results that are still current.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bevy::prelude::*;

use crate::CHUNK_SIZE;
use crate::actions::{ActionLog, ObjectId, SharedObject, UndoAction};
use crate::config::{BrushSettings, Tool};
use crate::field::ChunkIndex;
use crate::voxel::{BlockIndex, Voxel};
use crate::worker::GeometryWorker;

mod commit;
mod cut;
mod flight;
mod refresh;

use flight::SingleFlight;

/// Everything the brush tools mutate, guarded by one mutex.
pub(crate) struct SessionState {
    pub chunks: ChunkIndex,
    pub blocks: BlockIndex,
    pub brush: BrushSettings,
    /// World transform of the container the edited volume lives in.
    pub container: Transform,
    pub hovered: Option<ObjectId>,
    pub selected: Option<ObjectId>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            chunks: ChunkIndex::new(),
            blocks: BlockIndex::new(),
            brush: BrushSettings::default(),
            container: Transform::IDENTITY,
            hovered: None,
            selected: None,
        }
    }
}

pub(crate) struct SessionInner<W, L> {
    pub(crate) worker: W,
    pub(crate) log: L,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) refresh_flight: SingleFlight,
    /// Guards field commits; the voxel pipeline has its own flight so the
    /// two commit types never coalesce into each other.
    pub(crate) commit_flight: SingleFlight,
    pub(crate) voxel_commit_flight: SingleFlight,
    next_object_id: AtomicU64,
}

/// Handle to a sculpting session.
///
/// Clones share the same state, worker and action log.
pub struct SculptSession<W, L> {
    pub(crate) inner: Arc<SessionInner<W, L>>,
}

impl<W, L> Clone for SculptSession<W, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: GeometryWorker, L: ActionLog> SculptSession<W, L> {
    pub fn new(worker: W, log: L) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                worker,
                log,
                state: Mutex::new(SessionState::default()),
                refresh_flight: SingleFlight::new(),
                commit_flight: SingleFlight::new(),
                voxel_commit_flight: SingleFlight::new(),
                next_object_id: AtomicU64::new(1),
            }),
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().expect("session state poisoned")
    }

    pub(crate) fn next_object_id(&self) -> ObjectId {
        ObjectId(self.inner.next_object_id.fetch_add(1, Ordering::Relaxed))
    }

    /// The session's action log.
    pub fn log(&self) -> &L {
        &self.inner.log
    }

    /// Copies the UI's brush settings into the session.
    pub fn set_brush(&self, brush: BrushSettings) {
        self.lock_state().brush = brush;
    }

    pub fn brush(&self) -> BrushSettings {
        self.lock_state().brush.clone()
    }

    /// Updates the world transform of the container the volume is edited in.
    pub fn set_container(&self, container: Transform) {
        self.lock_state().container = container;
    }

    pub fn set_hovered(&self, object: Option<ObjectId>) {
        self.lock_state().hovered = object;
    }

    pub fn set_selected(&self, object: Option<ObjectId>) {
        self.lock_state().selected = object;
    }

    pub fn hovered(&self) -> Option<ObjectId> {
        self.lock_state().hovered
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.lock_state().selected
    }

    /// Applies the active tool at a world-grid cell. Voxel placement falls
    /// through to [`SculptSession::place_voxel`]; the field tools stroke
    /// every chunk whose lattice the brush can reach.
    pub fn apply_brush(&self, world: IVec3) {
        let tool = self.lock_state().brush.tool;
        match tool {
            Tool::Paint => self.paint(world),
            Tool::Erase => self.erase(world),
            Tool::Recolor => self.recolor(world),
            Tool::Voxel => self.place_voxel(world),
        }
    }

    /// Paints material at a world-grid cell with the current brush.
    pub fn paint(&self, world: IVec3) {
        let mut state = self.lock_state();
        let BrushSettings { radius, color, .. } = state.brush.clone();
        for coord in state.chunks.resolve_or_create(chunk_point(world)) {
            if let Some(chunk) = state.chunks.lookup_mut(coord) {
                chunk.paint(world, radius, color);
            }
        }
    }

    /// Erases material at a world-grid cell with the current brush.
    pub fn erase(&self, world: IVec3) {
        let mut state = self.lock_state();
        let radius = state.brush.radius;
        for coord in state.chunks.resolve_or_create(chunk_point(world)) {
            if let Some(chunk) = state.chunks.lookup_mut(coord) {
                chunk.erase(world, radius);
            }
        }
    }

    /// Restamps the color field at a world-grid cell.
    pub fn recolor(&self, world: IVec3) {
        let mut state = self.lock_state();
        let BrushSettings { radius, color, .. } = state.brush.clone();
        for coord in state.chunks.resolve_or_create(chunk_point(world)) {
            if let Some(chunk) = state.chunks.lookup_mut(coord) {
                chunk.recolor(world, radius, color);
            }
        }
    }

    /// Places an opaque voxel of the brush color at a world-grid cell.
    pub fn place_voxel(&self, world: IVec3) {
        let mut state = self.lock_state();
        let color = state.brush.color;
        state
            .blocks
            .resolve_or_create(chunk_point(world))
            .set(world, Some(Voxel::opaque(color)));
    }

    /// Sets or clears a voxel cell directly.
    pub fn set_voxel(&self, world: IVec3, voxel: Option<Voxel>) {
        let mut state = self.lock_state();
        state.blocks.resolve_or_create(chunk_point(world)).set(world, voxel);
    }

    /// Sets a voxel cell from the wire encoding `0xRRGGBBAA`; zero clears.
    pub fn set_packed_voxel(&self, world: IVec3, packed: u32) {
        self.set_voxel(world, Voxel::unpack(packed));
    }

    /// Packed value at a world-grid cell, zero when the cell is empty.
    /// Inverse of [`SculptSession::set_packed_voxel`] up to the translucent
    /// alpha value.
    pub fn packed_voxel_at(&self, world: IVec3) -> u32 {
        let state = self.lock_state();
        let coord = chunk_point(world).floor().as_ivec3();
        state
            .blocks
            .lookup(coord)
            .and_then(|block| block.get(world - block.origin()))
            .map_or(0, Voxel::pack)
    }

    /// Repaints a committed object with the brush color and records the
    /// change. Repainting with the object's current color is a no-op.
    pub fn paint_object(&self, target: &SharedObject) {
        let new = self.lock_state().brush.color_f32();
        let (id, old) = {
            let mut object = target.lock().expect("object poisoned");
            let old = object.mesh.uniform_color().unwrap_or([1.0; 3]);
            if old == new {
                return;
            }
            for color in &mut object.mesh.colors {
                *color = new;
            }
            (object.id, old)
        };
        self.inner.log.record(UndoAction::Paint {
            object: id,
            old,
            new,
        });
    }

    /// Discards the entire uncommitted volume, field and voxel layers both.
    /// Committed objects are untouched.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        state.chunks.clear();
        state.blocks.clear();
    }

    /// Number of live chunks (diagnostics).
    pub fn chunk_count(&self) -> usize {
        self.lock_state().chunks.len()
    }

    /// Number of live voxel blocks (diagnostics).
    pub fn block_count(&self) -> usize {
        self.lock_state().blocks.len()
    }
}

/// World-grid cell → chunk-unit point shared by chunk and block resolution.
#[inline]
fn chunk_point(world: IVec3) -> Vec3 {
    world.as_vec3() / CHUNK_SIZE as f32
}
