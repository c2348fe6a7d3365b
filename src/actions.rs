//! Undo-log actions and the committed-object hand-off.
//!
//! The core never interprets undo/redo itself: pipelines construct
//! [`UndoAction`] values and submit them to an [`ActionLog`] owned by the
//! host. Committed meshes are shared ([`SharedObject`]) because the add
//! action is recorded before the asynchronous UV layout finalizes.

use std::sync::{Arc, Mutex};

use bevy::prelude::*;

use crate::mesh::MeshBuffers;

/// Stable identity of a committed object, used by selection tracking and
/// the transform/paint actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// A committed static mesh, owned by the undo/scene collaborator after the
/// action that introduced it is recorded.
#[derive(Debug)]
pub struct SculptObject {
    pub id: ObjectId,
    /// Local-space geometry, recentered so the bounding-box center is the
    /// origin.
    pub mesh: MeshBuffers,
    /// Placement in the parent container's coordinate space.
    pub transform: Transform,
}

/// Shared handle to a committed object.
pub type SharedObject = Arc<Mutex<SculptObject>>;

impl SculptObject {
    /// Wraps the object for hand-off to the action log.
    pub fn into_shared(self) -> SharedObject {
        Arc::new(Mutex::new(self))
    }
}

/// Actions the core submits to the external undo log.
#[derive(Debug)]
pub enum UndoAction {
    /// New objects entered the scene (commit pipelines).
    AddObjects(Vec<SharedObject>),
    /// Objects left the scene.
    RemoveObjects(Vec<SharedObject>),
    /// Objects were replaced in place (cut pipeline).
    SwapObjects {
        old: Vec<SharedObject>,
        new: Vec<SharedObject>,
    },
    /// An object's placement changed.
    Transform {
        object: ObjectId,
        old: Transform,
        new: Transform,
    },
    /// An object's uniform color changed.
    Paint {
        object: ObjectId,
        old: [f32; 3],
        new: [f32; 3],
    },
}

/// Sink for undo-log actions.
///
/// Implemented by the host's action history; [`MemoryActionLog`] is a
/// ready-made in-memory implementation for tests and simple tools.
pub trait ActionLog: Send + Sync + 'static {
    /// Records one action. Called after the action's objects are fully
    /// constructed and visible.
    fn record(&self, action: UndoAction);
}

/// In-memory action log.
#[derive(Clone, Default)]
pub struct MemoryActionLog {
    actions: Arc<Mutex<Vec<UndoAction>>>,
}

impl MemoryActionLog {
    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.actions.lock().expect("action log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains all recorded actions.
    pub fn take(&self) -> Vec<UndoAction> {
        std::mem::take(&mut *self.actions.lock().expect("action log poisoned"))
    }
}

impl ActionLog for MemoryActionLog {
    fn record(&self, action: UndoAction) {
        self.actions.lock().expect("action log poisoned").push(action);
    }
}
