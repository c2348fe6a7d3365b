//! # bevy_carver
//!
//! A Bevy library for interactive volumetric sculpting: paint and erase
//! material into a sparse grid of potential-field chunks, place discrete
//! colored voxels, and turn the edited volume into renderable meshes.
//!
//! ## Features
//!
//! - Spherical falloff brushes over a signed potential field
//! - Sparse chunk grid with seamless cross-chunk strokes
//! - Coalesced async surface extraction through a pluggable worker
//! - Greedy voxel meshing with transparency/translucency face culling
//! - Commit/cut pipelines that emit undo-log actions
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_carver::prelude::*;
//! use futures::executor::block_on;
//!
//! let session = SculptSession::new(MyWorker::connect(), MemoryActionLog::default());
//!
//! session.paint(IVec3::new(5, 5, 5));
//! block_on(session.refresh())?;   // extract dirty chunks
//! block_on(session.commit())?;    // merge into one object, record AddObjects
//! ```
//!
//! Rendering, physics, undo replay and the UI surface stay outside this
//! crate; they consume [`MeshBuffers`](mesh::MeshBuffers) /
//! [`UndoAction`](actions::UndoAction) values and feed back
//! [`BrushSettings`](config::BrushSettings).

pub mod actions;
pub mod config;
pub mod field;
pub mod mesh;
mod plugin;
pub mod session;
pub mod voxel;
pub mod worker;

/// Edge length of a chunk in grid cells.
pub const CHUNK_SIZE: u32 = 10;

/// Lattice points per chunk axis; both chunk boundaries are sampled so
/// extraction is seamless across neighbors.
pub const FIELD_SIZE: u32 = CHUNK_SIZE + 1;

/// Total number of lattice points in one chunk's potential field.
pub const FIELD_VOLUME: usize = (FIELD_SIZE * FIELD_SIZE * FIELD_SIZE) as usize;

/// Total number of cells in one discrete voxel block.
pub const BLOCK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// World-space size of one grid cell; a chunk spans exactly 1.0 world units.
pub const CELL_SCALE: f32 = 0.1;

/// Initial potential of every lattice point: far outside the surface.
/// Sign convention: negative = inside/solid, positive = outside/empty.
pub const EMPTY_POTENTIAL: f32 = 10.0;

pub mod prelude {
    pub use crate::actions::{
        ActionLog, MemoryActionLog, ObjectId, SculptObject, SharedObject, UndoAction,
    };
    pub use crate::config::{BrushSettings, Tool};
    pub use crate::field::{Chunk, ChunkIndex, PotentialField};
    pub use crate::mesh::MeshBuffers;
    pub use crate::plugin::CarverPlugin;
    pub use crate::session::SculptSession;
    pub use crate::voxel::{BlockIndex, Opacity, Voxel, VoxelBlock, mesh_block};
    pub use crate::worker::{
        CutRequest, CutResponse, ExtractionRequest, ExtractionResponse, GeometryKernel,
        GeometryWorker, ThreadWorker, UvRequest, UvResponse, WorkerError,
    };
    pub use crate::{
        BLOCK_VOLUME, CELL_SCALE, CHUNK_SIZE, EMPTY_POTENTIAL, FIELD_SIZE, FIELD_VOLUME,
    };
}
