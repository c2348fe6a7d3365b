//! The geometry worker boundary.
//!
//! Surface extraction, UV parameterization and plane cuts run outside the
//! session, behind [`GeometryWorker`]. Requests carry owned buffers so a
//! worker can ship them to another thread (or process) without borrowing
//! session state; responses are matched to their request through the future
//! each call returns.

use std::future::Future;

use bevy::prelude::*;
use thiserror::Error;

mod thread;

pub use thread::{GeometryKernel, ThreadWorker};

/// Worker call failure.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker refused the request.
    #[error("geometry worker rejected request: {reason}")]
    Rejected { reason: String },
    /// The worker went away before replying.
    #[error("geometry worker channel closed")]
    ChannelClosed,
}

/// Surface extraction input: one chunk's lattice snapshot.
#[derive(Clone, Debug)]
pub struct ExtractionRequest {
    /// Lattice points per axis.
    pub dims: UVec3,
    /// Scalar field, `x + y·n² + z·n` layout.
    pub potential: Vec<f32>,
    /// sRGB bytes, 3 per lattice point, same layout.
    pub color_field: Vec<u8>,
    /// Translation applied to extracted positions (the chunk's world-grid
    /// origin).
    pub origin_shift: Vec3,
    /// Scale from lattice units to world units.
    pub cell_scale: Vec3,
}

/// Extracted iso-surface triangles. Normals are recomputed on install.
#[derive(Clone, Debug, Default)]
pub struct ExtractionResponse {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// UV parameterization input: a committed object's merged triangles.
#[derive(Clone, Debug)]
pub struct UvRequest {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// Parameterized triangles. The worker may split vertices along seams, so
/// every buffer is replaced, not just the UV layer.
#[derive(Clone, Debug)]
pub struct UvResponse {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Plane-cut input: one object's triangles plus the cutting plane in the
/// object's local space.
#[derive(Clone, Debug)]
pub struct CutRequest {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub plane_position: Vec3,
    pub plane_orientation: Quat,
    pub plane_scale: Vec3,
}

/// The two capped halves of a cut. Either half may be empty when the plane
/// misses the mesh.
#[derive(Clone, Debug)]
pub struct CutResponse {
    pub positions_a: Vec<[f32; 3]>,
    pub indices_a: Vec<u32>,
    pub positions_b: Vec<[f32; 3]>,
    pub indices_b: Vec<u32>,
}

/// Asynchronous geometry backend.
///
/// Implementations must be shareable across the session's concurrent passes;
/// each method returns a future resolving to that call's own response.
pub trait GeometryWorker: Send + Sync + 'static {
    fn extract(
        &self,
        request: ExtractionRequest,
    ) -> impl Future<Output = Result<ExtractionResponse, WorkerError>> + Send;

    fn parameterize(
        &self,
        request: UvRequest,
    ) -> impl Future<Output = Result<UvResponse, WorkerError>> + Send;

    fn cut(
        &self,
        request: CutRequest,
    ) -> impl Future<Output = Result<CutResponse, WorkerError>> + Send;
}
