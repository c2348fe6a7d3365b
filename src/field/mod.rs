//! Volumetric editing layer: per-chunk potential fields and the sparse
//! chunk index.
//!
//! This module provides:
//! - [`PotentialField`]: dense signed scalar field + color lattice with
//!   falloff brush operations
//! - [`Chunk`]: one field plus its extraction bookkeeping and last mesh
//! - [`ChunkIndex`]: sparse coordinate → chunk map with the 3×3×3
//!   neighborhood resolution that keeps strokes seamless across boundaries

mod chunk;
mod potential;

pub use chunk::{Chunk, ChunkIndex};
pub use potential::PotentialField;
