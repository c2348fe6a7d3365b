//! Triangle-buffer utilities shared by every pipeline stage.
//!
//! [`MeshBuffers`] is the crate's geometry currency: extraction responses,
//! greedy-mesher output, merged commits and cut halves all flow through it
//! before an optional conversion to a Bevy [`Mesh`](bevy::mesh::Mesh).

mod buffers;

pub use buffers::MeshBuffers;
