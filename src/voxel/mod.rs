//! Discrete voxel storage for the voxel-placement tool.
//!
//! This module provides:
//! - [`Voxel`]: a tagged color + opacity cell (the packed `0xRRGGBBAA`
//!   encoding survives only at the serialization boundary)
//! - [`VoxelBlock`]: an `S³` grid of optional voxels plus its mesh state
//! - [`BlockIndex`]: sparse coordinate → block map (exact containment, no
//!   neighborhood scan, since voxel edits are single-cell)
//! - [`mesh_block`]: the greedy mesher

use std::collections::HashMap;

use bevy::prelude::*;

use crate::{BLOCK_VOLUME, CHUNK_SIZE};
use crate::mesh::MeshBuffers;

mod greedy;

pub use greedy::mesh_block;

/// How a voxel interacts with face culling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opacity {
    /// Fully covers faces behind it.
    Opaque,
    /// Requires a face against matching and empty neighbors; rendered in
    /// the translucent tail of the vertex stream.
    Translucent,
}

/// One occupied voxel cell. Absent cells are `None` in the grid; there is
/// no in-band empty sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Voxel {
    /// sRGB bytes.
    pub color: [u8; 3],
    pub opacity: Opacity,
}

/// Packed alpha used when re-encoding a translucent voxel.
const TRANSLUCENT_ALPHA: u8 = 0x7F;

impl Voxel {
    pub const fn opaque(color: [u8; 3]) -> Self {
        Self {
            color,
            opacity: Opacity::Opaque,
        }
    }

    pub const fn translucent(color: [u8; 3]) -> Self {
        Self {
            color,
            opacity: Opacity::Translucent,
        }
    }

    /// Decodes the wire encoding `0xRRGGBBAA`: zero is absent, alpha 255 is
    /// opaque, any other alpha is translucent.
    pub fn unpack(raw: u32) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        let color = [(raw >> 24) as u8, (raw >> 16) as u8, (raw >> 8) as u8];
        let opacity = if raw as u8 == 0xFF {
            Opacity::Opaque
        } else {
            Opacity::Translucent
        };
        Some(Self { color, opacity })
    }

    /// Encodes to the wire format. Inverse of [`Voxel::unpack`] up to the
    /// exact translucent alpha value.
    pub fn pack(self) -> u32 {
        let [r, g, b] = self.color;
        let alpha = match self.opacity {
            Opacity::Opaque => 0xFF,
            Opacity::Translucent => TRANSLUCENT_ALPHA,
        };
        u32::from_be_bytes([r, g, b, alpha])
    }

    /// Color as linear floats for vertex buffers.
    #[inline]
    pub fn color_f32(self) -> [f32; 3] {
        [
            self.color[0] as f32 / 255.0,
            self.color[1] as f32 / 255.0,
            self.color[2] as f32 / 255.0,
        ]
    }
}

/// A `CHUNK_SIZE³` grid of discrete voxels with its mesh bookkeeping.
///
/// Index mapping: `x + S·y + S²·z` (X varies fastest), the layout the
/// greedy mesher sweeps.
#[derive(Debug)]
pub struct VoxelBlock {
    coord: IVec3,
    cells: Vec<Option<Voxel>>,
    pub dirty: bool,
    pub revision: u64,
    pub mesh: MeshBuffers,
    pub visible: bool,
}

impl VoxelBlock {
    pub fn new(coord: IVec3) -> Self {
        Self {
            coord,
            cells: vec![None; BLOCK_VOLUME],
            dirty: false,
            revision: 0,
            mesh: MeshBuffers::new(),
            visible: false,
        }
    }

    pub fn coord(&self) -> IVec3 {
        self.coord
    }

    /// World-grid cell of this block's minimum corner.
    pub fn origin(&self) -> IVec3 {
        self.coord * CHUNK_SIZE as i32
    }

    #[inline]
    fn index(local: IVec3) -> usize {
        let s = CHUNK_SIZE as i32;
        debug_assert!(
            (0..s).contains(&local.x) && (0..s).contains(&local.y) && (0..s).contains(&local.z),
            "voxel cell {local} out of block bounds"
        );
        (local.x + local.y * s + local.z * s * s) as usize
    }

    pub fn get(&self, local: IVec3) -> Option<Voxel> {
        self.cells[Self::index(local)]
    }

    /// Sets a cell from a world-grid coordinate; `None` clears it.
    pub fn set(&mut self, world: IVec3, voxel: Option<Voxel>) {
        let index = Self::index(world - self.origin());
        if self.cells[index] != voxel {
            self.cells[index] = voxel;
            self.dirty = true;
            self.revision += 1;
        }
    }

    pub fn cells(&self) -> &[Option<Voxel>] {
        &self.cells
    }

    /// Grid dimensions for the mesher.
    pub fn dims() -> UVec3 {
        UVec3::splat(CHUNK_SIZE)
    }
}

/// Sparse map of block coordinate → voxel block.
///
/// Unlike [`ChunkIndex`](crate::field::ChunkIndex), resolution is exact
/// containment: a single-cell edit can only touch one block.
#[derive(Debug, Default)]
pub struct BlockIndex {
    blocks: HashMap<IVec3, VoxelBlock>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block containing `point` (in chunk units), created on demand.
    pub fn resolve_or_create(&mut self, point: Vec3) -> &mut VoxelBlock {
        let coord = point.floor().as_ivec3();
        self.blocks
            .entry(coord)
            .or_insert_with(|| VoxelBlock::new(coord))
    }

    pub fn lookup(&self, coord: IVec3) -> Option<&VoxelBlock> {
        self.blocks.get(&coord)
    }

    pub fn lookup_mut(&mut self, coord: IVec3) -> Option<&mut VoxelBlock> {
        self.blocks.get_mut(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoxelBlock> {
        self.blocks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut VoxelBlock> {
        self.blocks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_roundtrip() {
        let opaque = Voxel::opaque([0x12, 0x34, 0x56]);
        assert_eq!(opaque.pack(), 0x1234_56FF);
        assert_eq!(Voxel::unpack(opaque.pack()), Some(opaque));

        let translucent = Voxel::translucent([0xAA, 0xBB, 0xCC]);
        assert_eq!(Voxel::unpack(translucent.pack()), Some(translucent));

        assert_eq!(Voxel::unpack(0), None);
    }

    #[test]
    fn test_any_nonzero_alpha_below_255_is_translucent() {
        let v = Voxel::unpack(0xFF00_0001).unwrap();
        assert_eq!(v.opacity, Opacity::Translucent);
        assert_eq!(v.color, [0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_block_set_get_world_coordinates() {
        let mut block = VoxelBlock::new(IVec3::new(1, 0, 0));
        let world = IVec3::new(13, 4, 7);
        block.set(world, Some(Voxel::opaque([1, 2, 3])));

        assert!(block.dirty);
        assert_eq!(block.get(IVec3::new(3, 4, 7)), Some(Voxel::opaque([1, 2, 3])));
    }

    #[test]
    fn test_block_set_same_value_is_not_a_mutation() {
        let mut block = VoxelBlock::new(IVec3::ZERO);
        let v = Some(Voxel::opaque([9, 9, 9]));
        block.set(IVec3::ZERO, v);
        let revision = block.revision;
        block.set(IVec3::ZERO, v);
        assert_eq!(block.revision, revision);
    }

    #[test]
    fn test_block_index_exact_containment() {
        let mut index = BlockIndex::new();
        let block = index.resolve_or_create(Vec3::new(1.9, 0.2, -0.1));
        assert_eq!(block.coord(), IVec3::new(1, 0, -1));
        assert_eq!(index.len(), 1);
        assert!(index.lookup(IVec3::new(1, 0, -1)).is_some());
    }
}
