//! Sparse chunk grid and brush-footprint resolution.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::CHUNK_SIZE;
use crate::mesh::MeshBuffers;
use super::PotentialField;

/// One cubic region of the editing volume: its potential field, extraction
/// bookkeeping and the last installed mesh.
#[derive(Debug)]
pub struct Chunk {
    coord: IVec3,
    pub field: PotentialField,
    /// True whenever the field changed since the last installed extraction.
    pub dirty: bool,
    /// Bumped on every mutation; a finished extraction clears `dirty` only
    /// if the revision still matches its snapshot, so edits made while the
    /// request was in flight are picked up by the next pass.
    pub revision: u64,
    /// Triangle buffers from the most recent successful extraction.
    pub mesh: MeshBuffers,
    /// False when the last extraction came back empty (fully eroded).
    pub visible: bool,
}

impl Chunk {
    pub fn new(coord: IVec3) -> Self {
        Self {
            coord,
            field: PotentialField::new(),
            dirty: false,
            revision: 0,
            mesh: MeshBuffers::new(),
            visible: false,
        }
    }

    pub fn coord(&self) -> IVec3 {
        self.coord
    }

    /// World-grid cell of this chunk's minimum corner.
    pub fn origin(&self) -> IVec3 {
        self.coord * CHUNK_SIZE as i32
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    /// Paints at a world-grid cell; the kernel is clipped to this chunk.
    pub fn paint(&mut self, world: IVec3, radius: f32, color: [u8; 3]) {
        if self.field.paint(world - self.origin(), radius, color) {
            self.touch();
        }
    }

    /// Erases at a world-grid cell; the kernel is clipped to this chunk.
    pub fn erase(&mut self, world: IVec3, radius: f32) {
        if self.field.erase(world - self.origin(), radius) {
            self.touch();
        }
    }

    /// Recolors at a world-grid cell; the kernel is clipped to this chunk.
    pub fn recolor(&mut self, world: IVec3, radius: f32, color: [u8; 3]) {
        if self.field.recolor(world - self.origin(), radius, color) {
            self.touch();
        }
    }
}

/// Sparse map of chunk coordinate → chunk, created lazily and destroyed
/// wholesale by commit or reset.
#[derive(Debug, Default)]
pub struct ChunkIndex {
    chunks: HashMap<IVec3, Chunk>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every chunk a brush centered at `point` (in chunk units)
    /// could touch, creating missing ones.
    ///
    /// Scans the 3×3×3 neighborhood of half-chunk offsets around the point,
    /// an over-approximation that guarantees a stroke near a boundary
    /// updates every chunk whose lattice includes the affected cells.
    pub fn resolve_or_create(&mut self, point: Vec3) -> Vec<IVec3> {
        let mut coords = Vec::with_capacity(8);
        for dx in -1..=1 {
            for dz in -1..=1 {
                for dy in -1..=1 {
                    let probe = point + Vec3::new(dx as f32, dy as f32, dz as f32) * 0.5;
                    let coord = probe.floor().as_ivec3();
                    if !coords.contains(&coord) {
                        coords.push(coord);
                        self.chunks.entry(coord).or_insert_with(|| Chunk::new(coord));
                    }
                }
            }
        }
        coords
    }

    /// Existing chunk by exact coordinate.
    pub fn lookup(&self, coord: IVec3) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn lookup_mut(&mut self, coord: IVec3) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Destroys every chunk ("new document" for the volumetric layer).
    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_creates_boundary_neighborhood() {
        let mut index = ChunkIndex::new();
        // Center of chunk (0,0,0): probes straddle all positive boundaries.
        let coords = index.resolve_or_create(Vec3::splat(0.5));

        assert_eq!(coords.len(), 8);
        assert_eq!(index.len(), 8);
        assert!(coords.contains(&IVec3::ZERO));
        assert!(coords.contains(&IVec3::ONE));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut index = ChunkIndex::new();
        index.resolve_or_create(Vec3::splat(0.5));
        let before = index.len();
        index.resolve_or_create(Vec3::splat(0.5));
        assert_eq!(index.len(), before);
    }

    #[test]
    fn test_resolve_handles_negative_coordinates() {
        let mut index = ChunkIndex::new();
        let coords = index.resolve_or_create(Vec3::splat(-0.05));
        assert!(coords.contains(&IVec3::splat(-1)));
        assert!(coords.contains(&IVec3::ZERO));
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut index = ChunkIndex::new();
        index.resolve_or_create(Vec3::splat(0.5));
        assert!(index.lookup(IVec3::ZERO).is_some());
        assert!(index.lookup(IVec3::splat(10)).is_none());
    }

    #[test]
    fn test_cross_chunk_stroke_dirties_both_sides() {
        let mut index = ChunkIndex::new();
        // World cell on the shared face between chunk 0 and chunk 1 on X.
        let world = IVec3::new(10, 5, 5);
        let point = world.as_vec3() / CHUNK_SIZE as f32;
        for coord in index.resolve_or_create(point) {
            index
                .lookup_mut(coord)
                .unwrap()
                .paint(world, 1.0, [255, 255, 255]);
        }

        let a = index.lookup(IVec3::ZERO).unwrap();
        let b = index.lookup(IVec3::new(1, 0, 0)).unwrap();
        assert!(a.dirty && b.dirty);
        // Shared lattice points carry identical values on both sides.
        assert_eq!(a.field.get(10, 5, 5), b.field.get(0, 5, 5));
    }

    #[test]
    fn test_touch_bumps_revision() {
        let mut chunk = Chunk::new(IVec3::ZERO);
        assert_eq!(chunk.revision, 0);
        chunk.paint(IVec3::splat(5), 1.0, [1, 2, 3]);
        assert!(chunk.dirty);
        assert_eq!(chunk.revision, 1);

        // A stroke that misses the chunk entirely is not a mutation.
        chunk.dirty = false;
        chunk.paint(IVec3::splat(50), 1.0, [1, 2, 3]);
        assert!(!chunk.dirty);
        assert_eq!(chunk.revision, 1);
    }

    #[test]
    fn test_clear_destroys_all_chunks() {
        let mut index = ChunkIndex::new();
        index.resolve_or_create(Vec3::splat(0.5));
        index.clear();
        assert!(index.is_empty());
    }
}
