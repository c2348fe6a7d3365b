//! Owned triangle buffers with merge/recenter/normal helpers.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, Mesh, PrimitiveTopology};
use bevy::prelude::*;

/// Owned triangle buffers: positions, per-vertex colors and normals, and an
/// index buffer. UVs appear only after UV parameterization.
///
/// Invariant: `positions`, `normals` and `colors` have equal lengths
/// (`uvs` too, when present) and every index is in range. Violations are
/// caller bugs and are checked with debug assertions, not clamped.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers with positions, colors and indices; normals recomputed.
    pub fn from_triangles(
        positions: Vec<[f32; 3]>,
        colors: Vec<[f32; 3]>,
        indices: Vec<u32>,
    ) -> Self {
        let mut buffers = Self {
            positions,
            normals: Vec::new(),
            colors,
            uvs: None,
            indices,
        };
        buffers.recompute_normals();
        buffers.debug_validate();
        buffers
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.colors.clear();
        self.uvs = None;
        self.indices.clear();
    }

    pub(crate) fn debug_validate(&self) {
        debug_assert_eq!(self.positions.len(), self.normals.len());
        debug_assert_eq!(self.positions.len(), self.colors.len());
        if let Some(uvs) = &self.uvs {
            debug_assert_eq!(self.positions.len(), uvs.len());
        }
        debug_assert_eq!(self.indices.len() % 3, 0);
        debug_assert!(
            self.indices
                .iter()
                .all(|&i| (i as usize) < self.positions.len())
        );
    }

    /// Translates every vertex position.
    pub fn translate(&mut self, offset: Vec3) {
        for p in &mut self.positions {
            p[0] += offset.x;
            p[1] += offset.y;
            p[2] += offset.z;
        }
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    pub fn aabb(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some((min, max))
    }

    /// Bounding-box center, or `None` for an empty mesh.
    pub fn center(&self) -> Option<Vec3> {
        self.aabb().map(|(min, max)| (min + max) * 0.5)
    }

    /// Appends another buffer, offsetting its indices.
    ///
    /// UVs survive only when both sides carry them; merging a pre-UV mesh
    /// into a parameterized one drops the layout (a later UV pass rebuilds
    /// it).
    pub fn merge(&mut self, other: &MeshBuffers) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.colors.extend_from_slice(&other.colors);
        self.uvs = match (self.uvs.take(), &other.uvs) {
            (Some(mut ours), Some(theirs)) => {
                ours.extend_from_slice(theirs);
                Some(ours)
            }
            _ => None,
        };
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.debug_validate();
    }

    /// Recomputes per-vertex normals by accumulating area-weighted face
    /// normals over the index buffer, then normalizing.
    pub fn recompute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let a = Vec3::from_array(self.positions[tri[0] as usize]);
            let b = Vec3::from_array(self.positions[tri[1] as usize]);
            let c = Vec3::from_array(self.positions[tri[2] as usize]);
            let face = (b - a).cross(c - a);
            for &i in tri {
                normals[i as usize] += face;
            }
        }
        self.normals = normals
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }

    /// The mesh's uniform color (first vertex), if it has any vertices.
    pub fn uniform_color(&self) -> Option<[f32; 3]> {
        self.colors.first().copied()
    }

    /// Converts to a Bevy mesh.
    ///
    /// Returns `None` for an empty mesh (nothing to render).
    pub fn to_mesh(&self) -> Option<Mesh> {
        if self.is_empty() {
            return None;
        }
        self.debug_validate();

        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
        );

        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone());
        let colors: Vec<[f32; 4]> = self
            .colors
            .iter()
            .map(|c| [c[0], c[1], c[2], 1.0])
            .collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
        if let Some(uvs) = &self.uvs {
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs.clone());
        }
        mesh.insert_indices(Indices::U32(self.indices.clone()));

        Some(mesh)
    }
}
