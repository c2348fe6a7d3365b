//! Greedy quad mesher for voxel blocks.
//!
//! Sweeps the three axes, builds a face mask per layer boundary, then grows
//! maximal same-voxel rectangles before emitting quads. Opaque quads come
//! first in the output stream; translucent quads are appended as a tail so a
//! renderer can split draw order at the opaque index count.

use bevy::prelude::*;

use crate::mesh::MeshBuffers;
use super::{Opacity, Voxel};

/// Meshes a dense voxel grid laid out X-fastest (`x + y·w + z·w·h`).
///
/// Faces between two opaque cells are culled regardless of color; a pair of
/// adjacent translucent cells keeps both inner faces so the volume reads as
/// glass, not as a hollow shell.
pub fn mesh_block(cells: &[Option<Voxel>], dims: UVec3) -> MeshBuffers {
    debug_assert_eq!(cells.len(), (dims.x * dims.y * dims.z) as usize);

    let dims_i = [dims.x as i32, dims.y as i32, dims.z as i32];
    let strides = [1usize, dims.x as usize, (dims.x * dims.y) as usize];
    let voxel_at = |p: [i32; 3]| -> Option<Voxel> {
        for k in 0..3 {
            if p[k] < 0 || p[k] >= dims_i[k] {
                return None;
            }
        }
        cells[p[0] as usize * strides[0] + p[1] as usize * strides[1] + p[2] as usize * strides[2]]
    };

    let mut sink = QuadSink::default();
    for d in 0..3 {
        let u = (d + 1) % 3;
        let v = (d + 2) % 3;
        let mask_w = dims_i[u] as usize;
        let mask_h = dims_i[v] as usize;
        let mut front: Vec<Option<Voxel>> = vec![None; mask_w * mask_h];
        let mut back: Vec<Option<Voxel>> = vec![None; mask_w * mask_h];

        // Layer -1 exposes the grid's minimum boundary faces.
        for layer in -1..dims_i[d] {
            for j in 0..dims_i[v] {
                for i in 0..dims_i[u] {
                    let mut a = [0i32; 3];
                    a[d] = layer;
                    a[u] = i;
                    a[v] = j;
                    let mut b = a;
                    b[d] += 1;
                    let (front_face, back_face) = face_rule(voxel_at(a), voxel_at(b));
                    let m = i as usize + j as usize * mask_w;
                    front[m] = front_face;
                    back[m] = back_face;
                }
            }
            emit_mask(&mut front, mask_w, mask_h, [d, u, v], layer + 1, true, &mut sink);
            emit_mask(&mut back, mask_w, mask_h, [d, u, v], layer + 1, false, &mut sink);
        }
    }
    sink.finish()
}

/// Faces required between cell `a` and its `+d` neighbor `b`: the first
/// entry faces `+d` (owned by `a`), the second faces `-d` (owned by `b`).
fn face_rule(a: Option<Voxel>, b: Option<Voxel>) -> (Option<Voxel>, Option<Voxel>) {
    match (a, b) {
        (None, None) => (None, None),
        (Some(a), None) => (Some(a), None),
        (None, Some(b)) => (None, Some(b)),
        (Some(a), Some(b)) => match (a.opacity, b.opacity) {
            (Opacity::Opaque, Opacity::Opaque) => (None, None),
            (Opacity::Opaque, Opacity::Translucent) => (Some(a), None),
            (Opacity::Translucent, Opacity::Opaque) => (None, Some(b)),
            (Opacity::Translucent, Opacity::Translucent) => (Some(a), Some(b)),
        },
    }
}

/// Greedily covers a mask with maximal rectangles of equal voxels, zeroing
/// consumed cells as it goes.
fn emit_mask(
    mask: &mut [Option<Voxel>],
    w: usize,
    h: usize,
    [d, u, v]: [usize; 3],
    plane: i32,
    forward: bool,
    sink: &mut QuadSink,
) {
    for j in 0..h {
        let mut i = 0;
        while i < w {
            let n = i + j * w;
            let Some(voxel) = mask[n] else {
                i += 1;
                continue;
            };

            let mut width = 1;
            while i + width < w && mask[n + width] == Some(voxel) {
                width += 1;
            }
            let mut height = 1;
            'grow: while j + height < h {
                for k in 0..width {
                    if mask[n + k + height * w] != Some(voxel) {
                        break 'grow;
                    }
                }
                height += 1;
            }
            for jj in 0..height {
                for ii in 0..width {
                    mask[n + ii + jj * w] = None;
                }
            }

            let mut base = [0.0f32; 3];
            base[d] = plane as f32;
            base[u] = i as f32;
            base[v] = j as f32;
            let mut du = [0.0f32; 3];
            let mut dv = [0.0f32; 3];
            if forward {
                du[u] = width as f32;
                dv[v] = height as f32;
            } else {
                // Swapped edges flip the winding so the normal faces -d.
                du[v] = height as f32;
                dv[u] = width as f32;
            }
            sink.push_quad(base, du, dv, voxel);

            i += width;
        }
    }
}

#[derive(Default)]
struct QuadBuffer {
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl QuadBuffer {
    fn push(&mut self, base: [f32; 3], du: [f32; 3], dv: [f32; 3], color: [f32; 3]) {
        let add = |a: [f32; 3], b: [f32; 3]| [a[0] + b[0], a[1] + b[1], a[2] + b[2]];
        let offset = self.positions.len() as u32;
        self.positions.extend([
            base,
            add(base, du),
            add(add(base, du), dv),
            add(base, dv),
        ]);
        self.colors.extend([color; 4]);
        self.indices.extend([
            offset,
            offset + 1,
            offset + 3,
            offset + 1,
            offset + 2,
            offset + 3,
        ]);
    }
}

/// Collects opaque and translucent quads separately so assembly can put the
/// translucent set at the tail of the vertex and index streams.
#[derive(Default)]
struct QuadSink {
    opaque: QuadBuffer,
    translucent: QuadBuffer,
}

impl QuadSink {
    fn push_quad(&mut self, base: [f32; 3], du: [f32; 3], dv: [f32; 3], voxel: Voxel) {
        let buffer = match voxel.opacity {
            Opacity::Opaque => &mut self.opaque,
            Opacity::Translucent => &mut self.translucent,
        };
        buffer.push(base, du, dv, voxel.color_f32());
    }

    fn finish(self) -> MeshBuffers {
        let QuadSink {
            mut opaque,
            translucent,
        } = self;
        let offset = opaque.positions.len() as u32;
        opaque.positions.extend(translucent.positions);
        opaque.colors.extend(translucent.colors);
        opaque
            .indices
            .extend(translucent.indices.iter().map(|i| i + offset));
        MeshBuffers::from_triangles(opaque.positions, opaque.colors, opaque.indices)
    }
}
