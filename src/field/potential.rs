//! Signed potential field storage and falloff brush math.

use bevy::prelude::*;

use crate::{EMPTY_POTENTIAL, FIELD_SIZE, FIELD_VOLUME};

/// A chunk's dense scalar field plus a color per lattice point.
///
/// The lattice has `FIELD_SIZE³` points covering both chunk boundaries, so
/// neighboring chunks sample identical values along their shared face and
/// extraction stays seamless.
///
/// Sign convention: negative = inside/solid, positive = outside/empty, the
/// magnitude approximating distance to the iso-surface. Every point starts
/// at [`EMPTY_POTENTIAL`].
///
/// # Index mapping
///
/// `index = x + y·N² + z·N` (Y carries the largest stride), matching the
/// extraction worker's lattice layout. Keep this in sync with the worker
/// contract.
#[derive(Clone, Debug)]
pub struct PotentialField {
    potential: Vec<f32>,
    color_field: Vec<u8>,
}

impl Default for PotentialField {
    fn default() -> Self {
        Self {
            potential: vec![EMPTY_POTENTIAL; FIELD_VOLUME],
            color_field: vec![0; FIELD_VOLUME * 3],
        }
    }
}

impl PotentialField {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn index(x: i32, y: i32, z: i32) -> usize {
        let n = FIELD_SIZE as i32;
        debug_assert!(
            (0..n).contains(&x) && (0..n).contains(&y) && (0..n).contains(&z),
            "lattice point ({x}, {y}, {z}) out of chunk bounds"
        );
        (x + y * n * n + z * n) as usize
    }

    /// Potential at a local lattice point.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> f32 {
        self.potential[Self::index(x, y, z)]
    }

    /// Color at a local lattice point, sRGB bytes.
    #[inline]
    pub fn color_at(&self, x: i32, y: i32, z: i32) -> [u8; 3] {
        let i = Self::index(x, y, z) * 3;
        [
            self.color_field[i],
            self.color_field[i + 1],
            self.color_field[i + 2],
        ]
    }

    /// Raw potential buffer, for extraction requests.
    pub fn potential(&self) -> &[f32] {
        &self.potential
    }

    /// Raw color buffer (3 bytes per lattice point), for extraction requests.
    pub fn color_field(&self) -> &[u8] {
        &self.color_field
    }

    /// Pushes material into the field around `center` (local coordinates;
    /// may lie outside the chunk, in which case only the overlapping part of
    /// the kernel applies). Also stamps `color` over the same range.
    ///
    /// Returns true when any lattice point was touched.
    pub fn paint(&mut self, center: IVec3, radius: f32, color: [u8; 3]) -> bool {
        self.apply_brush(center, radius, BrushOp::Paint(color))
    }

    /// Carves material out of the field around `center`.
    pub fn erase(&mut self, center: IVec3, radius: f32) -> bool {
        self.apply_brush(center, radius, BrushOp::Erase)
    }

    /// Restamps the color field around `center` without moving the surface.
    pub fn recolor(&mut self, center: IVec3, radius: f32, color: [u8; 3]) -> bool {
        self.apply_brush(center, radius, BrushOp::Recolor(color))
    }

    fn apply_brush(&mut self, center: IVec3, radius: f32, op: BrushOp) -> bool {
        let reach = radius.ceil() as i32;
        // Kernel magnitude at the stroke center; clamped so a zero-radius
        // brush still bites.
        let max_falloff = (radius * radius * 3.0).sqrt().max(0.1);
        let span = 0..=FIELD_SIZE as i32 - 1;

        let mut touched = false;
        for dx in -reach..=reach {
            for dz in -reach..=reach {
                for dy in -reach..=reach {
                    let p = center + IVec3::new(dx, dy, dz);
                    if !(span.contains(&p.x) && span.contains(&p.y) && span.contains(&p.z)) {
                        continue;
                    }
                    let index = Self::index(p.x, p.y, p.z);
                    let dist = ((dx * dx + dy * dy + dz * dz) as f32).sqrt();
                    let d = (max_falloff - dist) / max_falloff;
                    match op {
                        BrushOp::Paint(color) => {
                            self.potential[index] = self.potential[index].min(-d);
                            self.stamp_color(index, color);
                        }
                        BrushOp::Erase => {
                            self.potential[index] = self.potential[index].max(d);
                        }
                        BrushOp::Recolor(color) => {
                            self.stamp_color(index, color);
                        }
                    }
                    touched = true;
                }
            }
        }
        touched
    }

    #[inline]
    fn stamp_color(&mut self, index: usize, color: [u8; 3]) {
        // Unconditional overwrite: the last writer in a stroke wins.
        self.color_field[index * 3..index * 3 + 3].copy_from_slice(&color);
    }
}

#[derive(Clone, Copy)]
enum BrushOp {
    Paint([u8; 3]),
    Erase,
    Recolor([u8; 3]),
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = [255, 0, 0];
    const BLUE: [u8; 3] = [0, 0, 255];

    #[test]
    fn test_starts_empty() {
        let field = PotentialField::new();
        assert_eq!(field.potential().len(), FIELD_VOLUME);
        assert_eq!(field.color_field().len(), FIELD_VOLUME * 3);
        assert!(field.potential().iter().all(|&p| p == EMPTY_POTENTIAL));
    }

    #[test]
    fn test_index_mapping_y_has_largest_stride() {
        let n = FIELD_SIZE as i32;
        assert_eq!(PotentialField::index(1, 0, 0), 1);
        assert_eq!(PotentialField::index(0, 1, 0), (n * n) as usize);
        assert_eq!(PotentialField::index(0, 0, 1), n as usize);
    }

    #[test]
    fn test_paint_center_reaches_full_depth() {
        let mut field = PotentialField::new();
        assert!(field.paint(IVec3::splat(5), 1.0, RED));

        // d = (max - 0) / max = 1 at the stroke center.
        assert_eq!(field.get(5, 5, 5), -1.0);
        assert_eq!(field.color_at(5, 5, 5), RED);
        // Falloff weakens with distance but the cell is still inside.
        let edge = field.get(6, 5, 5);
        assert!(edge < 0.0 && edge > -1.0);
    }

    #[test]
    fn test_paint_is_monotonic() {
        let mut field = PotentialField::new();
        field.paint(IVec3::splat(5), 1.0, RED);
        let deep = field.get(5, 5, 5);
        // A weaker overlapping stroke cannot pull the cell back out.
        field.paint(IVec3::new(6, 5, 5), 1.0, RED);
        assert!(field.get(5, 5, 5) <= deep);
    }

    #[test]
    fn test_erase_undoes_paint_without_overshoot() {
        let mut field = PotentialField::new();
        field.paint(IVec3::splat(5), 1.0, RED);
        field.erase(IVec3::splat(5), 1.0);

        let p = field.get(5, 5, 5);
        // Back outside the surface, but never past the empty fill constant.
        assert!(p > 0.0);
        assert!(p <= EMPTY_POTENTIAL);
    }

    #[test]
    fn test_erase_on_empty_field_is_a_noop_value_wise() {
        let mut field = PotentialField::new();
        field.erase(IVec3::splat(5), 1.0);
        // max(EMPTY, d) == EMPTY for every cell in range.
        assert!(field.potential().iter().all(|&p| p == EMPTY_POTENTIAL));
    }

    #[test]
    fn test_bounds_stay_within_falloff_envelope() {
        let mut field = PotentialField::new();
        for i in 0..8 {
            field.paint(IVec3::new(i, 5, 5), 2.0, RED);
            field.erase(IVec3::new(i, 4, 5), 2.0);
        }
        for &p in field.potential() {
            assert!((-1.0..=EMPTY_POTENTIAL).contains(&p), "out of range: {p}");
        }
    }

    #[test]
    fn test_recolor_leaves_potential_untouched() {
        let mut field = PotentialField::new();
        field.paint(IVec3::splat(5), 1.0, RED);
        let before: Vec<f32> = field.potential().to_vec();

        field.recolor(IVec3::splat(5), 1.0, BLUE);
        assert_eq!(field.potential(), &before[..]);
        assert_eq!(field.color_at(5, 5, 5), BLUE);
    }

    #[test]
    fn test_brush_clips_at_chunk_boundary() {
        let mut field = PotentialField::new();
        // Center outside the lattice: only the overlapping corner applies.
        assert!(field.paint(IVec3::new(-1, 0, 0), 1.0, RED));
        assert!(field.get(0, 0, 0) < 0.0);

        // Entirely out of reach: nothing touched.
        let mut far = PotentialField::new();
        assert!(!far.paint(IVec3::new(-5, 0, 0), 1.0, RED));
    }

    #[test]
    fn test_zero_radius_touches_single_point() {
        let mut field = PotentialField::new();
        field.paint(IVec3::splat(3), 0.0, RED);
        assert!(field.get(3, 3, 3) < 0.0);
        assert_eq!(field.get(4, 3, 3), EMPTY_POTENTIAL);
    }
}
