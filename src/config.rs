//! Brush configuration supplied by the UI collaborator.

use bevy::prelude::*;

/// Active editing tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    /// Push material into the potential field.
    #[default]
    Paint,
    /// Carve material out of the potential field.
    Erase,
    /// Restamp the color field without moving the surface.
    Recolor,
    /// Place discrete colored voxels.
    Voxel,
}

/// Brush parameters selected in the tool/color palette.
///
/// The core never reads input devices; the UI collaborator keeps this
/// resource up to date and the session copies it on demand via
/// [`SculptSession::set_brush`](crate::session::SculptSession::set_brush).
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct BrushSettings {
    /// Active tool.
    pub tool: Tool,
    /// Brush radius in grid cells. Zero paints a single lattice point.
    pub radius: f32,
    /// Brush color, sRGB bytes.
    pub color: [u8; 3],
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            tool: Tool::Paint,
            radius: 1.0,
            color: [255, 255, 255],
        }
    }
}

impl BrushSettings {
    /// Brush color as linear floats for vertex buffers.
    #[inline]
    pub fn color_f32(&self) -> [f32; 3] {
        [
            self.color[0] as f32 / 255.0,
            self.color[1] as f32 / 255.0,
            self.color[2] as f32 / 255.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_brush() {
        let brush = BrushSettings::default();
        assert_eq!(brush.tool, Tool::Paint);
        assert!(brush.radius > 0.0);
    }

    #[test]
    fn test_color_conversion() {
        let brush = BrushSettings {
            color: [255, 0, 51],
            ..Default::default()
        };
        let c = brush.color_f32();
        assert_eq!(c[0], 1.0);
        assert_eq!(c[1], 0.0);
        assert!((c[2] - 0.2).abs() < 1e-3);
    }
}
