//! Per-viewport render description (§4.5 inputs, §6 `render()`).

use glam::Mat4;
use splat_core::CameraPose;

/// A Metal-style viewport rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// One viewport's worth of render input. Stereo/multi-view rendering
/// passes more than one of these per frame (clamped to `max_view_count`,
/// itself clamped to the implementation maximum of 2, §6).
///
/// `camera` is supplied directly rather than derived from `view`: platform
/// camera/pose acquisition is an external collaborator (§1), so this crate
/// never assumes a particular view-matrix convention to extract it from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportDesc {
    pub rect: ViewportRect,
    pub projection: Mat4,
    pub view: Mat4,
    pub screen_size: (u32, u32),
    pub camera: CameraPose,
}
