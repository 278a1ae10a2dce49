//! Camera pose used by the depth sorter.

use glam::Vec3;

/// World-space camera pose consumed by the sorter. `forward` is expected to
/// already be normalized by the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub forward: Vec3,
}

impl CameraPose {
    /// Construct a pose, normalizing `forward`.
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize(),
        }
    }

    /// Average a set of per-viewport poses into one mean pose for the
    /// sorter (§4.5 step 4: mean camera position, mean normalized forward).
    ///
    /// Returns `None` for an empty slice.
    pub fn mean(poses: &[CameraPose]) -> Option<CameraPose> {
        if poses.is_empty() {
            return None;
        }
        let n = poses.len() as f32;
        let position = poses.iter().map(|p| p.position).sum::<Vec3>() / n;
        let forward = poses.iter().map(|p| p.forward).sum::<Vec3>() / n;
        Some(CameraPose::new(position, forward))
    }
}
