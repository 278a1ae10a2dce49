//! The GPU-consumed, fixed 48-byte per-splat record.
//!
//! Layout must match the (external, out-of-scope) GPU shader side
//! byte-for-byte. Field order and sizes below are load-bearing; do not
//! reorder without updating the shader contract this crate does not own.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use half::f16;

use crate::math::covariance_from_scale_rotation;
use crate::point::ScenePoint;

/// Fixed 48-byte GPU-side splat record (see module docs for the layout
/// table). `position` + 4-byte alignment pad, `color+alpha` as four
/// half-floats, the covariance upper-triangle split into two 3xf16 groups,
/// and 12 bytes of tail padding to keep the stride at 48 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct EncodedSplat {
    pub position: [f32; 3],
    _pad0: u32,
    pub color_alpha: [f16; 4],
    pub cov_a: [f16; 3],
    pub cov_b: [f16; 3],
    _pad1: [u32; 3],
}

const _: () = assert!(std::mem::size_of::<EncodedSplat>() == 48);

impl EncodedSplat {
    /// Byte stride of one record. Must match the GPU shader's stride.
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// Encode a scene point into its GPU-side record.
    ///
    /// Color is converted sRGB->linear (gamma 2.2) when the source is 8-bit
    /// sRGB; a raw SH0 coefficient is stored verbatim per §3.
    pub fn from_scene_point(point: &ScenePoint) -> Self {
        let base_color = point.color.base_linear();
        let alpha = point.opacity.to_linear();
        let scale = point.scale.to_linear();
        let cov = covariance_from_scale_rotation(scale, point.rotation);

        Self {
            position: point.position.to_array(),
            _pad0: 0,
            color_alpha: [
                f16::from_f32(base_color.x),
                f16::from_f32(base_color.y),
                f16::from_f32(base_color.z),
                f16::from_f32(alpha),
            ],
            cov_a: [
                f16::from_f32(cov.xx),
                f16::from_f32(cov.xy),
                f16::from_f32(cov.xz),
            ],
            cov_b: [f16::from_f32(cov.yy), f16::from_f32(cov.yz), f16::from_f32(cov.zz)],
            _pad1: [0; 3],
        }
    }

    /// Decoded world-space position.
    #[inline]
    pub fn decoded_position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Decoded linear color (r, g, b) and alpha.
    #[inline]
    pub fn decoded_color_alpha(&self) -> (Vec3, f32) {
        (
            Vec3::new(
                self.color_alpha[0].to_f32(),
                self.color_alpha[1].to_f32(),
                self.color_alpha[2].to_f32(),
            ),
            self.color_alpha[3].to_f32(),
        )
    }

    /// Decoded covariance upper triangle as (xx, xy, xz, yy, yz, zz).
    #[inline]
    pub fn decoded_covariance(&self) -> [f32; 6] {
        [
            self.cov_a[0].to_f32(),
            self.cov_a[1].to_f32(),
            self.cov_a[2].to_f32(),
            self.cov_b[0].to_f32(),
            self.cov_b[1].to_f32(),
            self.cov_b[2].to_f32(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{Color, Opacity, Scale};
    use glam::Quat;

    fn sample_point() -> ScenePoint {
        ScenePoint {
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Color::SrgbU8([200, 100, 50]),
            opacity: Opacity::Linear(0.75),
            scale: Scale::Linear(Vec3::new(0.1, 0.2, 0.3)),
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn stride_is_48_bytes() {
        assert_eq!(EncodedSplat::STRIDE, 48);
    }

    #[test]
    fn position_round_trips_exactly() {
        let point = sample_point();
        let encoded = EncodedSplat::from_scene_point(&point);
        assert_eq!(encoded.decoded_position(), point.position);
    }

    #[test]
    fn scale_recovered_from_covariance_within_tolerance() {
        let point = sample_point();
        let encoded = EncodedSplat::from_scene_point(&point);
        let cov = encoded.decoded_covariance();
        let scale = point.scale.to_linear();
        let expected = [scale.x * scale.x, scale.y * scale.y, scale.z * scale.z];
        let got = [cov[0], cov[3], cov[5]];
        for (e, g) in expected.iter().zip(got.iter()) {
            let rel_err = (e - g).abs() / e.max(1e-6);
            assert!(rel_err < 1e-3, "expected {e}, got {g}, rel_err {rel_err}");
        }
    }

    #[test]
    fn raw_sh0_is_stored_verbatim() {
        let point = ScenePoint {
            color: Color::Sh(vec![Vec3::new(0.2, 0.4, 0.6)]),
            ..sample_point()
        };
        let encoded = EncodedSplat::from_scene_point(&point);
        let (rgb, _) = encoded.decoded_color_alpha();
        assert!((rgb.x - 0.2).abs() < 1e-3);
        assert!((rgb.y - 0.4).abs() < 1e-3);
        assert!((rgb.z - 0.6).abs() < 1e-3);
    }
}
