//! Covariance and color math for Gaussian splats.

use glam::{Quat, Vec3};

/// The six independent entries of a symmetric 3x3 covariance matrix,
/// stored as the upper triangle: (xx, xy, xz, yy, yz, zz).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CovarianceUpper {
    pub xx: f32,
    pub xy: f32,
    pub xz: f32,
    pub yy: f32,
    pub yz: f32,
    pub zz: f32,
}

/// Build the covariance matrix `R * diag(scale)^2 * R^T` from a unit
/// rotation and a per-axis scale, returning its upper triangle.
///
/// `rotation` is expected to already be normalized; `scale` holds linear
/// (not log/exp-encoded) scale factors.
#[inline]
pub fn covariance_from_scale_rotation(scale: Vec3, rotation: Quat) -> CovarianceUpper {
    let r = glam::Mat3::from_quat(rotation);
    let s2 = scale * scale;

    // M = R * diag(s^2), then cov = M * R^T.
    let m = glam::Mat3::from_cols(r.x_axis * s2.x, r.y_axis * s2.y, r.z_axis * s2.z);
    let cov = m * r.transpose();

    CovarianceUpper {
        xx: cov.x_axis.x,
        xy: cov.x_axis.y,
        xz: cov.x_axis.z,
        yy: cov.y_axis.y,
        yz: cov.y_axis.z,
        zz: cov.z_axis.z,
    }
}

/// Recover the per-axis variance (squared scale) along the coordinate axes
/// from a covariance's diagonal. This is only exact when the rotation is
/// identity; for the round-trip property test (§8) the scale is applied
/// with identity rotation so `covariance.xx/yy/zz == scale.x/y/z squared`.
#[inline]
pub fn diagonal_variance(cov: CovarianceUpper) -> Vec3 {
    Vec3::new(cov.xx, cov.yy, cov.zz)
}

/// Convert a single sRGB channel value (0.0-1.0) to linear space (gamma 2.2).
#[inline]
pub fn srgb_to_linear_channel(c: f32) -> f32 {
    c.max(0.0).powf(2.2)
}

/// Convert linear space back to sRGB (gamma 2.2), for tests and tooling
/// that need to display decoded colors.
#[inline]
pub fn linear_to_srgb_channel(c: f32) -> f32 {
    c.max(0.0).powf(1.0 / 2.2)
}

/// Convert an sRGB color triplet (0.0-1.0 per channel) to linear.
#[inline]
pub fn srgb_to_linear(c: Vec3) -> Vec3 {
    Vec3::new(
        srgb_to_linear_channel(c.x),
        srgb_to_linear_channel(c.y),
        srgb_to_linear_channel(c.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_rotation_covariance_is_diagonal() {
        let scale = Vec3::new(1.0, 2.0, 3.0);
        let cov = covariance_from_scale_rotation(scale, Quat::IDENTITY);
        assert_relative_eq!(cov.xx, 1.0, epsilon = 1e-5);
        assert_relative_eq!(cov.yy, 4.0, epsilon = 1e-5);
        assert_relative_eq!(cov.zz, 9.0, epsilon = 1e-5);
        assert_relative_eq!(cov.xy, 0.0, epsilon = 1e-5);
        assert_relative_eq!(cov.xz, 0.0, epsilon = 1e-5);
        assert_relative_eq!(cov.yz, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn covariance_is_symmetric_positive_semidefinite() {
        // P6: for an arbitrary rotation, the encoded upper triangle must
        // correspond to a symmetric PSD matrix. We check PSD via the
        // standard 3x3 leading-principal-minor test.
        let scale = Vec3::new(0.5, 1.5, 2.5);
        let rotation = Quat::from_euler(glam::EulerRot::XYZ, 0.3, 1.1, -0.7);
        let cov = covariance_from_scale_rotation(scale, rotation);

        assert!(cov.xx >= -1e-4);
        let det2 = cov.xx * cov.yy - cov.xy * cov.xy;
        assert!(det2 >= -1e-3);

        let det3 = cov.xx * (cov.yy * cov.zz - cov.yz * cov.yz)
            - cov.xy * (cov.xy * cov.zz - cov.yz * cov.xz)
            + cov.xz * (cov.xy * cov.yz - cov.yy * cov.xz);
        assert!(det3 >= -1e-2);
    }

    #[test]
    fn srgb_round_trip() {
        let c = Vec3::new(0.2, 0.5, 0.8);
        let linear = srgb_to_linear(c);
        let back = Vec3::new(
            linear_to_srgb_channel(linear.x),
            linear_to_srgb_channel(linear.y),
            linear_to_srgb_channel(linear.z),
        );
        assert_relative_eq!(back.x, c.x, epsilon = 1e-4);
        assert_relative_eq!(back.y, c.y, epsilon = 1e-4);
        assert_relative_eq!(back.z, c.z, epsilon = 1e-4);
    }
}
