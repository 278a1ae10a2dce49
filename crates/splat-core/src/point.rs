//! Scene-point types: the caller-facing, pre-encode representation of a
//! single Gaussian splat.
//!
//! A `ScenePoint` is what a (caller-owned, out-of-scope) PLY/.splat/SPZ
//! loader produces; `EncodedSplat` (see [`crate::encoded`]) is what the GPU
//! consumes. The tagged sums below replace the duck-typed color/opacity/
//! scale variants a dynamically-typed loader might hand back.

use glam::{Quat, Vec3};

/// View-independent base color (degree-0 spherical harmonic), either as
/// 8-bit sRGB or as a raw SH0 coefficient triplet already in linear space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Color {
    /// 8-bit sRGB, gamma 2.2, converted to linear on encode.
    SrgbU8([u8; 3]),
    /// Raw spherical-harmonic coefficients, stored verbatim on encode.
    /// Degree is derived from the coefficient count (1, 4, 9, or 16 triplets).
    Sh(Vec<Vec3>),
}

impl Color {
    /// The base (degree-0) color triplet in linear space, suitable for the
    /// `EncodedSplat` color field.
    pub fn base_linear(&self) -> Vec3 {
        match self {
            Color::SrgbU8(rgb) => crate::math::srgb_to_linear(Vec3::new(
                f32::from(rgb[0]) / 255.0,
                f32::from(rgb[1]) / 255.0,
                f32::from(rgb[2]) / 255.0,
            )),
            Color::Sh(coeffs) => coeffs.first().copied().unwrap_or(Vec3::ZERO),
        }
    }

    /// Higher-order SH triplets (degree 1 and above), if any.
    pub fn higher_order(&self) -> &[Vec3] {
        match self {
            Color::SrgbU8(_) => &[],
            Color::Sh(coeffs) => {
                if coeffs.len() > 1 {
                    &coeffs[1..]
                } else {
                    &[]
                }
            }
        }
    }

    /// SH degree implied by the coefficient count: 0, 1, 2, or 3.
    pub fn sh_degree(&self) -> u8 {
        match self {
            Color::SrgbU8(_) => 0,
            Color::Sh(coeffs) => match coeffs.len() {
                0 | 1 => 0,
                2..=4 => 1,
                5..=9 => 2,
                _ => 3,
            },
        }
    }
}

/// Opacity, in whichever representation the source format used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Opacity {
    /// Logit-space value (pre-sigmoid), as commonly stored by 3DGS training.
    Logit(f32),
    /// Already-linear alpha in `[0, 1]`.
    Linear(f32),
    /// 8-bit linear alpha.
    LinearU8(u8),
}

impl Opacity {
    /// Resolve to a linear alpha in `[0, 1]`.
    pub fn to_linear(self) -> f32 {
        match self {
            Opacity::Logit(l) => 1.0 / (1.0 + (-l).exp()),
            Opacity::Linear(a) => a,
            Opacity::LinearU8(a) => f32::from(a) / 255.0,
        }
    }
}

/// Per-axis scale, in whichever representation the source format used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scale {
    /// Log-space scale (training parameterization); exponentiated on resolve.
    Exponent(Vec3),
    /// Already-linear scale.
    Linear(Vec3),
}

impl Scale {
    /// Resolve to a linear per-axis scale vector.
    pub fn to_linear(self) -> Vec3 {
        match self {
            Scale::Exponent(v) => Vec3::new(v.x.exp(), v.y.exp(), v.z.exp()),
            Scale::Linear(v) => v,
        }
    }
}

/// A single decoded Gaussian splat, as handed to the renderer by an
/// out-of-scope file-format loader.
#[derive(Clone, Debug)]
pub struct ScenePoint {
    pub position: Vec3,
    pub color: Color,
    pub opacity: Opacity,
    pub scale: Scale,
    pub rotation: Quat,
}

impl ScenePoint {
    /// SH degree implied by this point's color representation.
    pub fn sh_degree(&self) -> u8 {
        self.color.sh_degree()
    }
}
