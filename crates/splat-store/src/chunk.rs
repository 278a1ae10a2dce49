//! A self-contained, GPU-shared unit of splats with an immutable SH degree
//! (§3, §4.1).

use std::sync::Arc;

use glam::Vec3;
use half::f16;
use splat_core::{sh_extra_triplet_count, EncodedSplat, ScenePoint};
use splat_gpu::{GpuBuffer, GpuDevice};

use crate::error::Result;

/// One independently-owned batch of Gaussian splats.
///
/// Exclusively owns its `EncodedSplat` array and, for SH degree 1-3 scenes,
/// a parallel half-precision coefficient buffer holding the higher-order
/// triplets. Splat count and SH degree are fixed once built.
pub struct SplatChunk {
    encoded: GpuBuffer<EncodedSplat>,
    sh: Option<GpuBuffer<f16>>,
    sh_degree: u8,
}

impl SplatChunk {
    /// Encode `points` into GPU-shared buffers. SH degree is taken from the
    /// first point; a chunk is not responsible for reconciling a source that
    /// mixes degrees within one batch.
    pub fn new(device: Arc<dyn GpuDevice>, points: &[ScenePoint]) -> Result<Self> {
        let sh_degree = points.first().map(ScenePoint::sh_degree).unwrap_or(0);

        let mut encoded = GpuBuffer::new(device.clone(), points.len())?;
        let records: Vec<EncodedSplat> = points.iter().map(EncodedSplat::from_scene_point).collect();
        encoded.append_slice(&records)?;

        let extra = sh_extra_triplet_count(sh_degree);
        let sh = if extra > 0 {
            let mut buf = GpuBuffer::new(device, points.len() * extra * 3)?;
            let mut flat = Vec::with_capacity(points.len() * extra * 3);
            for point in points {
                let coeffs = point.color.higher_order();
                for i in 0..extra {
                    let c = coeffs.get(i).copied().unwrap_or(Vec3::ZERO);
                    flat.push(f16::from_f32(c.x));
                    flat.push(f16::from_f32(c.y));
                    flat.push(f16::from_f32(c.z));
                }
            }
            buf.append_slice(&flat)?;
            Some(buf)
        } else {
            None
        };

        Ok(Self {
            encoded,
            sh,
            sh_degree,
        })
    }

    /// Number of splats in this chunk.
    #[inline]
    pub fn splat_count(&self) -> usize {
        self.encoded.count()
    }

    /// This chunk's fixed SH degree (0-3).
    #[inline]
    pub fn sh_degree(&self) -> u8 {
        self.sh_degree
    }

    /// Read-only access to the encoded splat array, used by the sort loop's
    /// depth pass and the frame encoder's GPU-address lookup.
    pub fn encoded(&self) -> &GpuBuffer<EncodedSplat> {
        &self.encoded
    }

    /// Mutable access, used only by the locality pre-sort while the chunk
    /// has not yet been handed to the store (or while the store holds
    /// exclusive access on the caller's behalf).
    pub fn encoded_mut(&mut self) -> &mut GpuBuffer<EncodedSplat> {
        &mut self.encoded
    }

    /// The parallel higher-order SH coefficient buffer, if `sh_degree() > 0`.
    pub fn sh(&self) -> Option<&GpuBuffer<f16>> {
        self.sh.as_ref()
    }

    /// Mutable access to the SH buffer, for locality pre-sort permutation.
    pub fn sh_mut(&mut self) -> Option<&mut GpuBuffer<f16>> {
        self.sh.as_mut()
    }

    /// Per-splat stride of the SH buffer, in `f16` elements (0 if degree 0).
    pub fn sh_stride(&self) -> usize {
        sh_extra_triplet_count(self.sh_degree) * 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use splat_core::{Color, Opacity, Scale};
    use splat_gpu::HostDevice;

    fn point(x: f32) -> ScenePoint {
        ScenePoint {
            position: Vec3::new(x, 0.0, 0.0),
            color: Color::SrgbU8([255, 255, 255]),
            opacity: Opacity::Linear(1.0),
            scale: Scale::Linear(Vec3::ONE),
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn degree_zero_chunk_has_no_sh_buffer() {
        let chunk = SplatChunk::new(HostDevice::unbounded(), &[point(0.0), point(1.0)]).unwrap();
        assert_eq!(chunk.splat_count(), 2);
        assert_eq!(chunk.sh_degree(), 0);
        assert!(chunk.sh().is_none());
    }

    #[test]
    fn degree_one_chunk_allocates_three_triplets_per_splat() {
        let mut p = point(0.0);
        p.color = Color::Sh(vec![Vec3::ZERO; 4]);
        let chunk = SplatChunk::new(HostDevice::unbounded(), &[p]).unwrap();
        assert_eq!(chunk.sh_degree(), 1);
        assert_eq!(chunk.sh().unwrap().count(), 3 * 3);
    }
}
