//! Per-viewport uniform data and the dynamic-uniform ring buffer it rotates
//! through (§4.5 step 7).

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use splat_gpu::{GpuBuffer, GpuDevice};
use std::sync::Arc;

use crate::viewport::ViewportDesc;

/// 256-byte dynamic-uniform alignment, matching the spec's "256-byte
/// aligned" slot stride (§4.5 step 7).
pub const UNIFORM_SLOT_STRIDE: usize = 256;

/// Per-viewport uniform data handed to the (external) vertex/fragment
/// shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub screen_size: [u32; 2],
    pub splat_count: u32,
    pub indexed_splat_count: u32,
}

impl Uniforms {
    pub fn from_viewport(viewport: &ViewportDesc, splat_count: u32, indexed_splat_count: u32) -> Self {
        Self {
            projection: viewport.projection.to_cols_array_2d(),
            view: viewport.view.to_cols_array_2d(),
            screen_size: [viewport.screen_size.0, viewport.screen_size.1],
            splat_count,
            indexed_splat_count,
        }
    }
}

/// Ring of `max_simultaneous_renders` uniform slots, each
/// [`UNIFORM_SLOT_STRIDE`]-byte aligned, advanced one slot per render
/// (§4.5 step 7). Backed by a single byte buffer rather than one
/// allocation per slot, matching a real dynamic-uniform ring.
pub struct UniformRing {
    buffer: GpuBuffer<u8>,
    slot_count: usize,
    current: usize,
}

impl UniformRing {
    pub fn new(device: Arc<dyn GpuDevice>, slot_count: usize) -> splat_gpu::Result<Self> {
        let slot_count = slot_count.max(1);
        let mut buffer = GpuBuffer::new(device, slot_count * UNIFORM_SLOT_STRIDE)?;
        buffer.append_slice(&vec![0u8; slot_count * UNIFORM_SLOT_STRIDE])?;
        Ok(Self {
            buffer,
            slot_count,
            // Advancing from `slot_count - 1` first lands on slot 0.
            current: slot_count - 1,
        })
    }

    /// Advance to `(previous + 1) % slot_count` and write `uniforms` into
    /// it, returning the slot index used.
    pub fn advance_and_write(&mut self, uniforms: Uniforms) -> usize {
        self.current = (self.current + 1) % self.slot_count;
        let start = self.current * UNIFORM_SLOT_STRIDE;
        let bytes = bytemuck::bytes_of(&uniforms);
        self.buffer.as_mut_slice()[start..start + bytes.len()].copy_from_slice(bytes);
        self.current
    }

    /// Read back the uniforms last written to `slot`, for tests and
    /// diagnostics.
    pub fn read(&self, slot: usize) -> Uniforms {
        let start = slot * UNIFORM_SLOT_STRIDE;
        bytemuck::pod_read_unaligned(&self.buffer.as_slice()[start..start + std::mem::size_of::<Uniforms>()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splat_core::CameraPose;
    use splat_gpu::HostDevice;
    use glam::{Mat4, Vec3};

    fn sample_viewport() -> ViewportDesc {
        ViewportDesc {
            rect: crate::viewport::ViewportRect {
                x: 0.0,
                y: 0.0,
                width: 800.0,
                height: 600.0,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            screen_size: (800, 600),
            camera: CameraPose::new(Vec3::ZERO, Vec3::Z),
        }
    }

    #[test]
    fn ring_advances_modulo_slot_count() {
        let mut ring = UniformRing::new(HostDevice::unbounded(), 3).unwrap();
        let viewport = sample_viewport();
        let a = ring.advance_and_write(Uniforms::from_viewport(&viewport, 10, 10));
        let b = ring.advance_and_write(Uniforms::from_viewport(&viewport, 20, 10));
        let c = ring.advance_and_write(Uniforms::from_viewport(&viewport, 30, 10));
        let d = ring.advance_and_write(Uniforms::from_viewport(&viewport, 40, 10));
        assert_eq!([a, b, c, d], [0, 1, 2, 0]);
        assert_eq!(ring.read(0).splat_count, 40);
    }
}
