//! The shared triangle-vertex-index buffer (§4.5 step 9): two triangles per
//! quad-shaped splat, `[4i+0,4i+1,4i+2, 4i+1,4i+2,4i+3]` for `i` in
//! `[0, indexed_count)`.

use splat_gpu::{GpuBuffer, GpuDevice, Result};
use std::sync::Arc;

/// Grows (never shrinks) a `u32` index buffer to hold at least
/// `6 * indexed_count` entries following the quad-triangulation pattern.
pub struct TriangleIndexBuffer {
    buffer: GpuBuffer<u32>,
    indexed_count: u32,
}

impl TriangleIndexBuffer {
    pub fn new(device: Arc<dyn GpuDevice>) -> Result<Self> {
        Ok(Self {
            buffer: GpuBuffer::new(device, 0)?,
            indexed_count: 0,
        })
    }

    /// Ensure the buffer holds `6 * indexed_count` entries, regenerating
    /// the pattern only when `indexed_count` grows.
    pub fn ensure(&mut self, indexed_count: u32) -> Result<()> {
        if indexed_count <= self.indexed_count {
            return Ok(());
        }
        let needed = indexed_count as usize * 6;
        self.buffer.set_capacity(needed)?;
        self.buffer.clear();
        let mut pattern = Vec::with_capacity(needed);
        for i in 0..indexed_count {
            let base = 4 * i;
            pattern.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 2, base + 3]);
        }
        self.buffer.append_slice(&pattern)?;
        self.indexed_count = indexed_count;
        Ok(())
    }

    /// Current index count (`6 * indexed_count`).
    pub fn index_count(&self) -> u32 {
        self.indexed_count * 6
    }

    pub fn device_address(&self) -> u64 {
        self.buffer.device_address()
    }
}
