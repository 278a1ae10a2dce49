//! The external-collaborator seam for device-shared memory (§1, §4.1).
//!
//! A real backend (Vulkan/Metal/wgpu) supplies a [`GpuDevice`] that hands
//! back host-visible, device-shared memory; this crate never talks to a
//! physical GPU itself. [`HostDevice`] is the in-repo reference
//! implementation used by the unit and property tests in this workspace,
//! and by any caller happy to stage splat data on the CPU.

use std::sync::Arc;

use crate::error::{GpuError, Result};

/// A host-visible allocation backing one [`crate::buffer::GpuBuffer`].
///
/// On a real backend this would wrap device-shared memory; `HostDevice`
/// backs it with a plain boxed byte slice.
pub struct DeviceAllocation {
    pub(crate) bytes: Box<[u8]>,
}

impl DeviceAllocation {
    /// Create a zeroed allocation of the given byte length.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len].into_boxed_slice(),
        }
    }
}

/// Supplies device-shared memory to [`crate::buffer::GpuBuffer`].
///
/// `max_buffer_length` bounds the element count a buffer of the given
/// stride may hold (§4.1: `capacity <= device.max_buffer_length / element_stride`,
/// expressed here directly in elements to keep the call site simple).
pub trait GpuDevice: Send + Sync {
    /// Maximum number of `element_stride`-byte elements a single buffer may hold.
    fn max_buffer_length(&self, element_stride: usize) -> usize;

    /// Allocate a zeroed, host-visible region of exactly `bytes` bytes.
    fn allocate(&self, bytes: usize) -> Result<DeviceAllocation>;
}

/// Reference [`GpuDevice`] backed by ordinary heap memory.
///
/// Used by this workspace's tests (there is no physical GPU in this
/// repository) and suitable for any caller that wants to stage splat data
/// purely on the CPU before handing it to a real backend.
pub struct HostDevice {
    max_bytes_per_buffer: usize,
}

impl HostDevice {
    /// A host device with an effectively unbounded per-buffer size.
    pub fn unbounded() -> Arc<Self> {
        Arc::new(Self {
            max_bytes_per_buffer: usize::MAX,
        })
    }

    /// A host device that rejects allocations above `max_bytes_per_buffer`,
    /// for exercising the `capacity_exceeded` path in tests.
    pub fn bounded(max_bytes_per_buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            max_bytes_per_buffer,
        })
    }
}

impl GpuDevice for HostDevice {
    fn max_buffer_length(&self, element_stride: usize) -> usize {
        if element_stride == 0 {
            return 0;
        }
        self.max_bytes_per_buffer / element_stride
    }

    fn allocate(&self, bytes: usize) -> Result<DeviceAllocation> {
        if bytes > self.max_bytes_per_buffer {
            return Err(GpuError::AllocationFailed(format!(
                "requested {bytes} bytes exceeds host device bound {}",
                self.max_bytes_per_buffer
            )));
        }
        Ok(DeviceAllocation::zeroed(bytes))
    }
}
