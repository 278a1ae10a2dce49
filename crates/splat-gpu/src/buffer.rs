//! Typed, resizable, device-shared buffer (§4.1).

use std::sync::Arc;

use bytemuck::Pod;

use crate::device::GpuDevice;
use crate::error::{GpuError, Result};

/// A typed, heap-allocated, device-shared buffer with capacity/count and a
/// stable element view between resizes.
///
/// Resize allocates a new device region, copies the live `min(old_count,
/// new_count)` elements, and swaps it in; any `&`/`&mut` borrow obtained
/// before a resize cannot outlive it (the borrow checker enforces the
/// spec's "callers must re-acquire after any resize they initiated" rule
/// for free).
pub struct GpuBuffer<T> {
    device: Arc<dyn GpuDevice>,
    allocation: crate::device::DeviceAllocation,
    capacity: usize,
    count: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> GpuBuffer<T> {
    const STRIDE: usize = std::mem::size_of::<T>();

    /// Allocate a new buffer with room for `capacity` elements.
    pub fn new(device: Arc<dyn GpuDevice>, capacity: usize) -> Result<Self> {
        Self::check_capacity(device.as_ref(), capacity)?;
        let allocation = device.allocate(capacity * Self::STRIDE)?;
        Ok(Self {
            device,
            allocation,
            capacity,
            count: 0,
            _marker: std::marker::PhantomData,
        })
    }

    fn check_capacity(device: &dyn GpuDevice, capacity: usize) -> Result<()> {
        let max = device.max_buffer_length(Self::STRIDE);
        if capacity > max {
            return Err(GpuError::CapacityExceeded {
                requested: capacity,
                max,
            });
        }
        Ok(())
    }

    /// Current capacity, in elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current live element count (`<= capacity`).
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Resize to `new_capacity`, preserving `min(count, new_capacity)`
    /// elements. Allocates a new device region and copies; invalidates any
    /// previously borrowed slice (the borrow checker rejects reuse).
    pub fn set_capacity(&mut self, new_capacity: usize) -> Result<()> {
        Self::check_capacity(self.device.as_ref(), new_capacity)?;
        let mut new_allocation = self.device.allocate(new_capacity * Self::STRIDE)?;

        let keep = self.count.min(new_capacity);
        let keep_bytes = keep * Self::STRIDE;
        new_allocation.bytes[..keep_bytes].copy_from_slice(&self.allocation.bytes[..keep_bytes]);

        self.allocation = new_allocation;
        self.capacity = new_capacity;
        self.count = keep;
        Ok(())
    }

    /// Grow capacity to at least `n`, no-op if already large enough.
    pub fn ensure_capacity(&mut self, n: usize) -> Result<()> {
        if self.capacity < n {
            self.set_capacity(n)?;
        }
        Ok(())
    }

    /// Append one element. Caller is responsible for capacity (§4.1);
    /// returns `InvalidState` rather than silently growing or truncating.
    pub fn append(&mut self, element: T) -> Result<()> {
        self.append_slice(std::slice::from_ref(&element))
    }

    /// Append a slice of elements. Caller-checked capacity, as `append`.
    pub fn append_slice(&mut self, elements: &[T]) -> Result<()> {
        if self.count + elements.len() > self.capacity {
            return Err(GpuError::InvalidState(format!(
                "append of {} elements would exceed capacity {} (count {})",
                elements.len(),
                self.capacity,
                self.count
            )));
        }
        let start = self.count * Self::STRIDE;
        let end = start + elements.len() * Self::STRIDE;
        self.allocation.bytes[start..end].copy_from_slice(bytemuck::cast_slice(elements));
        self.count += elements.len();
        Ok(())
    }

    /// Reset the live count to zero without reallocating.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// The live elements, as a stable (until the next resize) slice.
    pub fn as_slice(&self) -> &[T] {
        bytemuck::cast_slice(&self.allocation.bytes[..self.count * Self::STRIDE])
    }

    /// Mutable access to the live elements.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(&mut self.allocation.bytes[..self.count * Self::STRIDE])
    }

    /// The device-shared address backing this buffer's current allocation,
    /// for embedding into GPU-side descriptor tables (e.g. a chunk table's
    /// per-chunk splat pointer). Changes after any resize, matching the
    /// "prior aliases invalid after resize" rule in §4.1.
    #[inline]
    pub fn device_address(&self) -> u64 {
        self.allocation.bytes.as_ptr() as u64
    }
}
