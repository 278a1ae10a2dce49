//! Device-shared buffer abstraction and scratch-buffer pool (§2 components
//! 1-2, §4.1-4.2).
//!
//! This crate deliberately does not talk to a physical GPU: the real
//! Vulkan/Metal/wgpu backend is an external collaborator (§1) that plugs in
//! through the [`device::GpuDevice`] trait. What lives here is the part of
//! the engine that is backend-agnostic: typed resizable buffers and a
//! tag-keyed free list for transient per-frame scratch allocations.

pub mod buffer;
pub mod device;
pub mod error;
pub mod pool;

pub use buffer::GpuBuffer;
pub use device::{DeviceAllocation, GpuDevice, HostDevice};
pub use error::{GpuError, Result};
pub use pool::{BufferPool, ScratchBuffer};
