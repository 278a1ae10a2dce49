//! Reference [`GraphicsBackend`]/[`CommandBuffer`] implementations with no
//! physical GPU behind them, for this workspace's own tests and for any
//! caller exercising the engine without a real backend (mirrors
//! `splat_gpu::HostDevice`'s role for buffers).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{BackendError, CommandBuffer, GraphicsBackend, PipelineHandle, RecordedPass};
use crate::pipeline::PipelineVariant;

/// A backend that "compiles" pipelines by handing out incrementing opaque
/// handles and reports configurable capability flags.
pub struct NullBackend {
    next_handle: AtomicU64,
    tile_imageblock: bool,
    simulator: bool,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(0),
            tile_imageblock: true,
            simulator: false,
        }
    }

    /// A backend reporting no tile-imageblock support, to exercise the
    /// multi-stage-pipeline fallback.
    pub fn without_tile_imageblock() -> Self {
        Self {
            tile_imageblock: false,
            ..Self::new()
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for NullBackend {
    fn compile_pipeline(&self, _variant: PipelineVariant) -> Result<PipelineHandle, BackendError> {
        Ok(PipelineHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    fn supports_tile_imageblock(&self) -> bool {
        self.tile_imageblock
    }

    fn is_simulator(&self) -> bool {
        self.simulator
    }
}

/// A command buffer that records passes and completion handlers in memory
/// instead of submitting anything. Call [`Self::complete`] to simulate GPU
/// completion.
#[derive(Default)]
pub struct RecordingCommandBuffer {
    pub passes: Vec<RecordedPass>,
    handlers: Vec<Box<dyn FnOnce() + Send>>,
}

impl CommandBuffer for RecordingCommandBuffer {
    fn record_pass(&mut self, pass: RecordedPass) {
        self.passes.push(pass);
    }

    fn add_completion_handler(&mut self, handler: Box<dyn FnOnce() + Send>) {
        self.handlers.push(handler);
    }
}

impl RecordingCommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every registered completion handler, simulating the GPU
    /// finishing this command buffer.
    pub fn complete(self) {
        for handler in self.handlers {
            handler();
        }
    }
}
