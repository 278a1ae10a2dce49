//! The external-collaborator seam for the real GPU backend (§1, §4.5).
//!
//! This crate never issues a real draw call or compiles a real shader; a
//! caller plugs in a `GraphicsBackend` (Vulkan/Metal/wgpu) that resolves
//! pipeline variants to opaque handles, and a `CommandBuffer` that the
//! frame encoder records passes and a completion handler into. Command
//! submission itself remains entirely the caller's responsibility.

use thiserror::Error;

use crate::pipeline::PipelineVariant;

/// Opaque handle to a backend-resolved graphics pipeline. The core never
/// inspects its value; it only caches and re-passes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// Errors a real backend may report while resolving pipeline state or
/// recording passes.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("pipeline compilation failed: {0}")]
    PipelineCompilationFailed(String),
    #[error("chunk-table allocation failed: {0}")]
    AllocationFailed(String),
}

/// Backend-agnostic capability and pipeline-resolution surface (§4.5, §4.6).
///
/// The crate never talks to a physical GPU itself: a real integration
/// supplies an implementation that actually compiles shaders and reports
/// device capabilities.
pub trait GraphicsBackend: Send + Sync {
    /// Lazily resolve a pipeline variant to a backend handle. Called at
    /// most once per variant by [`crate::pipeline::PipelineCache`].
    fn compile_pipeline(&self, variant: PipelineVariant) -> Result<PipelineHandle, BackendError>;

    /// Whether the target supports tile imageblock memory, required for
    /// the multi-stage pipeline (§4.6).
    fn supports_tile_imageblock(&self) -> bool;

    /// Whether the target is a simulator/emulator. The multi-stage
    /// pipeline is never selected on one (§4.5 step 10).
    fn is_simulator(&self) -> bool;
}

/// One recorded draw call: a pipeline, an index/instance count, and which
/// viewport it targets.
#[derive(Clone, Copy, Debug)]
pub struct DrawCall {
    pub pipeline: PipelineHandle,
    pub index_count: u32,
    pub instance_count: u32,
}

/// A fully-recorded frame pass, ready for the caller to submit. The
/// single-stage variant is one draw; the multi-stage variant is the
/// initialize/draw/postprocess triple sharing tile memory (§4.5 step 13).
#[derive(Clone, Copy, Debug)]
pub enum RecordedPass {
    SingleStage {
        draw: DrawCall,
    },
    MultiStage {
        initialize: DrawCall,
        draw: DrawCall,
        postprocess: DrawCall,
    },
}

/// The GPU command buffer for one frame. The core only adds passes and a
/// completion handler to it (§4.5 step 14); it never submits it.
pub trait CommandBuffer {
    /// Record a pass built by the frame encoder.
    fn record_pass(&mut self, pass: RecordedPass);

    /// Register a callback run once the GPU has finished this command
    /// buffer. Must be infallible (§7): it only adjusts counters and
    /// releases pooled resources.
    fn add_completion_handler(&mut self, handler: Box<dyn FnOnce() + Send>);
}
