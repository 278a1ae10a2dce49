//! Engine-level error type (§7).

use thiserror::Error;

/// Errors surfaced while constructing a [`crate::Renderer`]. Per-frame and
/// per-chunk operations never fail (§7): a dropped frame or a degraded sort
/// buffer is reported through `tracing`, not `Result`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Gpu(#[from] splat_gpu::GpuError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
