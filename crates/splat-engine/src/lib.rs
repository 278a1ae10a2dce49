//! Public facade crate: wires the chunk store, async sorter, and frame
//! encoder into a single `Renderer` entry point and carries the
//! programmatic configuration surface (§2, §6).
//!
//! This is the only crate most callers need to depend on directly; it
//! re-exports what it does not itself own so that a caller can, e.g.,
//! build a `SplatChunk` or a `ScenePoint` without reaching into
//! `splat-store`/`splat-core` by name.

pub mod config;
pub mod error;
pub mod renderer;

pub use config::{ColorFormat, DepthFormat, RendererConfig, IMPLEMENTATION_MAX_VIEW_COUNT};
pub use error::{EngineError, Result};
pub use renderer::Renderer;

pub use splat_core::{CameraPose, ChunkId, Color, Opacity, ScenePoint, Scale};
pub use splat_gpu::{GpuDevice, HostDevice};
pub use splat_render::{CommandBuffer, GraphicsBackend, ViewportDesc, ViewportRect};
pub use splat_store::SplatChunk;
