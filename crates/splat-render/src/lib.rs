//! Chunk table, uniform ring, pipeline-variant selection, and the per-frame
//! draw encoder (§2 components 6-7, §4.5-4.6).
//!
//! This crate never talks to a physical GPU: the real backend (Vulkan/
//! Metal/wgpu) is an external collaborator that plugs in through
//! [`backend::GraphicsBackend`] and [`backend::CommandBuffer`] (§1). What
//! lives here is backend-agnostic bookkeeping — the chunk descriptor
//! table, the dynamic-uniform ring, pipeline-variant caching, and the
//! render-scheduler sequencing in [`frame_encoder::FrameEncoder`].

pub mod backend;
pub mod chunk_table;
pub mod frame_encoder;
pub mod index_buffer;
pub mod pipeline;
pub mod testing;
pub mod uniform;
pub mod viewport;

pub use backend::{BackendError, CommandBuffer, DrawCall, GraphicsBackend, PipelineHandle, RecordedPass};
pub use chunk_table::{ChunkTableHeader, ChunkTableRecord, ChunkTableTag};
pub use frame_encoder::{FrameEncoder, FrameEncoderConfig};
pub use pipeline::{PipelineCache, PipelineVariant};
pub use uniform::{UniformRing, Uniforms};
pub use viewport::{ViewportDesc, ViewportRect};
