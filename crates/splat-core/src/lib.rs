//! Core data model and math for the chunked Gaussian splat renderer.
//!
//! This crate owns the pieces that have no GPU or threading concerns:
//! the scene-point/encoded-splat data model, covariance and color math,
//! chunk identity, and camera pose. Everything here is plain, synchronous,
//! and `#[cfg(test)]`-friendly.

pub mod camera;
pub mod chunk_id;
pub mod encoded;
pub mod math;
pub mod point;
pub mod sorted_index;

pub use camera::CameraPose;
pub use chunk_id::{sh_extra_triplet_count, ChunkId, ChunkIndex};
pub use encoded::EncodedSplat;
pub use point::{Color, Opacity, ScenePoint, Scale};
pub use sorted_index::ChunkedSplatIndex;

/// The spec's triple-buffering constant for sort index buffers (§3, §4.4).
pub const SORT_BUFFER_COUNT: usize = 3;

/// Indexing/instancing crossover used by the frame encoder (§4.5 step 6, §6).
pub const MAX_INDEXED_SPLAT_COUNT: u32 = 1024;

/// Hard ceiling on the enabled-chunk count (§3 invariants): `ChunkIndex` is
/// a `u16`.
pub const MAX_ENABLED_CHUNKS: usize = 65535;
