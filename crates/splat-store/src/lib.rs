//! The set of currently-loaded splat chunks: storage, id allocation, the
//! mutation/render access scheduler, and the Morton locality presort
//! applied to a chunk before it joins the store (§2 component 4, §4.3,
//! §4.7).

pub mod access;
pub mod chunk;
pub mod error;
pub mod locality;
pub mod store;

pub use access::{AccessScheduler, ExclusiveGuard};
pub use chunk::SplatChunk;
pub use error::{Result, StoreError};
pub use store::{ChunkReference, ChunkStore, EnabledSetPublisher};
