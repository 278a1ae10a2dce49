//! Stable chunk identity.

/// Opaque, monotonically-assigned identifier for a loaded chunk.
///
/// `ChunkId`s are never reused within a renderer's lifetime and carry no
/// meaning beyond identity (compare with [`crate::ChunkIndex`], which is an
/// ephemeral contiguous position reassigned whenever the enabled set
/// changes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(u64);

impl ChunkId {
    /// Wrap a raw id. Only the allocator (`ChunkStore`) should call this.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value, for logging and debugging only.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Ephemeral contiguous position of a chunk within the *currently enabled*
/// set. Reassigned every time the enabled set changes; sort results and
/// shader indexing use this, never `ChunkId`.
pub type ChunkIndex = u16;

/// Spherical-harmonic coefficient triplets per splat for a given SH degree
/// (0-3): degree 0 has none beyond the base color, degrees 1-3 add 3, 8, or
/// 15 extra RGB triplets respectively.
#[inline]
pub const fn sh_extra_triplet_count(degree: u8) -> usize {
    match degree {
        0 => 0,
        1 => 3,
        2 => 8,
        3 => 15,
        _ => 15,
    }
}
