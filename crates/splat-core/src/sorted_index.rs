//! The 8-byte sorted index record produced by the async sorter (§3, §6).

use bytemuck::{Pod, Zeroable};

use crate::chunk_id::ChunkIndex;

/// One entry of a sorted index buffer: which chunk, and which splat within
/// it, in back-to-front draw order.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ChunkedSplatIndex {
    pub chunk_index: ChunkIndex,
    pub _padding: u16,
    pub splat_index: u32,
}

const _: () = assert!(std::mem::size_of::<ChunkedSplatIndex>() == 8);

impl ChunkedSplatIndex {
    #[inline]
    pub fn new(chunk_index: ChunkIndex, splat_index: u32) -> Self {
        Self {
            chunk_index,
            _padding: 0,
            splat_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_8_bytes() {
        assert_eq!(std::mem::size_of::<ChunkedSplatIndex>(), 8);
    }
}
