//! The per-frame GPU-side chunk descriptor table (§3 `ChunkTable`, §4.5
//! step 8, §6).
//!
//! A 16-byte header followed by one 16-byte record per enabled chunk,
//! giving the (external) fragment shader the device address and splat
//! count of every chunk it needs to index into.

use bytemuck::{Pod, Zeroable};
use splat_store::ChunkReference;

/// Tag used to key the frame encoder's [`splat_gpu::BufferPool`] for the
/// chunk-table scratch allocation (§4.2, §3 "Per-frame chunk-table scratch
/// buffers come from a pool").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkTableTag {
    Scratch,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ChunkTableHeader {
    pub chunks_gpu_ptr: u64,
    pub enabled_chunk_count: u16,
    pub _pad16: u16,
    pub _pad32: u32,
}

const _: () = assert!(std::mem::size_of::<ChunkTableHeader>() == 16);

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ChunkTableRecord {
    pub splats_gpu_ptr: u64,
    pub splat_count: u32,
    pub _pad: u32,
}

const _: () = assert!(std::mem::size_of::<ChunkTableRecord>() == 16);

/// Byte length of a chunk table for `enabled_count` chunks.
pub fn byte_len(enabled_count: usize) -> usize {
    std::mem::size_of::<ChunkTableHeader>() + enabled_count * std::mem::size_of::<ChunkTableRecord>()
}

/// Build the chunk table bytes for the given enabled-chunk snapshot,
/// reusing `scratch` if it is already the right length (it is cleared and
/// resized to fit otherwise).
///
/// `chunks` must already be ordered by `chunk_index` (the order
/// [`splat_store::ChunkStore::enabled_references`] publishes).
pub fn build_into(chunks: &[ChunkReference], scratch: &mut Vec<u8>) {
    let len = byte_len(chunks.len());
    scratch.clear();
    scratch.resize(len, 0);

    let header = ChunkTableHeader {
        // The table's own device address is assigned by the caller once it
        // uploads `scratch`; this crate has no physical GPU to ask (§1).
        chunks_gpu_ptr: 0,
        enabled_chunk_count: chunks.len() as u16,
        _pad16: 0,
        _pad32: 0,
    };
    scratch[..16].copy_from_slice(bytemuck::bytes_of(&header));

    for (i, chunk_ref) in chunks.iter().enumerate() {
        let record = ChunkTableRecord {
            splats_gpu_ptr: chunk_ref.chunk.encoded().device_address(),
            splat_count: chunk_ref.chunk.splat_count() as u32,
            _pad: 0,
        };
        let start = 16 + i * 16;
        scratch[start..start + 16].copy_from_slice(bytemuck::bytes_of(&record));
    }
}

/// Read back a table's header, for tests.
pub fn read_header(bytes: &[u8]) -> ChunkTableHeader {
    bytemuck::pod_read_unaligned(&bytes[..16])
}

/// Read back record `i`, for tests.
pub fn read_record(bytes: &[u8], i: usize) -> ChunkTableRecord {
    let start = 16 + i * 16;
    bytemuck::pod_read_unaligned(&bytes[start..start + 16])
}
