//! Thread-safe, tag-keyed free list for transient scratch buffers (§4.2).
//!
//! Used by the render scheduler for the per-frame chunk-table scratch
//! buffer: acquired before encoding, released in the command-buffer
//! completion handler.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

/// A raw, untyped scratch buffer recycled by [`BufferPool`].
pub type ScratchBuffer = Vec<u8>;

/// Thread-safe free-list keyed by a caller-defined tag.
pub struct BufferPool<Tag: Eq + Hash + Clone> {
    free: Mutex<HashMap<Tag, Vec<ScratchBuffer>>>,
}

impl<Tag: Eq + Hash + Clone> Default for BufferPool<Tag> {
    fn default() -> Self {
        Self {
            free: Mutex::new(HashMap::new()),
        }
    }
}

impl<Tag: Eq + Hash + Clone> BufferPool<Tag> {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a pooled buffer for `tag`, if one is free. The caller must
    /// check the returned buffer's length, since pooled buffers are not
    /// guaranteed to be the right size for the new use.
    pub fn acquire(&self, tag: &Tag) -> Option<ScratchBuffer> {
        self.free.lock().get_mut(tag).and_then(Vec::pop)
    }

    /// Return a buffer to the pool under `tag` for future reuse.
    pub fn release(&self, buffer: ScratchBuffer, tag: Tag) {
        self.free.lock().entry(tag).or_default().push(buffer);
    }

    /// Drop every pooled buffer under `tag`.
    pub fn clear(&self, tag: &Tag) {
        self.free.lock().remove(tag);
    }

    /// Drop every pooled buffer under every tag.
    pub fn clear_all(&self) {
        self.free.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Eq, Hash)]
    enum Tag {
        ChunkTable,
    }

    #[test]
    fn acquire_on_empty_pool_returns_none() {
        let pool: BufferPool<Tag> = BufferPool::new();
        assert!(pool.acquire(&Tag::ChunkTable).is_none());
    }

    #[test]
    fn release_then_acquire_round_trips() {
        let pool: BufferPool<Tag> = BufferPool::new();
        pool.release(vec![1, 2, 3], Tag::ChunkTable);
        let buf = pool.acquire(&Tag::ChunkTable).unwrap();
        assert_eq!(buf, vec![1, 2, 3]);
        assert!(pool.acquire(&Tag::ChunkTable).is_none());
    }

    #[test]
    fn clear_removes_pooled_buffers() {
        let pool: BufferPool<Tag> = BufferPool::new();
        pool.release(vec![0; 16], Tag::ChunkTable);
        pool.clear(&Tag::ChunkTable);
        assert!(pool.acquire(&Tag::ChunkTable).is_none());
    }
}
