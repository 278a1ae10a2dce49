//! Chunk map, id allocation, and enabled-set publishing (§4.3).

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use splat_core::{ChunkId, ChunkIndex, MAX_ENABLED_CHUNKS};
use tracing::{debug, warn};

use crate::access::AccessScheduler;
use crate::chunk::SplatChunk;
use crate::locality;

/// A chunk's `ChunkIndex` plus a shared handle to its splat data, as
/// published to the sorter whenever the enabled set changes.
#[derive(Clone)]
pub struct ChunkReference {
    pub chunk_index: ChunkIndex,
    pub chunk: Arc<SplatChunk>,
}

/// Receives a freshly-published enabled-chunk list. Implemented by the
/// sorter; kept as a trait here so the store has no compile-time dependency
/// on the sorter's crate.
pub trait EnabledSetPublisher: Send + Sync {
    fn publish(&self, refs: Vec<ChunkReference>);
}

struct ChunkEntry {
    chunk: Arc<SplatChunk>,
    enabled: bool,
}

struct Inner {
    entries: HashMap<ChunkId, ChunkEntry>,
    /// Insertion order, doubling as the chunk-iteration order used to
    /// tie-break the sorter's stable sort (§9).
    order: Vec<ChunkId>,
    next_id: u64,
}

/// Owns every loaded chunk, assigns stable ids, and republishes the
/// contiguous enabled-chunk index space whenever the set changes.
pub struct ChunkStore {
    inner: Mutex<Inner>,
    access: AccessScheduler,
    publisher: Arc<dyn EnabledSetPublisher>,
}

impl ChunkStore {
    pub fn new(max_simultaneous_renders: usize, publisher: Arc<dyn EnabledSetPublisher>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
                next_id: 0,
            }),
            access: AccessScheduler::new(max_simultaneous_renders),
            publisher,
        }
    }

    /// The access scheduler shared with the frame encoder.
    pub fn access(&self) -> &AccessScheduler {
        &self.access
    }

    /// Optionally locality-presort `chunk`, assign it an id, store it
    /// enabled, and republish the enabled set. Returns the new id.
    pub fn add_chunk(&self, mut chunk: SplatChunk, sort_locality: bool) -> ChunkId {
        if sort_locality {
            locality::apply(&mut chunk);
        }

        let _guard = self.access.acquire_exclusive();
        let mut inner = self.inner.lock();
        let id = ChunkId::from_raw(inner.next_id);
        inner.next_id += 1;
        inner.entries.insert(
            id,
            ChunkEntry {
                chunk: Arc::new(chunk),
                enabled: true,
            },
        );
        inner.order.push(id);
        debug!(id = id.raw(), "chunk added");
        self.republish_locked(&inner);
        id
    }

    /// Remove a chunk, no-op if `id` is absent.
    pub fn remove_chunk(&self, id: ChunkId) {
        let _guard = self.access.acquire_exclusive();
        let mut inner = self.inner.lock();
        if inner.entries.remove(&id).is_some() {
            inner.order.retain(|&other| other != id);
            self.republish_locked(&inner);
        }
    }

    /// Clear every chunk and republish an empty enabled set.
    pub fn remove_all(&self) {
        let _guard = self.access.acquire_exclusive();
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        self.republish_locked(&inner);
    }

    /// Toggle a chunk's enabled flag and republish.
    pub fn set_enabled(&self, id: ChunkId, on: bool) {
        let _guard = self.access.acquire_exclusive();
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get_mut(&id) {
            if entry.enabled == on {
                return;
            }
            entry.enabled = on;
            self.republish_locked(&inner);
        }
    }

    /// Read-only snapshot; no synchronization guarantee against a
    /// concurrent mutation (§4.3).
    pub fn is_enabled(&self, id: ChunkId) -> bool {
        self.inner
            .lock()
            .entries
            .get(&id)
            .map(|e| e.enabled)
            .unwrap_or(false)
    }

    /// Sum of splat counts over every currently enabled chunk.
    pub fn splat_count(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|e| e.enabled)
            .map(|e| e.chunk.splat_count())
            .sum()
    }

    /// A read-only snapshot of the currently enabled chunks and their
    /// published `ChunkIndex`, for building the per-frame GPU chunk table
    /// (§4.5 step 3). Carries the same "no synchronization guarantee
    /// against concurrent mutation" caveat as [`Self::is_enabled`].
    pub fn enabled_references(&self) -> Vec<ChunkReference> {
        Self::collect_enabled(&self.inner.lock())
    }

    fn republish_locked(&self, inner: &Inner) {
        let refs = Self::collect_enabled(inner);
        self.publisher.publish(refs);
    }

    fn collect_enabled(inner: &Inner) -> Vec<ChunkReference> {
        let mut refs = Vec::new();
        let mut truncated = false;
        for id in &inner.order {
            let Some(entry) = inner.entries.get(id) else {
                continue;
            };
            if !entry.enabled {
                continue;
            }
            if refs.len() >= MAX_ENABLED_CHUNKS {
                truncated = true;
                continue;
            }
            refs.push(ChunkReference {
                chunk_index: refs.len() as ChunkIndex,
                chunk: Arc::clone(&entry.chunk),
            });
        }
        if truncated {
            warn!("enabled-chunk count exceeds {MAX_ENABLED_CHUNKS}; excess chunks remain stored but disabled from rendering");
        }
        refs
    }
}
