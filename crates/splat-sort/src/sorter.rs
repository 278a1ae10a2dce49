//! The asynchronous, triple-buffered depth sorter (§2 component 5, §4.4).
//!
//! A dedicated OS thread repeatedly computes per-splat depth across every
//! enabled chunk, stable-sorts back-to-front, and publishes the result into
//! whichever of the `N` ref-counted index buffers is currently unreferenced.
//! Frames never block on this: they either get the most recently published
//! buffer or drop the frame (§5).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use splat_core::{CameraPose, ChunkedSplatIndex, SORT_BUFFER_COUNT};
use splat_gpu::{GpuBuffer, GpuDevice};
use splat_store::{ChunkReference, EnabledSetPublisher};
use tracing::{debug, trace, warn};

/// Sleep step used by every sleep-poll loop in this module (sort-start
/// polling, invalidation's refcount wait). Short enough that degraded
/// sorting throughput does not visibly stall frame delivery.
const POLL_INTERVAL: Duration = Duration::from_micros(200);

/// A handle to a live borrow of one published sort-index buffer. Obtained
/// from [`AsyncSorter::try_obtain_sorted_indices`] and must be returned via
/// [`AsyncSorter::release_sorted_indices`].
#[derive(Debug)]
pub struct SortedIndices {
    slot: usize,
    count: usize,
}

impl SortedIndices {
    /// Number of `(chunk_index, splat_index)` entries in this buffer.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}

struct Slot {
    buffer: Mutex<GpuBuffer<ChunkedSplatIndex>>,
    valid: AtomicBool,
    refcount: AtomicUsize,
}

impl Slot {
    fn new(device: Arc<dyn GpuDevice>) -> Self {
        Self {
            buffer: Mutex::new(GpuBuffer::new(device, 0).expect("zero-capacity allocation cannot fail")),
            valid: AtomicBool::new(false),
            refcount: AtomicUsize::new(0),
        }
    }
}

struct State {
    sorting_buffer_index: Option<usize>,
    most_recent_valid_index: Option<usize>,
    has_exclusive_access: bool,
    pending_invalidation: bool,
    camera_pose: Option<CameraPose>,
    needs_sort: bool,
    chunks: Vec<ChunkReference>,
    is_reading_chunks: bool,
    sort_loop_running: bool,
}

/// Produces a globally-sorted draw order across all enabled chunks for the
/// most recent camera pose, without ever blocking a render on the sort.
pub struct AsyncSorter {
    state: Mutex<State>,
    condvar: Condvar,
    slots: Vec<Slot>,
    sort_by_distance: AtomicBool,
}

impl AsyncSorter {
    /// Construct a sorter with [`SORT_BUFFER_COUNT`] index buffers, all
    /// allocated up front (§3: "SortIndexBuffers are allocated once at
    /// renderer construction and resized on demand").
    pub fn new(device: Arc<dyn GpuDevice>, sort_by_distance: bool) -> Arc<Self> {
        let slots = (0..SORT_BUFFER_COUNT).map(|_| Slot::new(device.clone())).collect();
        Arc::new(Self {
            state: Mutex::new(State {
                sorting_buffer_index: None,
                most_recent_valid_index: None,
                has_exclusive_access: false,
                pending_invalidation: false,
                camera_pose: None,
                needs_sort: false,
                chunks: Vec::new(),
                is_reading_chunks: false,
                sort_loop_running: false,
            }),
            condvar: Condvar::new(),
            slots,
            sort_by_distance: AtomicBool::new(sort_by_distance),
        })
    }

    /// Depth metric used by the sort (§6 `sort_by_distance`).
    pub fn set_sort_by_distance(&self, on: bool) {
        self.sort_by_distance.store(on, Ordering::Relaxed);
    }

    /// Replace the chunk list and request a re-sort. Per §9 open question
    /// (a), this must only be called while sorter-level exclusive access is
    /// held (i.e. from inside [`Self::with_exclusive_access`]) so the
    /// `ChunkIndex` mapping inside any in-flight sort cannot be superseded
    /// out from under it; see [`EnabledSetPublisher`] below.
    pub fn set_chunks(&self, chunks: Vec<ChunkReference>) {
        let mut state = self.state.lock();
        debug_assert!(state.has_exclusive_access, "set_chunks called without sorter exclusive access");
        state.chunks = chunks;
        state.needs_sort = true;
    }

    /// Store a new camera pose and ensure the sort loop is running.
    pub fn update_camera(self: &Arc<Self>, pose: CameraPose) {
        {
            let mut state = self.state.lock();
            state.camera_pose = Some(pose);
            state.needs_sort = true;
        }
        self.condvar.notify_all();
        self.ensure_sort_loop_running();
    }

    /// Non-blocking, O(1) attempt to borrow the most recently published
    /// valid buffer. `None` if exclusive access is held or no buffer is
    /// valid yet.
    pub fn try_obtain_sorted_indices(&self) -> Option<SortedIndices> {
        let state = self.state.lock();
        if state.has_exclusive_access {
            return None;
        }
        let preferred = state.most_recent_valid_index;
        drop(state);

        let candidates = preferred
            .into_iter()
            .chain((0..self.slots.len()).filter(|i| Some(*i) != preferred));
        for idx in candidates {
            if self.slots[idx].valid.load(Ordering::Acquire) {
                self.slots[idx].refcount.fetch_add(1, Ordering::AcqRel);
                let count = self.slots[idx].buffer.lock().count();
                return Some(SortedIndices { slot: idx, count });
            }
        }
        None
    }

    /// Sleep-poll [`Self::try_obtain_sorted_indices`] until it succeeds or
    /// `running` is cleared (the caller's cancellation signal, §5).
    pub fn obtain_sorted_indices(&self, running: &AtomicBool) -> Option<SortedIndices> {
        loop {
            if let Some(handle) = self.try_obtain_sorted_indices() {
                return Some(handle);
            }
            if !running.load(Ordering::Relaxed) {
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Release a previously obtained buffer.
    pub fn release_sorted_indices(&self, handle: SortedIndices) {
        let previous = self.slots[handle.slot].refcount.fetch_sub(1, Ordering::AcqRel);
        // §7: fatal in debug builds, log-and-continue in release.
        debug_assert!(previous > 0, "sort index buffer refcount underflow");
        if previous == 0 {
            self.slots[handle.slot].refcount.fetch_add(1, Ordering::AcqRel);
            warn!(slot = handle.slot, "sort index buffer refcount underflow");
        }
    }

    /// Read the contents of a held buffer. Callers must already hold a
    /// [`SortedIndices`] handle (which keeps the refcount positive, so the
    /// sort loop will not select this slot as its write target).
    pub fn with_indices<R>(&self, handle: &SortedIndices, f: impl FnOnce(&[ChunkedSplatIndex]) -> R) -> R {
        let guard = self.slots[handle.slot].buffer.lock();
        f(guard.as_slice())
    }

    /// Coordinated chunk-mutation window (§4.4 "Exclusive-access
    /// sequence"). Suspends until the sort loop is not mid-read, runs
    /// `body`, then (if `invalidate`) has already waited for every buffer
    /// to be unreferenced and cleared their `valid` flags before `body`
    /// begins, so a concurrently-running prior sort's publication is
    /// guaranteed not to be observed as valid until a fresh sort completes.
    pub fn with_exclusive_access<R>(self: &Arc<Self>, invalidate: bool, body: impl FnOnce() -> R) -> R {
        {
            let mut state = self.state.lock();
            while state.is_reading_chunks {
                self.condvar.wait(&mut state);
            }
            state.has_exclusive_access = true;
            if invalidate {
                state.pending_invalidation = true;
            }
        }

        if invalidate {
            while self.slots.iter().any(|s| s.refcount.load(Ordering::Acquire) > 0) {
                thread::sleep(POLL_INTERVAL);
            }
            for slot in &self.slots {
                slot.valid.store(false, Ordering::Release);
            }
            let mut state = self.state.lock();
            state.most_recent_valid_index = None;
        }

        let result = body();

        {
            let mut state = self.state.lock();
            state.has_exclusive_access = false;
            state.pending_invalidation = false;
            if !state.chunks.is_empty() {
                state.needs_sort = true;
            }
        }
        self.condvar.notify_all();
        self.ensure_sort_loop_running();
        result
    }

    /// Synchronously invalidate every buffer without waiting for
    /// unreferencing, for the case where a chunk's *contents* (not the
    /// enabled set) were reordered in place (§4.4).
    pub fn invalidate_all(&self) {
        for slot in &self.slots {
            slot.valid.store(false, Ordering::Release);
        }
        let mut state = self.state.lock();
        state.most_recent_valid_index = None;
        state.needs_sort = true;
    }

    fn ensure_sort_loop_running(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.sort_loop_running {
            return;
        }
        state.sort_loop_running = true;
        drop(state);

        let sorter = Arc::clone(self);
        thread::Builder::new()
            .name("splat-sort".into())
            .spawn(move || sorter.sort_loop())
            .expect("failed to spawn splat-sort thread");
    }

    fn sort_loop(self: Arc<Self>) {
        debug!("sort loop started");
        loop {
            let (target, chunks, pose) = {
                let mut state = self.state.lock();
                loop {
                    if !state.has_exclusive_access
                        && state.needs_sort
                        && !state.chunks.is_empty()
                        && state.camera_pose.is_some()
                    {
                        if let Some(idx) = (0..self.slots.len()).find(|&i| self.slots[i].refcount.load(Ordering::Acquire) == 0)
                        {
                            state.sorting_buffer_index = Some(idx);
                            state.is_reading_chunks = true;
                            state.needs_sort = false;
                            break (idx, state.chunks.clone(), state.camera_pose.unwrap());
                        }
                        // Every buffer referenced: degrade gracefully, retry later.
                        drop(state);
                        thread::sleep(POLL_INTERVAL);
                        state = self.state.lock();
                        continue;
                    }
                    if !state.needs_sort && state.chunks.is_empty() {
                        state.sort_loop_running = false;
                        trace!("sort loop exiting: no chunks and nothing pending");
                        return;
                    }
                    drop(state);
                    thread::sleep(POLL_INTERVAL);
                    state = self.state.lock();
                }
            };

            let sort_by_distance = self.sort_by_distance.load(Ordering::Relaxed);
            // Depth is independent per splat, so each chunk's pass is computed
            // on the global rayon pool; `par_iter` over `chunks` (itself kept
            // in chunk-iteration order) and a plain `collect` preserves that
            // order in `scratch`, which is what fixes the sort's tie-break
            // (§9 open question b) even though the work ran out of order.
            let scratch: Vec<(ChunkedSplatIndex, f32)> = chunks
                .par_iter()
                .flat_map_iter(|chunk_ref| {
                    chunk_ref
                        .chunk
                        .encoded()
                        .as_slice()
                        .iter()
                        .enumerate()
                        .map(move |(splat_index, splat)| {
                            let position = splat.decoded_position();
                            let depth = if sort_by_distance {
                                position.distance_squared(pose.position)
                            } else {
                                (position - pose.position).dot(pose.forward)
                            };
                            (ChunkedSplatIndex::new(chunk_ref.chunk_index, splat_index as u32), depth)
                        })
                })
                .collect();

            {
                let mut state = self.state.lock();
                state.is_reading_chunks = false;
            }
            self.condvar.notify_all();

            // Back-to-front: non-increasing depth. Stable sort preserves
            // chunk-iteration order as the tie-break (§9 open question b).
            scratch.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            let indices: Vec<ChunkedSplatIndex> = scratch.into_iter().map(|(idx, _)| idx).collect();

            let write_result = {
                let mut buffer = self.slots[target].buffer.lock();
                buffer.clear();
                buffer.ensure_capacity(indices.len()).and_then(|()| buffer.append_slice(&indices))
            };

            let mut state = self.state.lock();
            state.sorting_buffer_index = None;
            match write_result {
                Ok(()) => {
                    if state.pending_invalidation {
                        trace!(target, "sort completed but invalidation requested mid-flight; discarding");
                    } else {
                        self.slots[target].valid.store(true, Ordering::Release);
                        state.most_recent_valid_index = Some(target);
                    }
                }
                Err(err) => {
                    warn!(target, %err, "sort index buffer allocation failed; leaving target invalid");
                }
            }
        }
    }
}

impl EnabledSetPublisher for Arc<AsyncSorter> {
    /// Publishing a new enabled-chunk set always goes through
    /// `with_exclusive_access(invalidate = true, ...)`, per §9 open
    /// question (a): the `ChunkIndex` mapping inside any sort in flight
    /// when the set changes would otherwise be silently superseded.
    fn publish(&self, refs: Vec<ChunkReference>) {
        self.with_exclusive_access(true, || self.set_chunks(refs));
    }
}
