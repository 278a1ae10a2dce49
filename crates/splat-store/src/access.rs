//! Mutual exclusion between chunk mutators and frame encoders (§4.3).
//!
//! A single shared lock protects the access state machine. Exclusive-access
//! acquisition (chunk mutation) is a true FIFO suspension via a condvar;
//! render-slot acquisition is the sleep-poll the spec calls for in §5,
//! bounded by `access_timeout`.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

struct State {
    /// Ticket handed to the next exclusive-access waiter.
    next_ticket: u64,
    /// Ticket currently eligible to acquire (or holding) exclusive access.
    now_serving: u64,
    /// Whether `now_serving`'s ticket currently holds exclusive access.
    holder_active: bool,
    /// Count of GPU frames whose completion handler has not yet run.
    in_flight_render_count: usize,
    /// Whether a frame's CPU-side encoding routine is currently running.
    is_rendering: bool,
}

/// Coordinates exclusive chunk-mutation windows against render-slot
/// acquisition, per the state machine in §4.3.
pub struct AccessScheduler {
    state: Mutex<State>,
    condvar: Condvar,
    max_simultaneous_renders: usize,
}

/// RAII guard for a held exclusive-access window. Dropping it releases
/// access and, per §4.3, either transfers ownership directly to the next
/// waiter or clears `has_exclusive_access`.
pub struct ExclusiveGuard<'a> {
    scheduler: &'a AccessScheduler,
    ticket: u64,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.release_exclusive(self.ticket);
    }
}

impl AccessScheduler {
    /// Create a scheduler bounding in-flight GPU frames at
    /// `max_simultaneous_renders`.
    pub fn new(max_simultaneous_renders: usize) -> Self {
        Self {
            state: Mutex::new(State {
                next_ticket: 0,
                now_serving: 0,
                holder_active: false,
                in_flight_render_count: 0,
                is_rendering: false,
            }),
            condvar: Condvar::new(),
            max_simultaneous_renders: max_simultaneous_renders.max(1),
        }
    }

    /// Suspend until exclusive access is granted (cooperative FIFO
    /// suspension per §5 — no timeout; chunk mutation is expected to be
    /// rare and bounded by the caller's own patience).
    pub fn acquire_exclusive(&self) -> ExclusiveGuard<'_> {
        let mut state = self.state.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        // A hand-off (see `release_exclusive`) advances `now_serving` to this
        // ticket while leaving `holder_active` set, which *is* the grant —
        // checking `!holder_active` here as well would wait on a flag that
        // a hand-off never clears, deadlocking forever.
        while !(ticket == state.now_serving && state.in_flight_render_count == 0) {
            self.condvar.wait(&mut state);
        }
        state.holder_active = true;
        trace!(ticket, "exclusive access granted");
        ExclusiveGuard {
            scheduler: self,
            ticket,
        }
    }

    fn release_exclusive(&self, ticket: u64) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.now_serving, ticket);
        debug_assert!(state.holder_active);

        let waiter_pending = state.next_ticket > state.now_serving + 1;
        if state.in_flight_render_count == 0 && waiter_pending {
            // Direct hand-off: holder_active stays true for the next ticket.
            state.now_serving += 1;
        } else {
            state.holder_active = false;
            state.now_serving += 1;
        }
        drop(state);
        self.condvar.notify_all();
    }

    /// Try to begin CPU-side render encoding, sleep-polling up to
    /// `access_timeout`. Returns `false` ("frame dropped") on expiry —
    /// never presents a partial frame.
    pub fn begin_render(&self, access_timeout: Duration) -> bool {
        let deadline = Instant::now() + access_timeout;
        loop {
            {
                let mut state = self.state.lock();
                if !state.holder_active
                    && !state.is_rendering
                    && state.in_flight_render_count < self.max_simultaneous_renders
                {
                    state.is_rendering = true;
                    state.in_flight_render_count += 1;
                    return true;
                }
            }
            if Instant::now() >= deadline {
                warn!(?access_timeout, "render slot acquisition timed out, dropping frame");
                return false;
            }
            std::thread::sleep(Duration::from_micros(200));
        }
    }

    /// Mark CPU-side encoding as finished. Does not affect
    /// `in_flight_render_count`, which tracks GPU-side liveness.
    pub fn end_render_encoding(&self) {
        let mut state = self.state.lock();
        state.is_rendering = false;
        drop(state);
        self.condvar.notify_all();
    }

    /// Called from the command-buffer's GPU-completion callback: decrements
    /// the in-flight count and may wake one exclusive waiter.
    pub fn on_render_complete(&self) {
        let mut state = self.state.lock();
        // §7: fatal in debug builds, log-and-continue in release.
        debug_assert!(state.in_flight_render_count > 0, "in-flight refcount underflow");
        if state.in_flight_render_count == 0 {
            warn!("in-flight render refcount underflow");
        }
        state.in_flight_render_count = state.in_flight_render_count.saturating_sub(1);
        drop(state);
        self.condvar.notify_all();
    }

    /// Current in-flight GPU frame count, for diagnostics/tests.
    pub fn in_flight_render_count(&self) -> usize {
        self.state.lock().in_flight_render_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn exclusive_access_is_exclusive() {
        let scheduler = Arc::new(AccessScheduler::new(1));
        let guard = scheduler.acquire_exclusive();

        let scheduler2 = Arc::clone(&scheduler);
        let handle = thread::spawn(move || {
            let _guard = scheduler2.acquire_exclusive();
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());
        drop(guard);
        handle.join().unwrap();
    }

    #[test]
    fn render_acquisition_respects_max_simultaneous() {
        let scheduler = AccessScheduler::new(1);
        assert!(scheduler.begin_render(Duration::from_millis(50)));
        assert!(!scheduler.begin_render(Duration::from_millis(10)));
    }

    #[test]
    fn render_acquisition_fails_while_exclusive_held() {
        let scheduler = AccessScheduler::new(4);
        let _guard = scheduler.acquire_exclusive();
        assert!(!scheduler.begin_render(Duration::from_millis(10)));
    }

    #[test]
    fn zero_timeout_drops_immediately_on_contention() {
        let scheduler = AccessScheduler::new(1);
        assert!(scheduler.begin_render(Duration::ZERO));
        assert!(!scheduler.begin_render(Duration::ZERO));
    }

    #[test]
    fn render_completion_frees_a_slot() {
        let scheduler = AccessScheduler::new(1);
        assert!(scheduler.begin_render(Duration::from_millis(10)));
        scheduler.end_render_encoding();
        assert!(!scheduler.begin_render(Duration::from_millis(10)));
        scheduler.on_render_complete();
        assert!(scheduler.begin_render(Duration::from_millis(10)));
    }
}
