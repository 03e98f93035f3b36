//! The min-heap lookahead dispatcher.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::event::{ScheduledEvent, SchedulerFn};

/// Default bounded lookahead, in seconds (`spec.md` §4.E).
pub const DEFAULT_LOOKAHEAD_SECONDS: f64 = 0.1;

/// Default host-loop interval, in seconds, for interval-driven callers.
pub const DEFAULT_INTERVAL_SECONDS: f64 = 0.025;

/// Default frame rate `scheduleAligned` snaps to when none is given.
pub const DEFAULT_FRAME_HZ: f64 = 512.0;

/// A deterministic, time-ordered event dispatcher with bounded lookahead.
///
/// Time itself is injected (`now_fn`) rather than read from a wall clock, so
/// tests can drive it with a fake clock and the playback orchestrator can
/// drive it from an audio context's `currentTime`. Driving the loop is the
/// caller's responsibility too: `tick()` does one dispatch pass and must be
/// called periodically (interval-driven) or once per frame (frame-driven) —
/// the scheduler itself never spawns a thread, matching the single-threaded
/// cooperative model.
pub struct Scheduler {
    now_fn: Box<dyn FnMut() -> f64>,
    lookahead: f64,
    running: bool,
    next_seq: u64,
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
}

impl Scheduler {
    /// Creates a scheduler driven by `now_fn`, with the default lookahead.
    pub fn new(now_fn: impl FnMut() -> f64 + 'static) -> Self {
        Self {
            now_fn: Box::new(now_fn),
            lookahead: DEFAULT_LOOKAHEAD_SECONDS,
            running: false,
            next_seq: 0,
            heap: BinaryHeap::new(),
        }
    }

    /// Overrides the default lookahead window.
    pub fn with_lookahead(mut self, lookahead_seconds: f64) -> Self {
        self.lookahead = lookahead_seconds;
        self
    }

    /// Whether `start()` has been called without a following `stop()`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// How many events are still queued.
    pub fn pending_count(&self) -> usize {
        self.heap.len()
    }

    /// Schedules `callback` to run at `abs_time` (in the same time base as
    /// `now_fn`). Insertion order is preserved as the tie-break for events
    /// sharing the same `abs_time`.
    pub fn schedule(&mut self, abs_time: f64, callback: impl FnMut() + 'static) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledEvent {
            time: abs_time,
            seq,
            callback: Box::new(callback) as SchedulerFn,
        }));
    }

    /// Schedules `callback` at `abs_time` snapped to the nearest multiple of
    /// `1 / frame_hz`.
    pub fn schedule_aligned(&mut self, abs_time: f64, frame_hz: f64, callback: impl FnMut() + 'static) {
        let frame = 1.0 / frame_hz;
        let snapped = (abs_time / frame).round() * frame;
        self.schedule(snapped, callback);
    }

    /// Marks the scheduler active. `tick()` is a no-op until this is called.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Marks the scheduler inactive and drops every pending event.
    pub fn stop(&mut self) {
        self.running = false;
        self.clear();
    }

    /// Marks the scheduler inactive without dropping pending events, so a
    /// later `start()` resumes `tick()` dispatch exactly where it left off.
    /// Distinct from [`Scheduler::stop`], which also clears the queue —
    /// callers that need a resumable pause (e.g. the playback
    /// orchestrator's `pause()`/`resume()`) use this instead.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Drops every pending event without changing `running` state.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Dequeues and invokes, in time/insertion order, every event whose time
    /// is at or before `now() + lookahead`. A no-op if not running or if
    /// nothing is due yet.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        let horizon = (self.now_fn)() + self.lookahead;
        loop {
            let due = match self.heap.peek() {
                Some(Reverse(ev)) => ev.time <= horizon,
                None => false,
            };
            if !due {
                break;
            }
            let Reverse(mut ev) = self.heap.pop().expect("peeked Some above");
            (ev.callback)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fixed_clock(t: f64) -> impl FnMut() -> f64 {
        move || t
    }

    #[test]
    fn tick_is_a_no_op_before_start() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new(fixed_clock(0.0));
        let log2 = log.clone();
        scheduler.schedule(0.0, move || log2.borrow_mut().push(1));
        scheduler.tick();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn dispatches_everything_within_the_lookahead_window() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new(fixed_clock(1.0)).with_lookahead(0.1);
        for t in [1.0, 1.05, 1.2] {
            let log2 = log.clone();
            scheduler.schedule(t, move || log2.borrow_mut().push(t.to_bits()));
        }
        scheduler.start();
        scheduler.tick();
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new(fixed_clock(0.0));
        scheduler.start();
        for i in 0..5 {
            let log2 = log.clone();
            scheduler.schedule(5.0, move || log2.borrow_mut().push(i));
        }
        scheduler.tick();
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn schedule_aligned_snaps_to_nearest_frame_boundary() {
        let mut scheduler = Scheduler::new(fixed_clock(0.0));
        scheduler.start();
        scheduler.schedule_aligned(0.0091, 512.0, || {});
        // 1/512 ~= 0.001953; 0.0091 / step ~= 4.66 -> rounds to 5 -> 0.0097656...
        let expected_step = 1.0 / 512.0;
        let expected = (0.0091_f64 / expected_step).round() * expected_step;
        // Re-derive by scheduling a marker at the expected snapped time and
        // confirming both land in the same tick at that horizon.
        let mut probe = Scheduler::new(fixed_clock(expected)).with_lookahead(0.0);
        probe.start();
        let fired = Rc::new(RefCell::new(false));
        let fired2 = fired.clone();
        probe.schedule_aligned(0.0091, 512.0, move || *fired2.borrow_mut() = true);
        probe.tick();
        assert!(*fired.borrow());
        let _ = scheduler.pending_count();
    }

    #[test]
    fn stop_clears_all_pending_events() {
        let mut scheduler = Scheduler::new(fixed_clock(0.0));
        scheduler.start();
        scheduler.schedule(1.0, || {});
        scheduler.schedule(2.0, || {});
        scheduler.stop();
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn pause_stops_dispatch_but_keeps_pending_events() {
        let mut scheduler = Scheduler::new(fixed_clock(0.0));
        scheduler.start();
        scheduler.schedule(1.0, || {});
        scheduler.pause();
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.pending_count(), 1);
        scheduler.start();
        assert!(scheduler.is_running());
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn clear_drops_events_without_stopping() {
        let mut scheduler = Scheduler::new(fixed_clock(0.0));
        scheduler.start();
        scheduler.schedule(1.0, || {});
        scheduler.clear();
        assert_eq!(scheduler.pending_count(), 0);
        assert!(scheduler.is_running());
    }
}
