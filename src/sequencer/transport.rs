// Transport - Clock abstraction driving scheduled playback callbacks
// The scheduler and the playhead receive the clock as an explicit dependency,
// so tests drive playback with a deterministic `ManualClock`.

use log::warn;
use std::time::Instant;

/// Transport state (play/stop/pause)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    /// Check if transport is stopped or paused
    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped | TransportState::Paused)
    }
}

/// Callback fired by the clock; receives the timestamp it was registered for
pub type ClockCallback = Box<dyn FnOnce(f64) + Send>;

/// Transport clock capability consumed by the scheduler.
///
/// Callbacks fire on the clock's own timeline, in timestamp order, and
/// callbacks registered for the same timestamp fire in registration order.
pub trait TransportClock {
    fn start(&mut self);

    /// Halt the clock, keeping its current position
    fn stop(&mut self);

    /// Register a callback to fire when the clock reaches `seconds`
    fn schedule_at(&mut self, seconds: f64, callback: ClockCallback);

    /// Drop every pending callback without firing it
    fn cancel_all(&mut self);

    fn elapsed_seconds(&self) -> f64;

    /// Update the clock's musical rate
    fn set_rate(&mut self, bpm: f64);

    fn rate_bpm(&self) -> f64;

    /// Move the clock to `seconds` without firing anything
    fn seek(&mut self, seconds: f64);

    fn is_running(&self) -> bool;

    /// Number of callbacks still waiting to fire
    fn pending(&self) -> usize;

    /// Fire callbacks that came due on a wall clock; returns how many fired.
    /// Clocks advanced explicitly fire during the advance and do nothing here.
    fn poll(&mut self) -> usize {
        0
    }

    /// Fire callbacks due at or before `seconds` that the clock has not fired
    /// yet, running or not. Used before cancelling so nothing due is lost.
    fn fire_due(&mut self, _seconds: f64) -> usize {
        0
    }
}

struct PendingCallback {
    at: f64,
    callback: ClockCallback,
}

/// Time-ordered callback storage shared by the clock implementations
#[derive(Default)]
pub struct CallbackQueue {
    pending: Vec<PendingCallback>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping the queue sorted; equal timestamps keep insertion order
    pub fn insert(&mut self, at: f64, callback: ClockCallback) {
        if !at.is_finite() {
            warn!("Dropping callback with non-finite timestamp {at}");
            return;
        }
        let index = self.pending.partition_point(|p| p.at <= at);
        self.pending.insert(index, PendingCallback { at, callback });
    }

    /// Remove and return every callback due at or before `until`
    fn take_due(&mut self, until: f64) -> Vec<PendingCallback> {
        let index = self.pending.partition_point(|p| p.at <= until);
        self.pending.drain(..index).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Timestamp of the next callback to fire
    pub fn next_due(&self) -> Option<f64> {
        self.pending.first().map(|p| p.at)
    }
}

/// Deterministic clock advanced explicitly by the caller.
///
/// Used by tests and by offline drivers. Time only moves through `advance`
/// (while running) and `seek`.
pub struct ManualClock {
    running: bool,
    elapsed: f64,
    rate_bpm: f64,
    queue: CallbackQueue,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            running: false,
            elapsed: 0.0,
            rate_bpm: crate::sequencer::timeline::DEFAULT_BPM,
            queue: CallbackQueue::new(),
        }
    }

    /// Move time forward by `delta_seconds`, firing every callback that comes due.
    /// Returns the number of callbacks fired. Does nothing while stopped.
    pub fn advance(&mut self, delta_seconds: f64) -> usize {
        if !self.running {
            return 0;
        }
        let target = self.elapsed + delta_seconds.max(0.0);
        let due = self.queue.take_due(target);
        let fired = due.len();
        for pending in due {
            self.elapsed = self.elapsed.max(pending.at);
            (pending.callback)(pending.at);
        }
        self.elapsed = target;
        fired
    }

    /// Advance until the absolute time `seconds`
    pub fn advance_to(&mut self, seconds: f64) -> usize {
        self.advance(seconds - self.elapsed)
    }

    pub fn next_due(&self) -> Option<f64> {
        self.queue.next_due()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock for ManualClock {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn schedule_at(&mut self, seconds: f64, callback: ClockCallback) {
        self.queue.insert(seconds, callback);
    }

    fn cancel_all(&mut self) {
        self.queue.clear();
    }

    fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    fn set_rate(&mut self, bpm: f64) {
        self.rate_bpm = bpm;
    }

    fn rate_bpm(&self) -> f64 {
        self.rate_bpm
    }

    fn seek(&mut self, seconds: f64) {
        self.elapsed = seconds.max(0.0);
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Wall-clock transport.
///
/// Cooperative: the host calls `poll()` from its frame loop and due callbacks
/// fire on that thread.
pub struct SystemClock {
    started_at: Option<Instant>,
    offset: f64,
    rate_bpm: f64,
    queue: CallbackQueue,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started_at: None,
            offset: 0.0,
            rate_bpm: crate::sequencer::timeline::DEFAULT_BPM,
            queue: CallbackQueue::new(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock for SystemClock {
    fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.offset = self.elapsed_seconds();
        self.started_at = None;
    }

    fn schedule_at(&mut self, seconds: f64, callback: ClockCallback) {
        self.queue.insert(seconds, callback);
    }

    fn cancel_all(&mut self) {
        self.queue.clear();
    }

    fn elapsed_seconds(&self) -> f64 {
        self.offset
            + self
                .started_at
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0)
    }

    fn set_rate(&mut self, bpm: f64) {
        self.rate_bpm = bpm;
    }

    fn rate_bpm(&self) -> f64 {
        self.rate_bpm
    }

    fn seek(&mut self, seconds: f64) {
        self.offset = seconds.max(0.0);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Fire every callback due at the current wall-clock position
    fn poll(&mut self) -> usize {
        if self.started_at.is_none() {
            return 0;
        }
        let now = self.elapsed_seconds();
        self.fire_due(now)
    }

    fn fire_due(&mut self, seconds: f64) -> usize {
        let due = self.queue.take_due(seconds.min(self.elapsed_seconds()));
        let fired = due.len();
        for pending in due {
            (pending.callback)(pending.at);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<f64>>>, impl Fn() -> ClockCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let make = move || -> ClockCallback {
            let log = Arc::clone(&log_clone);
            Box::new(move |at| log.lock().unwrap().push(at))
        };
        (log, make)
    }

    #[test]
    fn test_transport_state() {
        assert!(TransportState::Playing.is_playing());
        assert!(!TransportState::Playing.is_stopped());
        assert!(TransportState::Paused.is_stopped());
        assert_eq!(TransportState::default(), TransportState::Stopped);
    }

    #[test]
    fn test_manual_clock_fires_in_order() {
        let (log, make) = recorder();
        let mut clock = ManualClock::new();

        clock.schedule_at(1.0, make());
        clock.schedule_at(0.25, make());
        clock.schedule_at(0.5, make());
        assert_eq!(clock.pending(), 3);

        clock.start();
        assert_eq!(clock.advance(0.6), 2);
        assert_eq!(*log.lock().unwrap(), vec![0.25, 0.5]);
        assert!((clock.elapsed_seconds() - 0.6).abs() < 1e-12);

        assert_eq!(clock.advance_to(2.0), 1);
        assert_eq!(*log.lock().unwrap(), vec![0.25, 0.5, 1.0]);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_manual_clock_does_not_advance_while_stopped() {
        let (log, make) = recorder();
        let mut clock = ManualClock::new();
        clock.schedule_at(0.0, make());

        assert_eq!(clock.advance(1.0), 0);
        assert_eq!(clock.elapsed_seconds(), 0.0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let (log, make) = recorder();
        let mut clock = ManualClock::new();
        clock.schedule_at(0.0, make());
        clock.schedule_at(0.1, make());
        clock.start();
        clock.cancel_all();

        assert_eq!(clock.advance(1.0), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_seek_and_rate() {
        let mut clock = ManualClock::new();
        clock.seek(3.5);
        assert_eq!(clock.elapsed_seconds(), 3.5);
        clock.seek(-1.0);
        assert_eq!(clock.elapsed_seconds(), 0.0);

        clock.set_rate(90.0);
        assert_eq!(clock.rate_bpm(), 90.0);
    }

    #[test]
    fn test_non_finite_timestamp_is_dropped() {
        let (_log, make) = recorder();
        let mut clock = ManualClock::new();
        clock.schedule_at(f64::NAN, make());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_system_clock_stop_keeps_position() {
        let mut clock = SystemClock::new();
        assert!(!clock.is_running());
        clock.seek(2.0);
        assert_eq!(clock.elapsed_seconds(), 2.0);

        clock.start();
        assert!(clock.is_running());
        assert!(clock.elapsed_seconds() >= 2.0);

        clock.stop();
        let stopped_at = clock.elapsed_seconds();
        assert!(stopped_at >= 2.0);
        assert_eq!(clock.elapsed_seconds(), stopped_at);
    }

    #[test]
    fn test_system_clock_poll_fires_past_events() {
        let (log, make) = recorder();
        let mut clock = SystemClock::new();
        clock.schedule_at(0.0, make());
        clock.schedule_at(3600.0, make());

        assert_eq!(clock.poll(), 0);
        clock.start();
        assert_eq!(clock.poll(), 1);
        assert_eq!(*log.lock().unwrap(), vec![0.0]);
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_system_clock_fire_due_is_bounded() {
        let (log, make) = recorder();
        let mut clock = SystemClock::new();
        clock.seek(1.0);
        clock.schedule_at(0.5, make());
        clock.schedule_at(0.9, make());
        clock.schedule_at(5.0, make());

        // Stopped at 1.0s: due callbacks still fire, later ones wait
        assert_eq!(clock.fire_due(0.6), 1);
        assert_eq!(clock.fire_due(10.0), 1);
        assert_eq!(*log.lock().unwrap(), vec![0.5, 0.9]);
        assert_eq!(clock.pending(), 1);
    }
}
