// Playhead - Musical position derived from the transport clock
// Read-only over the clock: publishing never schedules anything.

use crate::sequencer::timeline::TimeBase;
use crate::sequencer::transport::TransportClock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Playhead state shared with the UI thread.
/// Thread-safe via atomics; the position is stored as f64 bits.
#[derive(Debug)]
pub struct SharedPlayhead {
    playing: AtomicBool,
    position_bits: AtomicU64,
    publish_count: AtomicU64,
}

impl SharedPlayhead {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current playhead position in bars (0-based)
    pub fn position_bars(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::Relaxed))
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    /// Number of frame publishes since creation
    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::Relaxed)
    }

    fn store_position(&self, bars: f64) {
        self.position_bits.store(bars.to_bits(), Ordering::Relaxed);
    }
}

impl Default for SharedPlayhead {
    fn default() -> Self {
        Self {
            playing: AtomicBool::new(false),
            position_bits: AtomicU64::new(0.0f64.to_bits()),
            publish_count: AtomicU64::new(0),
        }
    }
}

/// Playhead loop driver, owned by the scheduler
#[derive(Debug)]
pub struct Playhead {
    shared: Arc<SharedPlayhead>,
    active: bool,
}

impl Playhead {
    pub fn new() -> Self {
        Self {
            shared: SharedPlayhead::new(),
            active: false,
        }
    }

    /// Handle for readers on other threads
    pub fn shared(&self) -> Arc<SharedPlayhead> {
        Arc::clone(&self.shared)
    }

    pub fn position_bars(&self) -> f64 {
        self.shared.position_bars()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Move the playhead while stopped
    pub fn set_position(&mut self, bars: f64) {
        self.shared.store_position(bars.max(0.0));
    }

    pub fn start(&mut self) {
        self.active = true;
        self.shared.playing.store(true, Ordering::Relaxed);
    }

    /// Stop publishing and park the playhead at `bars`
    pub fn stop_at(&mut self, bars: f64) {
        self.active = false;
        self.shared.playing.store(false, Ordering::Relaxed);
        self.set_position(bars);
    }

    /// One animation frame: read the clock, convert to bars, publish.
    /// Returns `None` once playback has stopped.
    pub fn tick<C: TransportClock + ?Sized>(
        &mut self,
        clock: &C,
        time_base: &TimeBase,
    ) -> Option<f64> {
        if !self.active {
            return None;
        }
        let bars = time_base.seconds_to_bars(clock.elapsed_seconds());
        self.shared.store_position(bars);
        self.shared.publish_count.fetch_add(1, Ordering::Relaxed);
        Some(bars)
    }
}

impl Default for Playhead {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timeline::{Tempo, TimeSignature};
    use crate::sequencer::transport::ManualClock;

    #[test]
    fn test_tick_publishes_bars() {
        let tb = TimeBase::new(Tempo::new(120.0), TimeSignature::four_four());
        let mut clock = ManualClock::new();
        let mut playhead = Playhead::new();
        let shared = playhead.shared();

        playhead.start();
        clock.start();
        clock.advance(3.0);

        assert_eq!(playhead.tick(&clock, &tb), Some(1.5));
        assert_eq!(shared.position_bars(), 1.5);
        assert!(shared.is_playing());
        assert_eq!(shared.publish_count(), 1);
    }

    #[test]
    fn test_no_publish_after_stop() {
        let tb = TimeBase::default();
        let mut clock = ManualClock::new();
        let mut playhead = Playhead::new();
        let shared = playhead.shared();

        playhead.start();
        clock.start();
        clock.advance(1.0);
        playhead.tick(&clock, &tb);
        playhead.stop_at(0.0);

        clock.advance(1.0);
        assert_eq!(playhead.tick(&clock, &tb), None);
        assert_eq!(shared.publish_count(), 1);
        assert_eq!(shared.position_bars(), 0.0);
        assert!(!shared.is_playing());
    }

    #[test]
    fn test_set_position_clamps_negative() {
        let mut playhead = Playhead::new();
        playhead.set_position(-2.0);
        assert_eq!(playhead.position_bars(), 0.0);
        playhead.set_position(3.25);
        assert_eq!(playhead.position_bars(), 3.25);
    }
}
