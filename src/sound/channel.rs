// Lock-free trigger channel
// A SoundSource that hands triggers to an audio thread through a ring buffer.

use crate::sound::{SoundSource, Trigger};
use log::warn;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub type TriggerProducer = ringbuf::HeapProd<Trigger>;
pub type TriggerConsumer = HeapCons<Trigger>;

/// Create a source/receiver pair backed by a ring buffer of `capacity` triggers
pub fn create_trigger_channel(capacity: usize) -> (RingSoundSource, TriggerReceiver) {
    let rb = HeapRb::<Trigger>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (
        RingSoundSource {
            producer: Mutex::new(producer),
            dropped: AtomicU64::new(0),
            chords: true,
        },
        TriggerReceiver { consumer },
    )
}

/// Sending half; lives in the registry
pub struct RingSoundSource {
    producer: Mutex<TriggerProducer>,
    dropped: AtomicU64,
    chords: bool,
}

impl RingSoundSource {
    /// Deliver chords as separate single-note triggers
    pub fn without_chords(mut self) -> Self {
        self.chords = false;
        self
    }

    /// Triggers lost because the ring buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SoundSource for RingSoundSource {
    fn trigger(&self, trigger: Trigger) {
        let Ok(mut producer) = self.producer.lock() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        // try_push never blocks; a full buffer drops the trigger
        if producer.try_push(trigger).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("Trigger channel full, {} trigger(s) dropped", dropped);
        }
    }

    fn accepts_chords(&self) -> bool {
        self.chords
    }
}

/// Receiving half; owned by the audio thread
pub struct TriggerReceiver {
    consumer: TriggerConsumer,
}

impl TriggerReceiver {
    pub fn try_recv(&mut self) -> Option<Trigger> {
        self.consumer.try_pop()
    }

    /// Pop everything currently queued
    pub fn drain(&mut self) -> Vec<Trigger> {
        let mut triggers = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(trigger) = self.consumer.try_pop() {
            triggers.push(trigger);
        }
        triggers
    }

    pub fn len(&self) -> usize {
        self.consumer.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::TriggerNote;

    fn trigger(at: f64, pitch: u8) -> Trigger {
        Trigger {
            track_id: 1,
            at_seconds: at,
            notes: vec![TriggerNote {
                pitch,
                velocity: 100,
                duration_seconds: 0.25,
                gain: 0.8,
            }],
        }
    }

    #[test]
    fn test_channel_delivers_in_order() {
        let (source, mut receiver) = create_trigger_channel(8);
        source.trigger(trigger(0.0, 60));
        source.trigger(trigger(0.5, 62));

        assert_eq!(receiver.len(), 2);
        let received = receiver.drain();
        assert_eq!(received[0].pitches(), vec![60]);
        assert_eq!(received[1].at_seconds, 0.5);
        assert!(receiver.is_empty());
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_channel_counts_drops() {
        let (source, mut receiver) = create_trigger_channel(2);
        for i in 0..5 {
            source.trigger(trigger(i as f64, 60));
        }
        assert_eq!(source.dropped(), 3);
        assert_eq!(receiver.drain().len(), 2);
    }

    #[test]
    fn test_without_chords() {
        let (source, _receiver) = create_trigger_channel(4);
        assert!(source.accepts_chords());
        assert!(!source.without_chords().accepts_chords());
    }
}
