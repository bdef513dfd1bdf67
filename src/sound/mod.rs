// Sound sources - Boundary between the scheduler and whatever produces audio
//
// The scheduler only ever hands a `Trigger` to a `SoundSource`. How the sound
// is made (synth, sampler, MIDI out) lives behind the trait.

pub mod channel;
pub mod registry;

pub use channel::{RingSoundSource, TriggerReceiver, create_trigger_channel};
pub use registry::SoundSourceRegistry;

use crate::project::{Track, TrackId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One pitch inside a trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerNote {
    pub pitch: u8,
    pub velocity: u8,
    /// Note length in seconds (already floored to an audible minimum)
    pub duration_seconds: f64,
    /// Linear gain: velocity mapped to 0.0 - 1.0, times the mixer channel volume
    pub gain: f32,
}

/// "Play these pitches at this time" for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub track_id: TrackId,
    /// Transport time the trigger was scheduled for
    pub at_seconds: f64,
    pub notes: Vec<TriggerNote>,
}

impl Trigger {
    pub fn is_chord(&self) -> bool {
        self.notes.len() > 1
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }
}

/// Capability a track's instrument exposes to the scheduler.
///
/// `trigger` is called from the transport clock's callback context and must
/// return immediately; sound is produced asynchronously.
pub trait SoundSource: Send + Sync {
    fn trigger(&self, trigger: Trigger);

    /// Whether one trigger may carry several pitches. Sources returning false
    /// receive one single-note trigger per pitch, all at the same timestamp.
    fn accepts_chords(&self) -> bool {
        true
    }

    /// Release resources; called once when the track's source is disposed
    fn dispose(&self) {}
}

/// Builds the sound source for a track
pub trait SoundSourceFactory {
    /// Returns `None` when the track cannot sound (e.g. no instrument reference)
    fn create(&self, track: &Track) -> Option<Arc<dyn SoundSource>>;
}

/// MIDI velocity to linear gain (0.0 - 1.0)
pub fn velocity_to_gain(velocity: u8) -> f32 {
    velocity.min(127) as f32 / 127.0
}
