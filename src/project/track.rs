// Track and mixer channel types
//
// Volume, pan, mute and solo live in two places: the track (editor display)
// and its mixer channel (audio output). Only `Project`'s setters write them,
// and they always write both. Playback reads the mixer channel.

use serde::{Deserialize, Serialize};

/// Unique identifier for tracks
pub type TrackId = u64;

pub const DEFAULT_TRACK_VOLUME: f32 = 0.8;

/// Track type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackType {
    /// Melodic instrument track
    Instrument,
    /// Drum / step-sequencer track
    Drums,
    /// Automation lane; carries no notes of its own
    Automation,
}

/// Reference to the instrument a track plays through.
/// A track without one is silent and skipped by playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRef {
    /// Preset or engine name, e.g. "piano" or "drum-kit"
    pub preset: String,
}

impl InstrumentRef {
    pub fn new(preset: impl Into<String>) -> Self {
        Self {
            preset: preset.into(),
        }
    }
}

/// Track configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Track color (for UI)
    pub color: [u8; 3],
    pub track_type: TrackType,
    /// Armed for recording
    pub armed: bool,
    pub instrument: Option<InstrumentRef>,
    pub(crate) volume: f32,
    pub(crate) pan: f32,
    pub(crate) muted: bool,
    pub(crate) soloed: bool,
}

impl Track {
    pub(crate) fn new(
        id: TrackId,
        name: String,
        track_type: TrackType,
        instrument: Option<InstrumentRef>,
    ) -> Self {
        Self {
            id,
            name,
            color: default_color(track_type),
            track_type,
            armed: false,
            instrument,
            volume: DEFAULT_TRACK_VOLUME,
            pan: 0.0,
            muted: false,
            soloed: false,
        }
    }

    /// Display volume (0.0 - 1.0)
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Display pan (-1.0 left, 0.0 center, 1.0 right)
    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed
    }

    pub fn has_instrument(&self) -> bool {
        self.instrument.is_some()
    }
}

fn default_color(track_type: TrackType) -> [u8; 3] {
    match track_type {
        TrackType::Instrument => [100, 150, 200],
        TrackType::Drums => [220, 120, 80],
        TrackType::Automation => [140, 140, 140],
    }
}

/// Mixer strip for one track; authoritative for audio output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerChannel {
    pub track_id: TrackId,
    pub(crate) volume: f32,
    pub(crate) pan: f32,
    pub(crate) muted: bool,
    pub(crate) soloed: bool,
}

impl MixerChannel {
    pub(crate) fn for_track(track: &Track) -> Self {
        Self {
            track_id: track.id,
            volume: track.volume,
            pan: track.pan,
            muted: track.muted,
            soloed: track.soloed,
        }
    }

    /// Output gain (0.0 - 1.0, linear)
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed
    }
}

/// Clamp a linear gain to 0.0 - 1.0 (NaN becomes silence)
pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) }
}

/// Clamp a pan position to -1.0 - 1.0 (NaN becomes center)
pub(crate) fn clamp_pan(pan: f32) -> f32 {
    if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) }
}
