// Arrangement - Placements of clip data onto track timelines
// The scheduler and the exporter only ever walk placements.

use crate::project::clip::ClipId;
use crate::project::pattern::PatternId;
use crate::project::track::TrackId;
use crate::sequencer::timeline::TimeSignature;
use serde::{Deserialize, Serialize};

/// Unique identifier for arrangement placements
pub type PlacementId = u64;

/// The clip data a placement plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClipSource {
    Midi(ClipId),
    Pattern(PatternId),
}

/// A clip or pattern placed on a track at a start bar for a length in bars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementClip {
    pub id: PlacementId,
    pub track_id: TrackId,
    pub source: ClipSource,
    /// Start position in bars (0-based)
    pub start_bar: u32,
    /// Length in bars (>= 1); notes starting past it are not played
    pub length_bars: u32,
}

impl ArrangementClip {
    pub fn start_tick(&self, time_signature: &TimeSignature) -> u64 {
        self.start_bar as u64 * time_signature.ticks_per_bar() as u64
    }

    pub fn length_ticks(&self, time_signature: &TimeSignature) -> u64 {
        self.length_bars as u64 * time_signature.ticks_per_bar() as u64
    }

    pub fn end_bar(&self) -> u32 {
        self.start_bar + self.length_bars
    }

    /// Whether a clip-relative tick falls inside this placement
    pub fn plays_tick(&self, relative_tick: u64, time_signature: &TimeSignature) -> bool {
        relative_tick < self.length_ticks(time_signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_window() {
        let placement = ArrangementClip {
            id: 1,
            track_id: 1,
            source: ClipSource::Midi(4),
            start_bar: 2,
            length_bars: 1,
        };
        let ts = TimeSignature::four_four();

        assert_eq!(placement.start_tick(&ts), 3840);
        assert_eq!(placement.end_bar(), 3);
        assert!(placement.plays_tick(0, &ts));
        assert!(placement.plays_tick(1919, &ts));
        assert!(!placement.plays_tick(1920, &ts));
    }
}
