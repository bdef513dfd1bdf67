// Project model - Tracks, mixer channels, clips, patterns and placements
// The single source of truth that playback and export read from.

pub mod arrangement;
pub mod clip;
pub mod note;
pub mod pattern;
pub mod track;
pub mod types;

pub use arrangement::{ArrangementClip, ClipSource, PlacementId};
pub use clip::{ClipId, MidiClip};
pub use note::{Note, NoteId};
pub use pattern::{Pattern, PatternId, PatternRow};
pub use track::{InstrumentRef, MixerChannel, Track, TrackId, TrackType};
pub use types::{Project, ProjectMetadata, RemovedNote, RemovedTrack};

/// Errors raised by project edits
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectError {
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Clip not found: {0}")]
    ClipNotFound(ClipId),

    #[error("Pattern not found: {0}")]
    PatternNotFound(PatternId),

    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("Placement not found: {0}")]
    PlacementNotFound(PlacementId),

    #[error("Clip data not found: {0:?}")]
    SourceNotFound(ClipSource),
}
