// Arrangement resolution
// Walks placements into absolute-tick notes. Shared by live playback and export,
// so both see exactly the same notes.

use crate::project::{ArrangementClip, ClipSource, Note, PlacementId, Project, TrackId};
use log::{debug, warn};

/// A note placed on the song timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNote {
    pub track_id: TrackId,
    /// Position of the track in the project's track list
    pub track_index: usize,
    pub placement_id: PlacementId,
    /// Placement start plus the note's clip-relative start
    pub absolute_tick: u64,
    pub note: Note,
}

/// Resolve every playable note in the project, in placement order.
///
/// Skipped (logged, never an error): placements on missing tracks, tracks
/// the mixer silences, tracks without an instrument, and dangling clip
/// references. Notes starting past the placement length are cut.
pub fn resolve_project(project: &Project) -> Vec<ResolvedNote> {
    let mut resolved = Vec::new();
    for placement in project.placements() {
        let Some(track_index) = project.track_index(placement.track_id) else {
            warn!(
                "Placement {} references missing track {}, skipping",
                placement.id, placement.track_id
            );
            continue;
        };
        let track = &project.tracks()[track_index];
        if !project.is_audible(track.id) {
            debug!("Track {} is muted or not soloed, skipping placement {}", track.id, placement.id);
            continue;
        }
        if !track.has_instrument() {
            debug!("Track {} has no instrument, skipping placement {}", track.id, placement.id);
            continue;
        }
        let Some(notes) = placement_notes(project, placement) else {
            warn!(
                "Placement {} references missing clip data {:?}, skipping",
                placement.id, placement.source
            );
            continue;
        };
        let start = placement.start_tick(&project.time_signature());
        resolved.extend(notes.into_iter().map(|note| ResolvedNote {
            track_id: track.id,
            track_index,
            placement_id: placement.id,
            absolute_tick: start + note.start_tick,
            note,
        }));
    }
    resolved
}

/// Notes a placement plays, with clip-relative ticks inside its window.
/// Patterns repeat to fill the placement.
fn placement_notes(project: &Project, placement: &ArrangementClip) -> Option<Vec<Note>> {
    let time_signature = project.time_signature();
    let window = placement.length_ticks(&time_signature);
    let notes = match placement.source {
        ClipSource::Midi(id) => project.midi_clip(id)?.notes().to_vec(),
        ClipSource::Pattern(id) => {
            let pattern = project.pattern(id)?;
            let cycle = pattern.step_ticks(&time_signature) * pattern.step_count() as u64;
            let once = pattern.to_notes(&time_signature);
            let mut notes = Vec::new();
            let mut offset = 0;
            while offset < window && !once.is_empty() {
                notes.extend(once.iter().map(|n| Note {
                    start_tick: n.start_tick + offset,
                    ..*n
                }));
                offset += cycle;
            }
            notes
        }
    };
    Some(
        notes
            .into_iter()
            .filter(|n| placement.plays_tick(n.start_tick, &time_signature))
            .collect(),
    )
}
