// MidiClip - Note container owned by one track

use crate::project::note::{Note, NoteId};
use crate::project::track::TrackId;
use crate::sequencer::timeline::TimeSignature;
use serde::{Deserialize, Serialize};

/// Unique identifier for MIDI clips
pub type ClipId = u64;

/// Default clip length created by the ensure-clip operation
pub const DEFAULT_CLIP_BARS: u32 = 4;

/// A clip of MIDI notes.
///
/// Notes keep insertion order and may overlap freely (chords, re-triggers);
/// deduplication is left to editing tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiClip {
    pub id: ClipId,

    /// Owning track
    pub track_id: TrackId,

    pub name: String,

    /// Home position of the clip, in bars (0-based)
    pub start_bar: u32,

    /// Length in bars (>= 1)
    pub length_bars: u32,

    notes: Vec<Note>,
}

impl MidiClip {
    pub fn new(id: ClipId, track_id: TrackId, name: String, start_bar: u32, length_bars: u32) -> Self {
        Self {
            id,
            track_id,
            name,
            start_bar,
            length_bars: length_bars.max(1),
            notes: Vec::new(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub(crate) fn push_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub(crate) fn insert_note_at(&mut self, index: usize, note: Note) {
        let index = index.min(self.notes.len());
        self.notes.insert(index, note);
    }

    /// Remove a note by ID, returning its former index and value
    pub(crate) fn remove_note(&mut self, note_id: NoteId) -> Option<(usize, Note)> {
        let index = self.notes.iter().position(|n| n.id == note_id)?;
        Some((index, self.notes.remove(index)))
    }

    pub fn get_note(&self, note_id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == note_id)
    }

    /// Notes sounding at a clip-relative tick
    pub fn notes_at_tick(&self, tick: u64) -> Vec<&Note> {
        self.notes.iter().filter(|n| n.contains_tick(tick)).collect()
    }

    pub fn length_ticks(&self, time_signature: &TimeSignature) -> u64 {
        self.length_bars as u64 * time_signature.ticks_per_bar() as u64
    }

    pub(crate) fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: NoteId, pitch: i32, start: i64) -> Note {
        Note {
            id,
            ..Note::new(pitch, start, 480, 100)
        }
    }

    #[test]
    fn test_clip_creation() {
        let clip = MidiClip::new(1, 7, "Verse".to_string(), 2, 0);
        assert_eq!(clip.track_id, 7);
        assert_eq!(clip.start_bar, 2);
        assert_eq!(clip.length_bars, 1);
        assert!(clip.is_empty());
        assert_eq!(clip.length_ticks(&TimeSignature::four_four()), 1920);
    }

    #[test]
    fn test_insertion_order_and_overlap() {
        let mut clip = MidiClip::new(1, 1, "Test".to_string(), 0, 4);
        clip.push_note(note(1, 64, 960));
        clip.push_note(note(2, 60, 0));
        clip.push_note(note(3, 60, 0));

        let pitches: Vec<u8> = clip.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![64, 60, 60]);
        assert_eq!(clip.notes_at_tick(0).len(), 2);
    }

    #[test]
    fn test_remove_and_reinsert() {
        let mut clip = MidiClip::new(1, 1, "Test".to_string(), 0, 4);
        clip.push_note(note(1, 60, 0));
        clip.push_note(note(2, 62, 480));
        clip.push_note(note(3, 64, 960));

        let (index, removed) = clip.remove_note(2).unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.pitch, 62);
        assert!(clip.remove_note(2).is_none());

        clip.insert_note_at(index, removed);
        assert_eq!(clip.notes()[1].id, 2);
        assert!(clip.get_note(2).is_some());

        clip.clear();
        assert_eq!(clip.note_count(), 0);
    }
}
