// Note representation for the timeline model
// A note is a pitch with a tick position relative to its clip, a duration, and a velocity

use serde::{Deserialize, Serialize};

/// Unique identifier for notes (unique within a project)
pub type NoteId = u64;

/// A musical note inside a MidiClip.
///
/// Out-of-range input is clamped by the constructor, so a `Note` always holds
/// a valid MIDI pitch/velocity/channel and a duration of at least one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Assigned by the project when the note is inserted into a clip
    pub id: NoteId,

    /// MIDI note number (0-127, where 60 = C4)
    pub pitch: u8,

    /// Start position in ticks, relative to the clip start
    pub start_tick: u64,

    /// Duration in ticks (> 0)
    pub duration_ticks: u64,

    /// MIDI velocity (0-127)
    pub velocity: u8,

    /// MIDI channel (0-15)
    pub channel: u8,
}

impl Note {
    pub const MAX_PITCH: u8 = 127;
    pub const MAX_VELOCITY: u8 = 127;
    pub const MAX_CHANNEL: u8 = 15;

    /// Creates a new note on channel 0, clamping every field to its valid range
    pub fn new(pitch: i32, start_tick: i64, duration_ticks: i64, velocity: i32) -> Self {
        Self {
            id: 0,
            pitch: pitch.clamp(0, Self::MAX_PITCH as i32) as u8,
            start_tick: start_tick.max(0) as u64,
            duration_ticks: duration_ticks.max(1) as u64,
            velocity: velocity.clamp(0, Self::MAX_VELOCITY as i32) as u8,
            channel: 0,
        }
    }

    /// Same note on another MIDI channel (clamped to 0-15)
    pub fn with_channel(mut self, channel: i32) -> Self {
        self.channel = channel.clamp(0, Self::MAX_CHANNEL as i32) as u8;
        self
    }

    /// End position in ticks (exclusive)
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }

    pub fn contains_tick(&self, tick: u64) -> bool {
        tick >= self.start_tick && tick < self.end_tick()
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(&self) -> String {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];

        let octave = (self.pitch / 12) as i32 - 1;
        let note_index = (self.pitch % 12) as usize;

        format!("{}{}", NOTE_NAMES[note_index], octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let note = Note::new(60, 480, 240, 100);

        assert_eq!(note.pitch, 60);
        assert_eq!(note.start_tick, 480);
        assert_eq!(note.duration_ticks, 240);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.channel, 0);
        assert_eq!(note.end_tick(), 720);
    }

    #[test]
    fn test_note_clamping() {
        let note = Note::new(200, -15, 0, 300).with_channel(40);
        assert_eq!(note.pitch, 127);
        assert_eq!(note.start_tick, 0);
        assert_eq!(note.duration_ticks, 1);
        assert_eq!(note.velocity, 127);
        assert_eq!(note.channel, 15);

        let note = Note::new(-3, 0, -480, -1);
        assert_eq!(note.pitch, 0);
        assert_eq!(note.duration_ticks, 1);
        assert_eq!(note.velocity, 0);
    }

    #[test]
    fn test_note_contains_tick() {
        let note = Note::new(60, 100, 50, 100);

        assert!(!note.contains_tick(99));
        assert!(note.contains_tick(100));
        assert!(note.contains_tick(149));
        assert!(!note.contains_tick(150));
    }

    #[test]
    fn test_note_name() {
        assert_eq!(Note::new(60, 0, 1, 100).note_name(), "C4");
        assert_eq!(Note::new(69, 0, 1, 100).note_name(), "A4");
        assert_eq!(Note::new(73, 0, 1, 100).note_name(), "C#5");
    }
}
