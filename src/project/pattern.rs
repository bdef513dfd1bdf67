// Pattern - Step-sequencer grid
// Materialized into ordinary notes on demand; playback never reads the grid directly.

use crate::project::note::Note;
use crate::sequencer::timeline::TimeSignature;
use serde::{Deserialize, Serialize};

/// Unique identifier for patterns
pub type PatternId = u64;

/// Default grid resolution: sixteenth steps
pub const DEFAULT_STEPS_PER_BAR: usize = 16;

/// General MIDI percussion channel (10, zero-based 9)
pub const DRUM_CHANNEL: u8 = 9;

/// One sequencer lane: a pitch and its on/off steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRow {
    pub pitch: u8,
    pub velocity: u8,
    steps: Vec<bool>,
}

impl PatternRow {
    pub fn steps(&self) -> &[bool] {
        &self.steps
    }

    pub fn active_steps(&self) -> usize {
        self.steps.iter().filter(|s| **s).count()
    }
}

/// A step-sequencer pattern with a fixed step count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,

    pub name: String,

    /// MIDI channel of the materialized notes
    pub channel: u8,

    step_count: usize,

    steps_per_bar: usize,

    rows: Vec<PatternRow>,
}

impl Pattern {
    /// Create an empty pattern with `step_count` sixteenth steps (at least one)
    pub fn new(id: PatternId, name: String, step_count: usize) -> Self {
        Self {
            id,
            name,
            channel: DRUM_CHANNEL,
            step_count: step_count.max(1),
            steps_per_bar: DEFAULT_STEPS_PER_BAR,
            rows: Vec::new(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn steps_per_bar(&self) -> usize {
        self.steps_per_bar
    }

    pub fn rows(&self) -> &[PatternRow] {
        &self.rows
    }

    /// Add a lane; returns its row index
    pub fn add_row(&mut self, pitch: i32, velocity: i32) -> usize {
        self.rows.push(PatternRow {
            pitch: pitch.clamp(0, Note::MAX_PITCH as i32) as u8,
            velocity: velocity.clamp(1, Note::MAX_VELOCITY as i32) as u8,
            steps: vec![false; self.step_count],
        });
        self.rows.len() - 1
    }

    /// Set one cell; returns false if the row or step does not exist
    pub fn set_step(&mut self, row: usize, step: usize, on: bool) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.steps.get_mut(step)) {
            Some(cell) => {
                *cell = on;
                true
            }
            None => false,
        }
    }

    pub fn is_step_on(&self, row: usize, step: usize) -> bool {
        self.rows
            .get(row)
            .and_then(|r| r.steps.get(step))
            .copied()
            .unwrap_or(false)
    }

    /// Length in whole bars (rounded up)
    pub fn length_bars(&self) -> u32 {
        self.step_count.div_ceil(self.steps_per_bar) as u32
    }

    /// Duration of one step in ticks
    pub fn step_ticks(&self, time_signature: &TimeSignature) -> u64 {
        (time_signature.ticks_per_bar() as u64 / self.steps_per_bar as u64).max(1)
    }

    /// Materialize the grid into notes, one step long each, ordered by step then row
    pub fn to_notes(&self, time_signature: &TimeSignature) -> Vec<Note> {
        let step_ticks = self.step_ticks(time_signature);
        let mut notes = Vec::new();
        for step in 0..self.step_count {
            for (row_index, row) in self.rows.iter().enumerate() {
                if !row.steps.get(step).copied().unwrap_or(false) {
                    continue;
                }
                let mut note = Note::new(
                    row.pitch as i32,
                    (step as u64 * step_ticks) as i64,
                    step_ticks as i64,
                    row.velocity as i32,
                )
                .with_channel(self.channel as i32);
                note.id = (step * self.rows.len() + row_index) as u64;
                notes.push(note);
            }
        }
        notes
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.active_steps() == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_creation() {
        let pattern = Pattern::new(1, "Beat".to_string(), 16);
        assert_eq!(pattern.step_count(), 16);
        assert_eq!(pattern.length_bars(), 1);
        assert_eq!(pattern.channel, DRUM_CHANNEL);
        assert!(pattern.is_empty());

        assert_eq!(Pattern::new(2, "Long".to_string(), 20).length_bars(), 2);
        assert_eq!(Pattern::new(3, "Empty".to_string(), 0).step_count(), 1);
    }

    #[test]
    fn test_set_step_bounds() {
        let mut pattern = Pattern::new(1, "Beat".to_string(), 16);
        let kick = pattern.add_row(36, 100);

        assert!(pattern.set_step(kick, 0, true));
        assert!(pattern.is_step_on(kick, 0));
        assert!(!pattern.set_step(kick, 16, true));
        assert!(!pattern.set_step(5, 0, true));
        assert!(!pattern.is_step_on(5, 0));
    }

    #[test]
    fn test_to_notes() {
        let mut pattern = Pattern::new(1, "Beat".to_string(), 16);
        let kick = pattern.add_row(36, 110);
        let hat = pattern.add_row(42, 70);
        pattern.set_step(kick, 0, true);
        pattern.set_step(kick, 8, true);
        pattern.set_step(hat, 0, true);
        pattern.set_step(hat, 4, true);

        let notes = pattern.to_notes(&TimeSignature::four_four());
        assert_eq!(notes.len(), 4);

        // Step 0 holds kick and hat together
        assert_eq!((notes[0].pitch, notes[0].start_tick), (36, 0));
        assert_eq!((notes[1].pitch, notes[1].start_tick), (42, 0));
        assert_eq!((notes[2].pitch, notes[2].start_tick), (42, 480));
        assert_eq!((notes[3].pitch, notes[3].start_tick), (36, 960));

        assert!(notes.iter().all(|n| n.duration_ticks == 120));
        assert!(notes.iter().all(|n| n.channel == DRUM_CHANNEL));
        assert_eq!(notes[0].velocity, 110);
    }
}
