// Post-processing for generated notes
// Runs in order: quantize, then the style transform. All transforms are
// deterministic; times are in beats.

use crate::generate::{GeneratedNote, VELOCITY_MAX, VELOCITY_MIN};
use log::debug;

/// Positions closer than this (in beats) count as on the grid line
pub const BEAT_TOLERANCE: f64 = 0.01;

/// Default quantize grid: sixteenth notes
pub const DEFAULT_QUANTIZE_GRID: f64 = 0.25;

/// Standard 2:1 swing
pub const DEFAULT_SWING_RATIO: f64 = 0.66;

/// Which style transform to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleCategory {
    #[default]
    Neutral,
    Swing,
    Rock,
    Funk,
    Reggae,
}

const SWING_STYLES: &[&str] = &["jazz", "swing", "blues", "shuffle", "bebop", "dixieland", "ragtime", "big band"];
const FUNK_STYLES: &[&str] = &["funk", "soul", "motown", "r&b", "neo-soul", "disco"];
const ROCK_STYLES: &[&str] = &["rock", "metal", "punk", "grunge", "alternative"];
const REGGAE_STYLES: &[&str] = &["reggae", "ska", "dub", "dancehall"];

impl StyleCategory {
    /// Pick a category from a free-text style prompt
    pub fn detect(style: &str) -> Self {
        let style = style.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| style.contains(k));
        if matches(SWING_STYLES) {
            StyleCategory::Swing
        } else if matches(FUNK_STYLES) {
            StyleCategory::Funk
        } else if matches(ROCK_STYLES) {
            StyleCategory::Rock
        } else if matches(REGGAE_STYLES) {
            StyleCategory::Reggae
        } else {
            StyleCategory::Neutral
        }
    }
}

/// Snap start times (and durations, never below one grid step) to `grid` beats
pub fn quantize(notes: &mut [GeneratedNote], grid: f64) {
    if grid.is_nan() || grid <= 0.0 {
        return;
    }
    for note in notes.iter_mut() {
        note.time = (note.time / grid).round() * grid;
        if let Some(duration) = note.duration.as_mut() {
            *duration = ((*duration / grid).round() * grid).max(grid);
        }
    }
}

/// Delay off-beat eighths to `ratio` of the beat and the last sixteenth
/// to `0.5 + ratio / 2`. A ratio of 0.5 is straight time.
pub fn apply_swing(notes: &mut [GeneratedNote], ratio: f64) {
    if (ratio - 0.5).abs() < BEAT_TOLERANCE {
        return;
    }
    for note in notes.iter_mut() {
        let position = note.time.rem_euclid(1.0);
        let beat = note.time - position;
        if (position - 0.5).abs() < BEAT_TOLERANCE {
            note.time = beat + ratio;
        } else if (position - 0.75).abs() < BEAT_TOLERANCE {
            note.time = beat + 0.5 + ratio / 2.0;
        }
    }
}

fn scale_velocity(velocity: i32, factor: f64) -> i32 {
    ((velocity as f64 * factor) as i32).clamp(VELOCITY_MIN, VELOCITY_MAX)
}

/// Accent beats 1 and 3, soften beats 2 and 4 (4/4 bars)
pub fn apply_rock_emphasis(notes: &mut [GeneratedNote]) {
    for note in notes.iter_mut() {
        let position = note.time.rem_euclid(4.0);
        let near = |beat: f64| (position - beat).abs() < BEAT_TOLERANCE;
        if near(0.0) || near(2.0) {
            note.velocity = scale_velocity(note.velocity, 1.15);
        } else if near(1.0) || near(3.0) {
            note.velocity = scale_velocity(note.velocity, 0.95);
        }
    }
}

/// Accent the "and" of each beat, soften the downbeats
pub fn apply_reggae_offbeat(notes: &mut [GeneratedNote]) {
    for note in notes.iter_mut() {
        let position = note.time.rem_euclid(1.0);
        if (position - 0.5).abs() < 0.1 {
            note.velocity = scale_velocity(note.velocity, 1.2);
        } else if position < 0.1 || position > 0.9 {
            note.velocity = scale_velocity(note.velocity, 0.85);
        }
    }
}

/// Full pipeline: quantize, style transform, then sort by time
pub fn post_process(
    notes: &mut [GeneratedNote],
    style: StyleCategory,
    grid: Option<f64>,
    swing_ratio: f64,
) {
    if notes.is_empty() {
        return;
    }
    if let Some(grid) = grid {
        quantize(notes, grid);
    }
    match style {
        StyleCategory::Swing => apply_swing(notes, swing_ratio),
        StyleCategory::Rock | StyleCategory::Funk => apply_rock_emphasis(notes),
        StyleCategory::Reggae => apply_reggae_offbeat(notes),
        StyleCategory::Neutral => {}
    }
    notes.sort_by(|a, b| a.time.total_cmp(&b.time));
    debug!("Post-processed {} generated notes ({:?})", notes.len(), style);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(time: f64) -> GeneratedNote {
        GeneratedNote {
            pitch: Some(60),
            time,
            duration: Some(0.5),
            velocity: 100,
            ..GeneratedNote::default()
        }
    }

    #[test]
    fn test_detect_style() {
        assert_eq!(StyleCategory::detect("Smoky Jazz trio"), StyleCategory::Swing);
        assert_eq!(StyleCategory::detect("70s disco funk"), StyleCategory::Funk);
        assert_eq!(StyleCategory::detect("classic rock"), StyleCategory::Rock);
        assert_eq!(StyleCategory::detect("roots reggae"), StyleCategory::Reggae);
        assert_eq!(StyleCategory::detect("ambient"), StyleCategory::Neutral);
    }

    #[test]
    fn test_quantize() {
        let mut notes = vec![at(0.498), at(1.13)];
        notes[1].duration = Some(0.05);
        quantize(&mut notes, 0.25);
        assert_eq!(notes[0].time, 0.5);
        assert_eq!(notes[1].time, 1.25);
        assert_eq!(notes[1].duration, Some(0.25));
    }

    #[test]
    fn test_swing_moves_offbeats() {
        let mut notes = vec![at(0.0), at(0.25), at(0.5), at(1.75)];
        apply_swing(&mut notes, 0.66);
        assert_eq!(notes[0].time, 0.0);
        assert_eq!(notes[1].time, 0.25);
        assert!((notes[2].time - 0.66).abs() < 1e-9);
        assert!((notes[3].time - 1.83).abs() < 1e-9);

        let mut straight = vec![at(0.5)];
        apply_swing(&mut straight, 0.505);
        assert_eq!(straight[0].time, 0.5);
    }

    #[test]
    fn test_rock_emphasis_stays_in_range() {
        let mut notes = vec![at(0.0), at(1.0), at(0.5)];
        notes[0].velocity = 110;
        notes[1].velocity = 41;
        apply_rock_emphasis(&mut notes);
        assert_eq!(notes[0].velocity, VELOCITY_MAX);
        assert_eq!(notes[1].velocity, VELOCITY_MIN);
        assert_eq!(notes[2].velocity, 100);
    }

    #[test]
    fn test_post_process_sorts() {
        let mut notes = vec![at(2.0), at(0.49), at(1.0)];
        post_process(&mut notes, StyleCategory::Neutral, Some(DEFAULT_QUANTIZE_GRID), DEFAULT_SWING_RATIO);
        let times: Vec<f64> = notes.iter().map(|n| n.time).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }
}
