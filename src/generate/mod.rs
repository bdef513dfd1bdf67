// Generated notes - Import of note data produced by the AI generation backend
//
// The backend speaks beats: `time` and `duration` are in quarter notes. Notes
// are validated, post-processed, converted to ticks and then inserted into the
// track's default clip like any hand-drawn note.

pub mod post_processing;

pub use post_processing::{StyleCategory, post_process};

use crate::project::pattern::DRUM_CHANNEL;
use crate::project::{ClipId, Note, NoteId, Project, ProjectError, TrackId};
use crate::sequencer::timeline::TICKS_PER_QUARTER;
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const VELOCITY_MIN: i32 = 40;
pub const VELOCITY_MAX: i32 = 120;
pub const DEFAULT_VELOCITY: i32 = 80;

/// Pitched notes are kept inside the piano range (A0 - C8)
pub const PIANO_LOWEST: i32 = 21;
pub const PIANO_HIGHEST: i32 = 108;

/// Duration limits for pitched notes, in beats
pub const MIN_DURATION_BEATS: f64 = 0.125;
pub const MAX_DURATION_BEATS: f64 = 8.0;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid generated note JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// One note as emitted by the generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedNote {
    /// MIDI pitch of a melodic note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i32>,
    /// Drum name (see `drum_pitch`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drum: Option<String>,
    /// Explicit MIDI note of a drum hit; wins over `drum`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi_note: Option<i32>,
    /// Onset in beats
    pub time: f64,
    /// Length in beats; absent for drum hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub velocity: i32,
}

impl Default for GeneratedNote {
    fn default() -> Self {
        Self {
            pitch: None,
            drum: None,
            midi_note: None,
            time: 0.0,
            duration: None,
            velocity: DEFAULT_VELOCITY,
        }
    }
}

impl GeneratedNote {
    pub fn is_drum(&self) -> bool {
        self.pitch.is_none() && (self.drum.is_some() || self.midi_note.is_some())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NotePayload {
    List(Vec<GeneratedNote>),
    Wrapped { notes: Vec<GeneratedNote> },
}

/// Parse a bare note array or a `{"notes": [...]}` object
pub fn parse_generated_notes(json: &str) -> Result<Vec<GeneratedNote>, ImportError> {
    Ok(match serde_json::from_str(json)? {
        NotePayload::List(notes) => notes,
        NotePayload::Wrapped { notes } => notes,
    })
}

/// General MIDI percussion note for a drum name
pub fn drum_pitch(name: &str) -> Option<u8> {
    let pitch = match name.trim().to_lowercase().as_str() {
        "kick" => 36,
        "rimshot" => 37,
        "snare" => 38,
        "clap" => 39,
        "hihat" => 42,
        "tom_low" => 45,
        "hihat_open" => 46,
        "tom_mid" => 47,
        "crash" => 49,
        "tom_high" => 50,
        "ride" => 51,
        "cowbell" => 56,
        _ => return None,
    };
    Some(pitch)
}

/// How generated notes are cleaned up before insertion
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Quantize grid in beats; `None` keeps the raw timing
    pub quantize_grid: Option<f64>,
    pub style: StyleCategory,
    pub swing_ratio: f64,
    /// Notes are clamped to start no later than this many beats
    pub max_beats: Option<f64>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            quantize_grid: Some(post_processing::DEFAULT_QUANTIZE_GRID),
            style: StyleCategory::Neutral,
            swing_ratio: post_processing::DEFAULT_SWING_RATIO,
            max_beats: None,
        }
    }
}

impl ImportOptions {
    /// Options with the style transform picked from a text prompt
    pub fn for_style(prompt: &str) -> Self {
        Self {
            style: StyleCategory::detect(prompt),
            ..Self::default()
        }
    }
}

/// Clamp ranges and drop notes that cannot be played (unknown drums)
pub fn validate(notes: Vec<GeneratedNote>, max_beats: Option<f64>) -> Vec<GeneratedNote> {
    let max_beats = max_beats.unwrap_or(f64::MAX);
    notes
        .into_iter()
        .filter_map(|mut note| {
            if !note.time.is_finite() {
                warn!("Generated note with non-finite time, skipping");
                return None;
            }
            note.time = note.time.clamp(0.0, max_beats);
            note.velocity = note.velocity.clamp(VELOCITY_MIN, VELOCITY_MAX);
            if note.is_drum() {
                let pitch = match (note.midi_note, note.drum.as_deref()) {
                    (Some(midi_note), _) => Some(midi_note.clamp(0, 127)),
                    (None, Some(name)) => drum_pitch(name).map(i32::from),
                    (None, None) => None,
                };
                let Some(pitch) = pitch else {
                    warn!("Unknown drum '{}', skipping", note.drum.as_deref().unwrap_or(""));
                    return None;
                };
                note.midi_note = Some(pitch);
                note.duration = None;
            } else {
                note.pitch = Some(note.pitch.unwrap_or(60).clamp(PIANO_LOWEST, PIANO_HIGHEST));
                let duration = note.duration.filter(|d| d.is_finite()).unwrap_or(1.0);
                note.duration = Some(duration.clamp(MIN_DURATION_BEATS, MAX_DURATION_BEATS));
            }
            Some(note)
        })
        .collect()
}

fn beats_to_ticks(beats: f64) -> i64 {
    (beats * TICKS_PER_QUARTER as f64).round() as i64
}

/// Convert processed notes to clip notes (480 ticks per beat, rounded).
/// Drum hits last `drum_ticks` and go to the percussion channel.
pub fn to_notes(notes: &[GeneratedNote], drum_ticks: u64) -> Vec<Note> {
    notes
        .iter()
        .filter_map(|note| {
            let start = beats_to_ticks(note.time);
            if note.is_drum() {
                let pitch = note.midi_note?;
                Some(
                    Note::new(pitch, start, drum_ticks as i64, note.velocity)
                        .with_channel(DRUM_CHANNEL as i32),
                )
            } else {
                let duration = beats_to_ticks(note.duration.unwrap_or(1.0));
                Some(Note::new(note.pitch?, start, duration, note.velocity))
            }
        })
        .collect()
}

/// Validate, post-process and insert generated notes into the track's default clip
pub fn import_into(
    project: &mut Project,
    track_id: TrackId,
    notes: Vec<GeneratedNote>,
    options: &ImportOptions,
) -> Result<(ClipId, Vec<NoteId>), ImportError> {
    let mut notes = validate(notes, options.max_beats);
    post_process(&mut notes, options.style, options.quantize_grid, options.swing_ratio);

    let drum_ticks = project.snap().ticks(&project.time_signature());
    let clip_id = project.ensure_clip(track_id)?;
    let ids = project.add_notes(clip_id, to_notes(&notes, drum_ticks))?;
    info!(
        "Imported {} generated notes into clip {} on track {}",
        ids.len(),
        clip_id,
        track_id
    );
    Ok((clip_id, ids))
}
