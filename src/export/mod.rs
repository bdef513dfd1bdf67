// Export - Static, time-ordered note events for file output
//
// Reads the same resolved notes as live playback and converts them with the
// same TimeBase. Simultaneous onsets are kept as they are: no chord grouping
// and no monotonic nudging.

pub mod midi_file;

pub use midi_file::{midi_bytes, write_midi_file};

use crate::config::ExportSettings;
use crate::project::{Project, TrackId};
use crate::sequencer::resolve::resolve_project;
use crate::sequencer::timeline::TimeBase;
use log::info;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MIDI encoding error: {0}")]
    Encode(String),
}

/// One exported note
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportEvent {
    pub track_id: TrackId,
    pub track_index: usize,
    pub channel: u8,
    pub pitch: u8,
    pub velocity: u8,
    /// Absolute position on the song timeline
    pub start_tick: u64,
    pub duration_ticks: u64,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

impl ExportEvent {
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }
}

/// Flatten the project into events ordered by (start tick, track, pitch).
/// Zero-length notes last one snap-grid step, as in live playback.
pub fn export_events(project: &Project) -> Vec<ExportEvent> {
    let time_base = project.time_base();
    let snap_ticks = project.snap().ticks(&time_base.time_signature);

    let mut events: Vec<ExportEvent> = resolve_project(project)
        .into_iter()
        .map(|resolved| {
            let duration_ticks = match resolved.note.duration_ticks {
                0 => snap_ticks,
                ticks => ticks,
            };
            ExportEvent {
                track_id: resolved.track_id,
                track_index: resolved.track_index,
                channel: resolved.note.channel,
                pitch: resolved.note.pitch,
                velocity: resolved.note.velocity,
                start_tick: resolved.absolute_tick,
                duration_ticks,
                start_seconds: time_base.ticks_to_seconds(resolved.absolute_tick),
                duration_seconds: time_base.ticks_to_seconds(duration_ticks),
            }
        })
        .collect();
    events.sort_by_key(|e| (e.start_tick, e.track_index, e.pitch));
    events
}

/// Tick position recovered from an exported start time
pub fn reconstruct_tick(start_seconds: f64, time_base: &TimeBase) -> u64 {
    time_base.seconds_to_ticks(start_seconds)
}

/// Pretty JSON dump of an event list
pub fn events_to_json(events: &[ExportEvent]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(events)?)
}

/// File name for a project title: unsafe characters replaced, configured extension
pub fn export_file_name(title: &str, settings: &ExportSettings) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim();
    let stem = if stem.is_empty() { "untitled" } else { stem };
    let extension = settings.extension.trim_start_matches('.');
    format!("{stem}.{extension}")
}

/// Write the event list as JSON next to where the MIDI file would go
pub fn write_events_json(project: &Project, settings: &ExportSettings) -> Result<std::path::PathBuf, ExportError> {
    let events = export_events(project);
    let mut path = settings.output_dir.join(export_file_name(project.title(), settings));
    path.set_extension("json");
    std::fs::write(&path, events_to_json(&events)?)?;
    info!("Exported {} events to {}", events.len(), path.display());
    Ok(path)
}
