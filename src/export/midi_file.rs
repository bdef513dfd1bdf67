// Standard MIDI File writer
// Format 1: a conductor track (tempo, time signature) plus one track per
// project track that has notes.

use crate::config::ExportSettings;
use crate::export::{ExportError, ExportEvent, export_events, export_file_name};
use crate::project::Project;
use crate::sequencer::timeline::TICKS_PER_QUARTER;
use log::info;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::PathBuf;

/// Largest delta a track event can carry
const MAX_DELTA: u64 = (1 << 28) - 1;

struct AbsoluteEvent<'a> {
    tick: u64,
    /// Note-offs sort before note-ons on the same tick
    order: u8,
    kind: TrackEventKind<'a>,
}

/// Encode the project as Standard MIDI File bytes
pub fn midi_bytes(project: &Project, settings: &ExportSettings) -> Result<Vec<u8>, ExportError> {
    let events = export_events(project);
    let ppq = if settings.ticks_per_quarter == 0 {
        TICKS_PER_QUARTER as u16
    } else {
        settings.ticks_per_quarter.min(0x7FFF)
    };
    let scale = |tick: u64| -> u64 {
        if ppq as u32 == TICKS_PER_QUARTER {
            tick
        } else {
            (tick as f64 * ppq as f64 / TICKS_PER_QUARTER as f64).round() as u64
        }
    };

    let mut tracks = vec![conductor_track(project)];

    for (index, track) in project.tracks().iter().enumerate() {
        let mut absolute: Vec<AbsoluteEvent> = events
            .iter()
            // Velocity 0 plays at zero gain live; as a NoteOn it would read as a note-off
            .filter(|e| e.track_index == index && e.velocity > 0)
            .flat_map(|e| note_events(e, &scale))
            .collect();
        if absolute.is_empty() {
            continue;
        }
        absolute.sort_by_key(|e| (e.tick, e.order));

        let mut track_events = Vec::with_capacity(absolute.len() + 2);
        track_events.push(TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
        });
        let mut previous_tick = 0_u64;
        for event in absolute {
            let delta = event.tick - previous_tick;
            if delta > MAX_DELTA {
                return Err(ExportError::Encode(format!(
                    "Gap of {} ticks on track '{}' exceeds the MIDI delta range",
                    delta, track.name
                )));
            }
            track_events.push(TrackEvent {
                delta: u28::from(delta as u32),
                kind: event.kind,
            });
            previous_tick = event.tick;
        }
        track_events.push(TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        tracks.push(track_events);
    }

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(u15::from(ppq)),
    };
    let mut bytes = Vec::new();
    Smf { header, tracks }.write_std(&mut bytes)?;
    Ok(bytes)
}

fn conductor_track(project: &Project) -> Vec<TrackEvent<'_>> {
    let time_signature = project.time_signature();
    vec![
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(project.title().as_bytes())),
        },
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(
                project.tempo().micros_per_quarter(),
            ))),
        },
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                time_signature.numerator,
                time_signature.denominator_power(),
                24,
                8,
            )),
        },
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]
}

fn note_events<'a>(event: &ExportEvent, scale: &impl Fn(u64) -> u64) -> [AbsoluteEvent<'a>; 2] {
    let channel = u4::from(event.channel.min(15));
    let key = u7::from(event.pitch.min(127));
    let start = scale(event.start_tick);
    let end = scale(event.end_tick()).max(start + 1);
    [
        AbsoluteEvent {
            tick: start,
            order: 1,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::from(event.velocity.min(127)),
                },
            },
        },
        AbsoluteEvent {
            tick: end,
            order: 0,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::from(0),
                },
            },
        },
    ]
}

/// Write `<output_dir>/<title>.<extension>`; returns the written path
pub fn write_midi_file(project: &Project, settings: &ExportSettings) -> Result<PathBuf, ExportError> {
    let bytes = midi_bytes(project, settings)?;
    std::fs::create_dir_all(&settings.output_dir)?;
    let path = settings.output_dir.join(export_file_name(project.title(), settings));
    std::fs::write(&path, &bytes)?;
    info!("Exported MIDI file {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
