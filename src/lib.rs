// NextBeat - Timeline, playback scheduling and MIDI export core

pub mod command;
pub mod config;
pub mod export;
pub mod generate;
pub mod project;
pub mod sequencer;
pub mod session;
pub mod sound;

// Re-export commonly used types for convenience
pub use command::{CommandError, CommandManager, UndoableCommand};
pub use config::{EngineConfig, ExportSettings, SchedulerSettings};
pub use export::{ExportError, ExportEvent, export_events, midi_bytes, write_midi_file};
pub use generate::{GeneratedNote, ImportOptions, StyleCategory};
pub use project::{
    ArrangementClip, ClipSource, InstrumentRef, MidiClip, Note, Pattern, Project, ProjectError,
    Track, TrackType,
};
pub use sequencer::{
    ManualClock, MusicalTime, Scheduler, SnapGrid, StopMode, SystemClock, Tempo, TimeBase,
    TimeSignature, TransportClock, TransportState,
};
pub use session::Session;
pub use sound::{SoundSource, SoundSourceFactory, SoundSourceRegistry, Trigger, TriggerNote};
