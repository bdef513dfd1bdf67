// Session - Owns the project and everything that plays it
//
// Edits go through the session so the sound-source registry, the clock rate
// and a running schedule follow the project.

use crate::command::{
    AddTrackCommand, CommandManager, CommandResult, RemoveTrackCommand, UndoableCommand,
};
use crate::config::EngineConfig;
use crate::export::{self, ExportError, ExportEvent};
use crate::generate::{self, ImportError, ImportOptions};
use crate::project::{InstrumentRef, NoteId, Project, ProjectError, TrackId, TrackType};
use crate::sequencer::scheduler::{Scheduler, StopMode};
use crate::sequencer::transport::TransportClock;
use crate::sound::{SoundSourceFactory, SoundSourceRegistry};
use log::debug;
use std::path::PathBuf;

pub struct Session<C: TransportClock> {
    project: Project,
    registry: SoundSourceRegistry,
    factory: Box<dyn SoundSourceFactory>,
    scheduler: Scheduler<C>,
    history: CommandManager,
    config: EngineConfig,
}

impl<C: TransportClock> Session<C> {
    /// Wrap a project; sources are created for every track that can sound
    pub fn new(
        project: Project,
        clock: C,
        factory: Box<dyn SoundSourceFactory>,
        config: EngineConfig,
    ) -> Self {
        let mut session = Self {
            project,
            registry: SoundSourceRegistry::new(),
            factory,
            scheduler: Scheduler::new(clock, config.scheduler),
            history: CommandManager::new(),
            config,
        };
        session.sync_registry();
        let bpm = session.project.tempo().bpm();
        session.scheduler.set_tempo(&mut session.project, bpm);
        session
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn registry(&self) -> &SoundSourceRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<C> {
        &mut self.scheduler
    }

    pub fn history(&self) -> &CommandManager {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply a non-undoable edit
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Project) -> R) -> R {
        let result = f(&mut self.project);
        self.after_edit();
        result
    }

    pub fn execute(&mut self, command: Box<dyn UndoableCommand>) -> CommandResult<()> {
        let result = self.history.execute(command, &mut self.project);
        self.after_edit();
        result
    }

    pub fn undo(&mut self) -> CommandResult<String> {
        let result = self.history.undo(&mut self.project);
        self.after_edit();
        result
    }

    pub fn redo(&mut self) -> CommandResult<String> {
        let result = self.history.redo(&mut self.project);
        self.after_edit();
        result
    }

    /// Add a track (undoable); its sound source is created right away
    pub fn add_track(
        &mut self,
        name: impl Into<String>,
        track_type: TrackType,
        instrument: Option<InstrumentRef>,
    ) -> CommandResult<TrackId> {
        self.execute(Box::new(AddTrackCommand::new(name, track_type, instrument)))?;
        // New tracks are appended
        let track = self
            .project
            .tracks()
            .last()
            .ok_or(ProjectError::TrackNotFound(0))?;
        Ok(track.id)
    }

    /// Remove a track (undoable); its sound source is disposed
    pub fn remove_track(&mut self, track_id: TrackId) -> CommandResult<()> {
        self.execute(Box::new(RemoveTrackCommand::new(track_id)))
    }

    /// Create missing sources and dispose those whose track is gone or silent
    pub fn sync_registry(&mut self) {
        for track_id in self.registry.track_ids() {
            let keep = self
                .project
                .track(track_id)
                .map(|t| t.has_instrument())
                .unwrap_or(false);
            if !keep {
                self.registry.dispose(track_id);
            }
        }
        for track in self.project.tracks() {
            if track.has_instrument() && !self.registry.contains(track.id) {
                self.registry.create_for(track, self.factory.as_ref());
            }
        }
    }

    fn after_edit(&mut self) {
        self.sync_registry();
        let bpm = self.project.tempo().bpm();
        if self.scheduler.clock().rate_bpm() != bpm {
            self.scheduler.set_tempo(&mut self.project, bpm);
        }
        self.scheduler.refresh(&self.project, &self.registry);
    }

    // ---- transport ----

    pub fn play(&mut self) -> usize {
        self.sync_registry();
        self.scheduler.play(&self.project, &self.registry)
    }

    pub fn pause(&mut self) {
        self.scheduler.stop(StopMode::Pause, &self.project.time_base());
    }

    pub fn stop(&mut self) {
        self.scheduler.stop(StopMode::Rewind, &self.project.time_base());
    }

    pub fn seek(&mut self, bars: f64) {
        self.scheduler.seek(bars, &self.project, &self.registry);
    }

    /// Change tempo (not recorded in history); returns the applied BPM
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        self.scheduler.set_tempo(&mut self.project, bpm)
    }

    /// One UI frame: fire due onsets, apply pending live edits, then publish
    /// the playhead
    pub fn frame(&mut self) -> Option<f64> {
        self.scheduler.clock_mut().poll();
        self.scheduler.refresh(&self.project, &self.registry);
        self.scheduler.frame(&self.project.time_base())
    }

    // ---- generation and export ----

    /// Parse generated note JSON and insert it into the track's default clip
    pub fn import_generated(
        &mut self,
        track_id: TrackId,
        json: &str,
        options: &ImportOptions,
    ) -> Result<Vec<NoteId>, ImportError> {
        let notes = generate::parse_generated_notes(json)?;
        let (_, ids) = generate::import_into(&mut self.project, track_id, notes, options)?;
        self.after_edit();
        debug!("Generated import added {} notes to track {}", ids.len(), track_id);
        Ok(ids)
    }

    pub fn export_events(&self) -> Vec<ExportEvent> {
        export::export_events(&self.project)
    }

    /// Write the project as a MIDI file into the configured output directory
    pub fn export_midi(&self) -> Result<PathBuf, ExportError> {
        export::write_midi_file(&self.project, &self.config.export)
    }
}
