// Concrete command implementations

use crate::command::trait_def::{CommandError, CommandResult, UndoableCommand};
use crate::project::{
    ClipId, InstrumentRef, Note, NoteId, Project, RemovedNote, RemovedTrack, TrackId, TrackType,
};

/// Where an added note goes
#[derive(Debug, Clone, Copy, PartialEq)]
enum NoteTarget {
    Clip(ClipId),
    /// The track's default clip, created on first use
    Track(TrackId),
}

/// Command to add a note
///
/// Redo puts the same note (same ID, same position) back.
pub struct AddNoteCommand {
    target: NoteTarget,
    note: Note,
    added: Option<(ClipId, NoteId)>,
    removed: Option<(ClipId, RemovedNote)>,
}

impl AddNoteCommand {
    /// Add a note to an existing clip
    pub fn new(clip_id: ClipId, note: Note) -> Self {
        Self {
            target: NoteTarget::Clip(clip_id),
            note,
            added: None,
            removed: None,
        }
    }

    /// Add a note to the track's default clip, creating it if needed
    pub fn on_track(track_id: TrackId, note: Note) -> Self {
        Self {
            target: NoteTarget::Track(track_id),
            note,
            added: None,
            removed: None,
        }
    }

    /// Clip and note ID after execution
    pub fn added(&self) -> Option<(ClipId, NoteId)> {
        self.added
    }
}

impl UndoableCommand for AddNoteCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        if let Some((clip_id, removed)) = self.removed.take() {
            let note_id = removed.note.id;
            project.restore_note(clip_id, removed)?;
            self.added = Some((clip_id, note_id));
            return Ok(());
        }
        let clip_id = match self.target {
            NoteTarget::Clip(clip_id) => clip_id,
            NoteTarget::Track(track_id) => project.ensure_clip(track_id)?,
        };
        let note_id = project.add_note(clip_id, self.note)?;
        self.added = Some((clip_id, note_id));
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let (clip_id, note_id) = self
            .added
            .take()
            .ok_or_else(|| CommandError::UndoFailed("Note was never added".into()))?;
        let removed = project.remove_note(clip_id, note_id)?;
        self.removed = Some((clip_id, removed));
        Ok(())
    }

    fn description(&self) -> String {
        format!("Add Note {}", self.note.note_name())
    }
}

/// Command to remove a note
pub struct RemoveNoteCommand {
    clip_id: ClipId,
    note_id: NoteId,
    removed: Option<RemovedNote>,
}

impl RemoveNoteCommand {
    pub fn new(clip_id: ClipId, note_id: NoteId) -> Self {
        Self {
            clip_id,
            note_id,
            removed: None,
        }
    }
}

impl UndoableCommand for RemoveNoteCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        self.removed = Some(project.remove_note(self.clip_id, self.note_id)?);
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let removed = self
            .removed
            .take()
            .ok_or_else(|| CommandError::UndoFailed("No removed note stored".into()))?;
        project.restore_note(self.clip_id, removed)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Remove Note {}", self.note_id)
    }
}

/// Command to set the project tempo
pub struct SetTempoCommand {
    new_bpm: f64,
    old_bpm: Option<f64>,
}

impl SetTempoCommand {
    pub fn new(bpm: f64) -> Self {
        Self {
            new_bpm: bpm,
            old_bpm: None,
        }
    }
}

impl UndoableCommand for SetTempoCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        self.old_bpm = Some(project.tempo().bpm());
        self.new_bpm = project.set_tempo(self.new_bpm);
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let old_bpm = self
            .old_bpm
            .ok_or_else(|| CommandError::UndoFailed("No previous tempo stored".into()))?;
        project.set_tempo(old_bpm);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Set Tempo to {:.2} BPM", self.new_bpm)
    }
}

/// Command to set a track's volume (mixer channel and track display)
pub struct SetTrackVolumeCommand {
    track_id: TrackId,
    new_volume: f32,
    old_volume: Option<f32>,
}

impl SetTrackVolumeCommand {
    pub fn new(track_id: TrackId, volume: f32) -> Self {
        Self {
            track_id,
            new_volume: volume,
            old_volume: None,
        }
    }
}

impl UndoableCommand for SetTrackVolumeCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        let old = project
            .mixer_channel(self.track_id)
            .map(|c| c.volume())
            .ok_or(crate::project::ProjectError::TrackNotFound(self.track_id))?;
        self.new_volume = project.set_track_volume(self.track_id, self.new_volume)?;
        self.old_volume = Some(old);
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let old_volume = self
            .old_volume
            .ok_or_else(|| CommandError::UndoFailed("No previous volume stored".into()))?;
        project.set_track_volume(self.track_id, old_volume)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Set Track {} Volume to {:.2}", self.track_id, self.new_volume)
    }
}

/// Command to mute or unmute a track
pub struct SetTrackMuteCommand {
    track_id: TrackId,
    muted: bool,
    old_muted: Option<bool>,
}

impl SetTrackMuteCommand {
    pub fn new(track_id: TrackId, muted: bool) -> Self {
        Self {
            track_id,
            muted,
            old_muted: None,
        }
    }
}

impl UndoableCommand for SetTrackMuteCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        let old = project
            .mixer_channel(self.track_id)
            .map(|c| c.is_muted())
            .ok_or(crate::project::ProjectError::TrackNotFound(self.track_id))?;
        project.set_track_mute(self.track_id, self.muted)?;
        self.old_muted = Some(old);
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let old = self
            .old_muted
            .ok_or_else(|| CommandError::UndoFailed("No previous mute state stored".into()))?;
        project.set_track_mute(self.track_id, old)?;
        Ok(())
    }

    fn description(&self) -> String {
        let action = if self.muted { "Mute" } else { "Unmute" };
        format!("{} Track {}", action, self.track_id)
    }
}

/// Command to solo or unsolo a track
pub struct SetTrackSoloCommand {
    track_id: TrackId,
    soloed: bool,
    old_soloed: Option<bool>,
}

impl SetTrackSoloCommand {
    pub fn new(track_id: TrackId, soloed: bool) -> Self {
        Self {
            track_id,
            soloed,
            old_soloed: None,
        }
    }
}

impl UndoableCommand for SetTrackSoloCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        let old = project
            .mixer_channel(self.track_id)
            .map(|c| c.is_soloed())
            .ok_or(crate::project::ProjectError::TrackNotFound(self.track_id))?;
        project.set_track_solo(self.track_id, self.soloed)?;
        self.old_soloed = Some(old);
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let old = self
            .old_soloed
            .ok_or_else(|| CommandError::UndoFailed("No previous solo state stored".into()))?;
        project.set_track_solo(self.track_id, old)?;
        Ok(())
    }

    fn description(&self) -> String {
        let action = if self.soloed { "Solo" } else { "Unsolo" };
        format!("{} Track {}", action, self.track_id)
    }
}

/// Command to add a track
pub struct AddTrackCommand {
    name: String,
    track_type: TrackType,
    instrument: Option<InstrumentRef>,
    track_id: Option<TrackId>,
    removed: Option<RemovedTrack>,
}

impl AddTrackCommand {
    pub fn new(name: impl Into<String>, track_type: TrackType, instrument: Option<InstrumentRef>) -> Self {
        Self {
            name: name.into(),
            track_type,
            instrument,
            track_id: None,
            removed: None,
        }
    }

    pub fn track_id(&self) -> Option<TrackId> {
        self.track_id
    }
}

impl UndoableCommand for AddTrackCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        let track_id = match self.removed.take() {
            Some(removed) => {
                let id = removed.track.id;
                project.restore_track(removed);
                id
            }
            None => project.add_track(self.name.clone(), self.track_type, self.instrument.clone()),
        };
        self.track_id = Some(track_id);
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let track_id = self
            .track_id
            .ok_or_else(|| CommandError::UndoFailed("Track was never added".into()))?;
        self.removed = Some(project.remove_track(track_id)?);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Add Track {}", self.name)
    }
}

/// Command to remove a track
///
/// Undo restores the track, its mixer channel and its placements. Clip data
/// is never removed, so restored placements resolve again.
pub struct RemoveTrackCommand {
    track_id: TrackId,
    removed: Option<RemovedTrack>,
}

impl RemoveTrackCommand {
    pub fn new(track_id: TrackId) -> Self {
        Self {
            track_id,
            removed: None,
        }
    }
}

impl UndoableCommand for RemoveTrackCommand {
    fn execute(&mut self, project: &mut Project) -> CommandResult<()> {
        self.removed = Some(project.remove_track(self.track_id)?);
        Ok(())
    }

    fn undo(&mut self, project: &mut Project) -> CommandResult<()> {
        let removed = self
            .removed
            .take()
            .ok_or_else(|| CommandError::UndoFailed("No removed track stored".into()))?;
        project.restore_track(removed);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Remove Track {}", self.track_id)
    }
}
