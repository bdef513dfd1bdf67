// Project - Root of the timeline model
//
// The project exclusively owns every track, mixer channel, clip, pattern and
// placement. All edits go through its methods, which clamp numeric input and
// bump the content revision the scheduler uses to detect stale schedules.

use crate::project::ProjectError;
use crate::project::arrangement::{ArrangementClip, ClipSource, PlacementId};
use crate::project::clip::{ClipId, DEFAULT_CLIP_BARS, MidiClip};
use crate::project::note::{Note, NoteId};
use crate::project::pattern::{Pattern, PatternId};
use crate::project::track::{
    InstrumentRef, MixerChannel, Track, TrackId, TrackType, clamp_pan, clamp_volume,
};
use crate::sequencer::timeline::{SnapGrid, Tempo, TimeBase, TimeSignature};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Project title; also names exported files
    pub title: String,
    /// Creation timestamp (RFC 3339)
    pub created: String,
    /// Last modification timestamp (RFC 3339)
    pub modified: String,
    pub author: Option<String>,
}

/// Everything `remove_track` took out, so the removal can be undone
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedTrack {
    pub index: usize,
    pub track: Track,
    pub mixer_channel: MixerChannel,
    /// Placements with their former indices, in ascending index order
    pub placements: Vec<(usize, ArrangementClip)>,
    pub default_clip: Option<ClipId>,
}

/// A note taken out of a clip, with its former position in insertion order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovedNote {
    pub index: usize,
    pub note: Note,
}

/// Main project structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub metadata: ProjectMetadata,
    tempo: Tempo,
    time_signature: TimeSignature,
    snap: SnapGrid,
    tracks: Vec<Track>,
    mixer: BTreeMap<TrackId, MixerChannel>,
    clips: BTreeMap<ClipId, MidiClip>,
    patterns: BTreeMap<PatternId, Pattern>,
    arrangement: Vec<ArrangementClip>,
    /// Clip created by `ensure_clip`, keyed by track
    default_clips: BTreeMap<TrackId, ClipId>,
    next_id: u64,
    #[serde(skip)]
    revision: u64,
}

impl Project {
    /// Create a new empty project (120 BPM, 4/4, sixteenth grid)
    pub fn new(title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4(),
            metadata: ProjectMetadata {
                title: title.into(),
                created: now.clone(),
                modified: now,
                author: None,
            },
            tempo: Tempo::default(),
            time_signature: TimeSignature::default(),
            snap: SnapGrid::default(),
            tracks: Vec::new(),
            mixer: BTreeMap::new(),
            clips: BTreeMap::new(),
            patterns: BTreeMap::new(),
            arrangement: Vec::new(),
            default_clips: BTreeMap::new(),
            next_id: 1,
            revision: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Content revision; changes whenever playable data changes.
    /// Tempo changes do not bump it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn touch(&mut self) {
        self.metadata.modified = chrono::Utc::now().to_rfc3339();
    }

    fn content_changed(&mut self) {
        self.revision += 1;
        self.touch();
    }

    // ---- tempo / signature / grid ----

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Set the tempo (clamped); returns the applied BPM
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        self.tempo = Tempo::new(bpm);
        self.touch();
        self.tempo.bpm()
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
        self.content_changed();
    }

    pub fn snap(&self) -> SnapGrid {
        self.snap
    }

    pub fn set_snap(&mut self, snap: SnapGrid) {
        self.snap = snap;
        self.content_changed();
    }

    /// Conversion context built from the current tempo and signature
    pub fn time_base(&self) -> TimeBase {
        TimeBase::new(self.tempo, self.time_signature)
    }

    // ---- tracks and mixer ----

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn track_index(&self, track_id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    fn track_mut(&mut self, track_id: TrackId) -> Result<&mut Track, ProjectError> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or(ProjectError::TrackNotFound(track_id))
    }

    fn mixer_mut(&mut self, track_id: TrackId) -> Result<&mut MixerChannel, ProjectError> {
        self.mixer
            .get_mut(&track_id)
            .ok_or(ProjectError::TrackNotFound(track_id))
    }

    /// Add a track; its mixer channel is created alongside it
    pub fn add_track(
        &mut self,
        name: impl Into<String>,
        track_type: TrackType,
        instrument: Option<InstrumentRef>,
    ) -> TrackId {
        let id = self.allocate_id();
        let track = Track::new(id, name.into(), track_type, instrument);
        self.mixer.insert(id, MixerChannel::for_track(&track));
        self.tracks.push(track);
        self.content_changed();
        id
    }

    pub fn set_track_instrument(
        &mut self,
        track_id: TrackId,
        instrument: Option<InstrumentRef>,
    ) -> Result<(), ProjectError> {
        self.track_mut(track_id)?.instrument = instrument;
        self.content_changed();
        Ok(())
    }

    pub fn set_track_armed(&mut self, track_id: TrackId, armed: bool) -> Result<(), ProjectError> {
        self.track_mut(track_id)?.armed = armed;
        self.touch();
        Ok(())
    }

    pub fn rename_track(&mut self, track_id: TrackId, name: impl Into<String>) -> Result<(), ProjectError> {
        self.track_mut(track_id)?.name = name.into();
        self.touch();
        Ok(())
    }

    pub fn mixer_channel(&self, track_id: TrackId) -> Option<&MixerChannel> {
        self.mixer.get(&track_id)
    }

    pub fn mixer_channels(&self) -> impl Iterator<Item = &MixerChannel> {
        self.mixer.values()
    }

    /// Set volume on the mixer channel and mirror it on the track.
    /// Returns the applied (clamped) value.
    pub fn set_track_volume(&mut self, track_id: TrackId, volume: f32) -> Result<f32, ProjectError> {
        let volume = clamp_volume(volume);
        self.mixer_mut(track_id)?.volume = volume;
        self.track_mut(track_id)?.volume = volume;
        self.content_changed();
        Ok(volume)
    }

    pub fn set_track_pan(&mut self, track_id: TrackId, pan: f32) -> Result<f32, ProjectError> {
        let pan = clamp_pan(pan);
        self.mixer_mut(track_id)?.pan = pan;
        self.track_mut(track_id)?.pan = pan;
        self.content_changed();
        Ok(pan)
    }

    pub fn set_track_mute(&mut self, track_id: TrackId, muted: bool) -> Result<(), ProjectError> {
        self.mixer_mut(track_id)?.muted = muted;
        self.track_mut(track_id)?.muted = muted;
        self.content_changed();
        Ok(())
    }

    pub fn set_track_solo(&mut self, track_id: TrackId, soloed: bool) -> Result<(), ProjectError> {
        self.mixer_mut(track_id)?.soloed = soloed;
        self.track_mut(track_id)?.soloed = soloed;
        self.content_changed();
        Ok(())
    }

    /// Whether the mixer lets this track through: not muted, and either
    /// nothing is soloed or this track is.
    pub fn is_audible(&self, track_id: TrackId) -> bool {
        let Some(channel) = self.mixer.get(&track_id) else {
            return false;
        };
        let any_solo = self.mixer.values().any(|c| c.soloed);
        !channel.muted && (!any_solo || channel.soloed)
    }

    /// Delete a track with its mixer channel and placements.
    /// Clip and pattern data stay in the project.
    pub fn remove_track(&mut self, track_id: TrackId) -> Result<RemovedTrack, ProjectError> {
        let index = self
            .track_index(track_id)
            .ok_or(ProjectError::TrackNotFound(track_id))?;
        let track = self.tracks.remove(index);
        let mixer_channel = self
            .mixer
            .remove(&track_id)
            .unwrap_or_else(|| MixerChannel::for_track(&track));

        let mut placements = Vec::new();
        let mut kept = Vec::with_capacity(self.arrangement.len());
        for (i, placement) in self.arrangement.drain(..).enumerate() {
            if placement.track_id == track_id {
                placements.push((i, placement));
            } else {
                kept.push(placement);
            }
        }
        self.arrangement = kept;
        let default_clip = self.default_clips.remove(&track_id);

        debug!(
            "Removed track {} ({} placements, clip data retained)",
            track_id,
            placements.len()
        );
        self.content_changed();

        Ok(RemovedTrack {
            index,
            track,
            mixer_channel,
            placements,
            default_clip,
        })
    }

    /// Put back a track taken out by `remove_track`
    pub fn restore_track(&mut self, removed: RemovedTrack) {
        let track_id = removed.track.id;
        let index = removed.index.min(self.tracks.len());
        self.tracks.insert(index, removed.track);
        self.mixer.insert(track_id, removed.mixer_channel);
        for (i, placement) in removed.placements {
            let i = i.min(self.arrangement.len());
            self.arrangement.insert(i, placement);
        }
        if let Some(clip_id) = removed.default_clip {
            self.default_clips.insert(track_id, clip_id);
        }
        self.content_changed();
    }

    // ---- clips and notes ----

    pub fn midi_clip(&self, clip_id: ClipId) -> Option<&MidiClip> {
        self.clips.get(&clip_id)
    }

    pub fn midi_clips(&self) -> impl Iterator<Item = &MidiClip> {
        self.clips.values()
    }

    fn clip_mut(&mut self, clip_id: ClipId) -> Result<&mut MidiClip, ProjectError> {
        self.clips
            .get_mut(&clip_id)
            .ok_or(ProjectError::ClipNotFound(clip_id))
    }

    /// Create an empty MIDI clip owned by a track (not yet placed)
    pub fn create_clip(
        &mut self,
        track_id: TrackId,
        name: impl Into<String>,
        start_bar: u32,
        length_bars: u32,
    ) -> Result<ClipId, ProjectError> {
        if self.track(track_id).is_none() {
            return Err(ProjectError::TrackNotFound(track_id));
        }
        let id = self.allocate_id();
        self.clips
            .insert(id, MidiClip::new(id, track_id, name.into(), start_bar, length_bars));
        self.content_changed();
        Ok(id)
    }

    /// Return the track's default clip, creating and placing it on first use.
    /// Idempotent per track.
    pub fn ensure_clip(&mut self, track_id: TrackId) -> Result<ClipId, ProjectError> {
        if let Some(clip_id) = self.default_clips.get(&track_id) {
            if self.clips.contains_key(clip_id) {
                return Ok(*clip_id);
            }
        }
        let name = match self.track(track_id) {
            Some(track) => format!("{} Clip", track.name),
            None => return Err(ProjectError::TrackNotFound(track_id)),
        };
        let clip_id = self.create_clip(track_id, name, 0, DEFAULT_CLIP_BARS)?;
        self.place(track_id, ClipSource::Midi(clip_id), 0, DEFAULT_CLIP_BARS)?;
        self.default_clips.insert(track_id, clip_id);
        debug!("Created default clip {} for track {}", clip_id, track_id);
        Ok(clip_id)
    }

    /// Insert a note at the end of the clip's insertion order; returns its new ID
    pub fn add_note(&mut self, clip_id: ClipId, note: Note) -> Result<NoteId, ProjectError> {
        if !self.clips.contains_key(&clip_id) {
            return Err(ProjectError::ClipNotFound(clip_id));
        }
        let id = self.allocate_id();
        self.clip_mut(clip_id)?.push_note(Note { id, ..note });
        self.content_changed();
        Ok(id)
    }

    pub fn add_notes(
        &mut self,
        clip_id: ClipId,
        notes: impl IntoIterator<Item = Note>,
    ) -> Result<Vec<NoteId>, ProjectError> {
        notes
            .into_iter()
            .map(|note| self.add_note(clip_id, note))
            .collect()
    }

    pub fn remove_note(&mut self, clip_id: ClipId, note_id: NoteId) -> Result<RemovedNote, ProjectError> {
        let (index, note) = self
            .clip_mut(clip_id)?
            .remove_note(note_id)
            .ok_or(ProjectError::NoteNotFound(note_id))?;
        self.content_changed();
        Ok(RemovedNote { index, note })
    }

    /// Put back a note taken out by `remove_note`, keeping its ID
    pub fn restore_note(&mut self, clip_id: ClipId, removed: RemovedNote) -> Result<(), ProjectError> {
        self.clip_mut(clip_id)?.insert_note_at(removed.index, removed.note);
        self.content_changed();
        Ok(())
    }

    pub fn clear_clip(&mut self, clip_id: ClipId) -> Result<(), ProjectError> {
        self.clip_mut(clip_id)?.clear();
        self.content_changed();
        Ok(())
    }

    // ---- patterns ----

    pub fn pattern(&self, pattern_id: PatternId) -> Option<&Pattern> {
        self.patterns.get(&pattern_id)
    }

    fn pattern_mut(&mut self, pattern_id: PatternId) -> Result<&mut Pattern, ProjectError> {
        self.patterns
            .get_mut(&pattern_id)
            .ok_or(ProjectError::PatternNotFound(pattern_id))
    }

    pub fn create_pattern(&mut self, name: impl Into<String>, step_count: usize) -> PatternId {
        let id = self.allocate_id();
        self.patterns.insert(id, Pattern::new(id, name.into(), step_count));
        self.content_changed();
        id
    }

    pub fn add_pattern_row(
        &mut self,
        pattern_id: PatternId,
        pitch: i32,
        velocity: i32,
    ) -> Result<usize, ProjectError> {
        let row = self.pattern_mut(pattern_id)?.add_row(pitch, velocity);
        self.content_changed();
        Ok(row)
    }

    /// Toggle one grid cell; returns false when the row/step is out of range
    pub fn set_pattern_step(
        &mut self,
        pattern_id: PatternId,
        row: usize,
        step: usize,
        on: bool,
    ) -> Result<bool, ProjectError> {
        let changed = self.pattern_mut(pattern_id)?.set_step(row, step, on);
        if changed {
            self.content_changed();
        }
        Ok(changed)
    }

    // ---- arrangement ----

    pub fn placements(&self) -> &[ArrangementClip] {
        &self.arrangement
    }

    fn source_exists(&self, source: ClipSource) -> bool {
        match source {
            ClipSource::Midi(id) => self.clips.contains_key(&id),
            ClipSource::Pattern(id) => self.patterns.contains_key(&id),
        }
    }

    /// Place clip data on a track's timeline
    pub fn place(
        &mut self,
        track_id: TrackId,
        source: ClipSource,
        start_bar: u32,
        length_bars: u32,
    ) -> Result<PlacementId, ProjectError> {
        if self.track(track_id).is_none() {
            return Err(ProjectError::TrackNotFound(track_id));
        }
        if !self.source_exists(source) {
            return Err(ProjectError::SourceNotFound(source));
        }
        let id = self.allocate_id();
        self.arrangement.push(ArrangementClip {
            id,
            track_id,
            source,
            start_bar,
            length_bars: length_bars.max(1),
        });
        self.content_changed();
        Ok(id)
    }

    pub fn remove_placement(&mut self, placement_id: PlacementId) -> Result<ArrangementClip, ProjectError> {
        let index = self
            .arrangement
            .iter()
            .position(|p| p.id == placement_id)
            .ok_or(ProjectError::PlacementNotFound(placement_id))?;
        let placement = self.arrangement.remove(index);
        self.content_changed();
        Ok(placement)
    }

    /// Delete clip or pattern data. Placements that still reference it are
    /// left in place and skipped by playback and export.
    pub fn remove_clip_data(&mut self, source: ClipSource) -> Result<(), ProjectError> {
        let removed = match source {
            ClipSource::Midi(id) => self.clips.remove(&id).is_some(),
            ClipSource::Pattern(id) => self.patterns.remove(&id).is_some(),
        };
        if !removed {
            return Err(ProjectError::SourceNotFound(source));
        }
        if let ClipSource::Midi(id) = source {
            self.default_clips.retain(|_, clip_id| *clip_id != id);
        }
        self.content_changed();
        Ok(())
    }

    /// Clip and pattern data that no placement references
    pub fn orphaned_clip_data(&self) -> Vec<ClipSource> {
        let referenced: BTreeSet<ClipSource> = self.arrangement.iter().map(|p| p.source).collect();
        self.clips
            .keys()
            .map(|id| ClipSource::Midi(*id))
            .chain(self.patterns.keys().map(|id| ClipSource::Pattern(*id)))
            .filter(|source| !referenced.contains(source))
            .collect()
    }

    /// Delete every orphan; returns how many were removed.
    /// Never called implicitly: orphans are kept so undo can re-place them.
    pub fn purge_orphans(&mut self) -> usize {
        let orphans = self.orphaned_clip_data();
        for source in &orphans {
            match source {
                ClipSource::Midi(id) => {
                    self.clips.remove(id);
                    self.default_clips.retain(|_, clip_id| clip_id != id);
                }
                ClipSource::Pattern(id) => {
                    self.patterns.remove(id);
                }
            }
        }
        if !orphans.is_empty() {
            debug!("Purged {} orphaned clip data entries", orphans.len());
            self.content_changed();
        }
        orphans.len()
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled Project")
    }
}
