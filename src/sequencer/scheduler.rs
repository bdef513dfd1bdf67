// Scheduler - Turns the arrangement into transport clock callbacks
//
// Build pass: resolve placements, convert onsets to seconds, group chords per
// track, keep each track's onsets strictly increasing. Registration: one clock
// callback per onset group; the callback dispatches to the track's sound source.
//
// Live edits while playing are applied by a transactional rebuild on the next
// `refresh`: every pending callback is cancelled and only onsets strictly after
// the current clock position are registered again.
//
// Tempo changes during playback only update the clock rate. Callbacks already
// registered keep their timestamps, so audio drifts from the bar position
// until the next rebuild or restart.

use crate::config::SchedulerSettings;
use crate::project::{Project, TrackId};
use crate::sequencer::playhead::{Playhead, SharedPlayhead};
use crate::sequencer::resolve::resolve_project;
use crate::sequencer::timeline::TimeBase;
use crate::sequencer::transport::{TransportClock, TransportState};
use crate::sound::{SoundSource, SoundSourceRegistry, Trigger, TriggerNote, velocity_to_gain};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Notes of one track that start together
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetGroup {
    pub track_id: TrackId,
    /// Earliest onset of the group, after any monotonic nudge
    pub at_seconds: f64,
    pub notes: Vec<TriggerNote>,
}

/// Result of a build pass, ordered by time
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub groups: Vec<OnsetGroup>,
    /// Project revision the schedule was built from
    pub revision: u64,
    /// Groups moved forward to keep a track strictly increasing
    pub nudged: usize,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups_for(&self, track_id: TrackId) -> impl Iterator<Item = &OnsetGroup> {
        self.groups.iter().filter(move |g| g.track_id == track_id)
    }

    /// Total number of notes across all groups
    pub fn note_count(&self) -> usize {
        self.groups.iter().map(|g| g.notes.len()).sum()
    }
}

/// How `stop` leaves the transport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopMode {
    /// Back to bar 0
    Rewind,
    /// Keep the clock where it is; the next play resumes from here
    Pause,
    /// Park at a bar position
    At(f64),
}

/// Build the live schedule for the current project state.
///
/// Tracks without a registered sound source are skipped. Zero-length notes
/// last one snap-grid step; every duration is floored at the audible minimum.
pub fn build_schedule(
    project: &Project,
    registry: &SoundSourceRegistry,
    settings: &SchedulerSettings,
) -> Schedule {
    let settings = settings.sanitized();
    let time_base = project.time_base();
    let snap_ticks = project.snap().ticks(&time_base.time_signature);

    let mut per_track: BTreeMap<TrackId, Vec<(f64, TriggerNote)>> = BTreeMap::new();
    let mut unbound = BTreeSet::new();

    for resolved in resolve_project(project) {
        if !registry.contains(resolved.track_id) {
            if unbound.insert(resolved.track_id) {
                debug!("Track {} has no sound source, skipping", resolved.track_id);
            }
            continue;
        }
        let volume = project
            .mixer_channel(resolved.track_id)
            .map(|c| c.volume())
            .unwrap_or(0.0);
        let duration_ticks = match resolved.note.duration_ticks {
            0 => snap_ticks,
            ticks => ticks,
        };
        let note = TriggerNote {
            pitch: resolved.note.pitch,
            velocity: resolved.note.velocity,
            duration_seconds: time_base
                .ticks_to_seconds(duration_ticks)
                .max(settings.min_audible_seconds),
            gain: velocity_to_gain(resolved.note.velocity) * volume,
        };
        per_track
            .entry(resolved.track_id)
            .or_default()
            .push((time_base.ticks_to_seconds(resolved.absolute_tick), note));
    }

    let mut groups = Vec::new();
    let mut nudged = 0;
    for (track_id, mut onsets) in per_track {
        onsets.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut track_groups = group_onsets(track_id, onsets, settings.chord_epsilon_seconds);
        nudged += enforce_monotonic(&mut track_groups, settings.min_increment_seconds);
        groups.extend(track_groups);
    }
    // Stable: equal timestamps keep track order
    groups.sort_by(|a, b| a.at_seconds.total_cmp(&b.at_seconds));

    if nudged > 0 {
        debug!("Nudged {} onset group(s) to keep dispatch strictly increasing", nudged);
    }
    debug!(
        "Built schedule: {} onset groups on {} tracks (revision {})",
        groups.len(),
        registry.len(),
        project.revision()
    );

    Schedule {
        groups,
        revision: project.revision(),
        nudged,
    }
}

/// Merge time-sorted onsets lying within `epsilon` of a group's first onset
fn group_onsets(track_id: TrackId, onsets: Vec<(f64, TriggerNote)>, epsilon: f64) -> Vec<OnsetGroup> {
    let mut groups: Vec<OnsetGroup> = Vec::new();
    for (at, note) in onsets {
        match groups.last_mut() {
            Some(group) if at - group.at_seconds <= epsilon => group.notes.push(note),
            _ => groups.push(OnsetGroup {
                track_id,
                at_seconds: at,
                notes: vec![note],
            }),
        }
    }
    groups
}

/// Move every group that is not later than its predecessor to
/// `predecessor + min_increment`. Returns the number of groups moved.
pub fn enforce_monotonic(groups: &mut [OnsetGroup], min_increment: f64) -> usize {
    let mut nudged = 0;
    for i in 1..groups.len() {
        let previous = groups[i - 1].at_seconds;
        if groups[i].at_seconds <= previous {
            groups[i].at_seconds = previous + min_increment;
            nudged += 1;
        }
    }
    nudged
}

/// Hand a group to its source: one chord trigger, or one trigger per pitch
/// for sources that only take single notes.
fn dispatch(source: &dyn SoundSource, group: OnsetGroup) {
    if group.notes.len() == 1 || source.accepts_chords() {
        source.trigger(Trigger {
            track_id: group.track_id,
            at_seconds: group.at_seconds,
            notes: group.notes,
        });
    } else {
        for note in group.notes {
            source.trigger(Trigger {
                track_id: group.track_id,
                at_seconds: group.at_seconds,
                notes: vec![note],
            });
        }
    }
}

/// Live playback driver over an injected transport clock
pub struct Scheduler<C: TransportClock> {
    clock: C,
    settings: SchedulerSettings,
    state: TransportState,
    playhead: Playhead,
    /// Revision of the schedule currently registered with the clock
    built_revision: Option<u64>,
}

impl<C: TransportClock> Scheduler<C> {
    pub fn new(clock: C, settings: SchedulerSettings) -> Self {
        Self {
            clock,
            settings: settings.sanitized(),
            state: TransportState::Stopped,
            playhead: Playhead::new(),
            built_revision: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Direct clock access, e.g. to advance a `ManualClock` in tests
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn playhead(&self) -> &Playhead {
        &self.playhead
    }

    pub fn shared_playhead(&self) -> Arc<SharedPlayhead> {
        self.playhead.shared()
    }

    pub fn position_bars(&self) -> f64 {
        self.playhead.position_bars()
    }

    /// Whether the registered schedule no longer matches the project
    pub fn is_stale(&self, project: &Project) -> bool {
        self.built_revision != Some(project.revision())
    }

    /// Start playback from the playhead position.
    /// Returns the number of onset groups registered with the clock.
    pub fn play(&mut self, project: &Project, registry: &SoundSourceRegistry) -> usize {
        if self.state.is_playing() {
            return 0;
        }
        let time_base = project.time_base();
        let resuming = self.state == TransportState::Paused;
        let start = if resuming {
            self.clock.elapsed_seconds()
        } else {
            time_base.bars_to_seconds(self.playhead.position_bars())
        };

        self.clock.cancel_all();
        self.clock.set_rate(time_base.tempo.bpm());
        self.clock.seek(start);

        let schedule = build_schedule(project, registry, &self.settings);
        // Onsets at the pause point already fired before pausing
        let registered = if resuming {
            self.register(&schedule, registry, |at| at > start)
        } else {
            self.register(&schedule, registry, |at| at >= start)
        };
        self.built_revision = Some(schedule.revision);

        self.clock.start();
        self.playhead.start();
        self.state = TransportState::Playing;

        info!(
            "Playback started at {} ({:.3}s), {} onset groups registered",
            time_base.musical_time(self.playhead.position_bars()),
            start,
            registered
        );
        registered
    }

    /// Rebuild while playing if the project changed since the last build.
    /// Returns true when a rebuild happened.
    pub fn refresh(&mut self, project: &Project, registry: &SoundSourceRegistry) -> bool {
        if !self.state.is_playing() || !self.is_stale(project) {
            return false;
        }
        let now = self.clock.elapsed_seconds();
        // Anything due by `now` fires under the old schedule; the rest is re-registered
        self.clock.fire_due(now);
        self.clock.cancel_all();
        let schedule = build_schedule(project, registry, &self.settings);
        let registered = self.register(&schedule, registry, |at| at > now);
        self.built_revision = Some(schedule.revision);
        info!(
            "Schedule rebuilt at {:.3}s for revision {}, {} onset groups re-registered",
            now, schedule.revision, registered
        );
        true
    }

    fn register(
        &mut self,
        schedule: &Schedule,
        registry: &SoundSourceRegistry,
        keep: impl Fn(f64) -> bool,
    ) -> usize {
        let mut registered = 0;
        for group in schedule.groups.iter().filter(|g| keep(g.at_seconds)) {
            let Some(source) = registry.get(group.track_id) else {
                continue;
            };
            let group = group.clone();
            self.clock.schedule_at(
                group.at_seconds,
                Box::new(move |_| dispatch(source.as_ref(), group)),
            );
            registered += 1;
        }
        registered
    }

    /// Stop playback. Nothing registered so far can fire afterwards.
    /// Pausing first fires onsets that came due up to the pause point, since
    /// resuming only registers onsets after it.
    pub fn stop(&mut self, mode: StopMode, time_base: &TimeBase) {
        if mode == StopMode::Pause && self.state.is_playing() {
            self.clock.stop();
            let paused_at = self.clock.elapsed_seconds();
            self.clock.fire_due(paused_at);
        }
        self.clock.cancel_all();
        self.clock.stop();
        self.built_revision = None;

        match mode {
            StopMode::Rewind => {
                self.clock.seek(0.0);
                self.playhead.stop_at(0.0);
                self.state = TransportState::Stopped;
            }
            StopMode::Pause => {
                let bars = time_base.seconds_to_bars(self.clock.elapsed_seconds());
                self.playhead.stop_at(bars);
                if self.state.is_playing() {
                    self.state = TransportState::Paused;
                }
            }
            StopMode::At(bars) => {
                let bars = if bars.is_finite() { bars.max(0.0) } else { 0.0 };
                self.clock.seek(time_base.bars_to_seconds(bars));
                self.playhead.stop_at(bars);
                self.state = TransportState::Stopped;
            }
        }
        debug!("Playback stopped ({:?}) at bar {:.3}", mode, self.playhead.position_bars());
    }

    /// Move to a bar position; playback continues from there if it was running
    pub fn seek(&mut self, bars: f64, project: &Project, registry: &SoundSourceRegistry) {
        let was_playing = self.state.is_playing();
        self.stop(StopMode::At(bars), &project.time_base());
        if was_playing {
            self.play(project, registry);
        }
    }

    /// Change the project tempo and the clock rate; returns the applied BPM.
    /// While stopped the musical position is kept; while playing, registered
    /// onsets keep their timestamps.
    pub fn set_tempo(&mut self, project: &mut Project, bpm: f64) -> f64 {
        let applied = project.set_tempo(bpm);
        self.clock.set_rate(applied);
        if self.state.is_playing() {
            info!(
                "Tempo changed to {:.2} BPM during playback, scheduled onsets keep their timestamps",
                applied
            );
        } else {
            let seconds = project.time_base().bars_to_seconds(self.playhead.position_bars());
            self.clock.seek(seconds);
        }
        applied
    }

    /// One frame: fire due wall-clock callbacks, then publish the playhead.
    /// Returns `None` once playback is stopped.
    pub fn frame(&mut self, time_base: &TimeBase) -> Option<f64> {
        self.clock.poll();
        self.playhead.tick(&self.clock, time_base)
    }
}
