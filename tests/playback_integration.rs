//! Live playback tests
//!
//! Drives the scheduler with a `ManualClock` so every trigger can be checked
//! against its exact timestamp.

use nextbeat::config::SchedulerSettings;
use nextbeat::project::TrackId;
use nextbeat::{
    InstrumentRef, ManualClock, Note, Project, Scheduler, SoundSource, SoundSourceRegistry,
    StopMode, SystemClock, TrackType, TransportClock, TransportState, Trigger,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Sound source that records every trigger it receives
#[derive(Default)]
struct Recorder {
    triggers: Mutex<Vec<Trigger>>,
    single_notes_only: bool,
}

impl Recorder {
    fn single_notes() -> Self {
        Self {
            single_notes_only: true,
            ..Self::default()
        }
    }

    fn times(&self) -> Vec<f64> {
        self.triggers.lock().unwrap().iter().map(|t| t.at_seconds).collect()
    }

    fn count(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }
}

impl SoundSource for Recorder {
    fn trigger(&self, trigger: Trigger) {
        self.triggers.lock().unwrap().push(trigger);
    }

    fn accepts_chords(&self) -> bool {
        !self.single_notes_only
    }
}

struct Rig {
    project: Project,
    registry: SoundSourceRegistry,
    scheduler: Scheduler<ManualClock>,
    track: TrackId,
    recorder: Arc<Recorder>,
}

impl Rig {
    /// One 120 BPM 4/4 track with the given notes in its default clip
    fn with_notes(notes: &[(i32, i64, i64)]) -> Self {
        Self::build(notes, Recorder::default())
    }

    fn build(notes: &[(i32, i64, i64)], recorder: Recorder) -> Self {
        let mut project = Project::new("Playback");
        let track = project.add_track("Keys", TrackType::Instrument, Some(InstrumentRef::new("piano")));
        let clip = project.ensure_clip(track).unwrap();
        project
            .add_notes(clip, notes.iter().map(|&(p, t, d)| Note::new(p, t, d, 100)))
            .unwrap();

        let recorder = Arc::new(recorder);
        let mut registry = SoundSourceRegistry::new();
        registry.register(track, recorder.clone());

        Self {
            project,
            registry,
            scheduler: Scheduler::new(ManualClock::new(), SchedulerSettings::default()),
            track,
            recorder,
        }
    }

    fn play(&mut self) -> usize {
        self.scheduler.play(&self.project, &self.registry)
    }

    fn advance(&mut self, seconds: f64) {
        self.scheduler.clock_mut().advance(seconds);
    }

    fn refresh(&mut self) -> bool {
        self.scheduler.refresh(&self.project, &self.registry)
    }
}

#[test]
fn test_quarter_note_fires_at_zero() {
    let mut rig = Rig::with_notes(&[(60, 0, 480)]);
    assert_eq!(rig.play(), 1);
    rig.advance(0.1);

    let triggers = rig.recorder.triggers.lock().unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].at_seconds, 0.0);
    assert_eq!(triggers[0].pitches(), vec![60]);
    assert!((triggers[0].notes[0].duration_seconds - 0.5).abs() < 1e-9);
}

#[test]
fn test_chord_arrives_as_one_trigger() {
    let mut rig = Rig::with_notes(&[(60, 1920, 480), (64, 1920, 480), (67, 1920, 240)]);
    rig.play();
    rig.advance(3.0);

    let triggers = rig.recorder.triggers.lock().unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].at_seconds, 2.0);
    assert!(triggers[0].is_chord());
    assert_eq!(triggers[0].pitches(), vec![60, 64, 67]);
    // Per-pitch durations survive grouping
    assert!((triggers[0].notes[2].duration_seconds - 0.25).abs() < 1e-9);
}

#[test]
fn test_chord_split_for_single_note_sources() {
    let mut rig = Rig::build(&[(60, 1920, 480), (64, 1920, 480), (67, 1920, 480)], Recorder::single_notes());
    rig.play();
    rig.advance(3.0);

    let triggers = rig.recorder.triggers.lock().unwrap();
    assert_eq!(triggers.len(), 3);
    assert!(triggers.iter().all(|t| t.at_seconds == 2.0 && !t.is_chord()));
}

#[test]
fn test_mute_during_playback_silences_later_notes() {
    let mut rig = Rig::with_notes(&[(60, 0, 480), (62, 1920, 480), (64, 3840, 480)]);
    rig.play();
    rig.advance(1.0);
    assert_eq!(rig.recorder.count(), 1);

    rig.project.set_track_mute(rig.track, true).unwrap();
    assert!(rig.refresh());
    rig.advance(10.0);
    assert_eq!(rig.recorder.count(), 1);

    // Unmuting brings the remaining notes back
    rig.project.set_track_mute(rig.track, false).unwrap();
    rig.scheduler.stop(StopMode::Rewind, &rig.project.time_base());
    rig.play();
    rig.advance(10.0);
    assert_eq!(rig.recorder.count(), 4);
}

#[test]
fn test_stop_right_after_start_fires_nothing() {
    let mut rig = Rig::with_notes(&[(60, 0, 480), (62, 480, 480)]);
    rig.play();
    rig.scheduler.stop(StopMode::Rewind, &rig.project.time_base());

    assert_eq!(rig.scheduler.clock().pending(), 0);
    assert_eq!(rig.scheduler.state(), TransportState::Stopped);

    // Even a running clock has nothing left to fire
    rig.scheduler.clock_mut().start();
    rig.advance(5.0);
    assert_eq!(rig.recorder.count(), 0);
}

#[test]
fn test_pause_and_resume_without_double_fire() {
    let mut rig = Rig::with_notes(&[(60, 0, 240), (62, 480, 240), (64, 960, 240)]);
    rig.play();
    // Pause lands exactly on the second onset
    rig.advance(0.5);
    assert_eq!(rig.recorder.times(), vec![0.0, 0.5]);

    rig.scheduler.stop(StopMode::Pause, &rig.project.time_base());
    assert_eq!(rig.scheduler.state(), TransportState::Paused);
    assert!((rig.scheduler.position_bars() - 0.25).abs() < 1e-9);

    rig.play();
    rig.advance(2.0);
    assert_eq!(rig.recorder.times(), vec![0.0, 0.5, 1.0]);
}

#[test]
fn test_tempo_change_keeps_registered_timestamps() {
    let mut rig = Rig::with_notes(&[(60, 0, 480), (62, 1920, 480), (64, 3840, 480), (65, 5760, 480)]);
    rig.play();
    rig.advance(0.5);

    let applied = rig.scheduler.set_tempo(&mut rig.project, 60.0);
    assert_eq!(applied, 60.0);
    assert_eq!(rig.scheduler.clock().rate_bpm(), 60.0);
    // Tempo alone does not invalidate the schedule
    assert!(!rig.refresh());

    rig.advance(10.0);
    assert_eq!(rig.recorder.times(), vec![0.0, 2.0, 4.0, 6.0]);
}

#[test]
fn test_rebuild_does_not_double_fire() {
    let mut rig = Rig::with_notes(&[(60, 0, 480), (62, 1920, 480)]);
    rig.play();
    rig.advance(1.0);

    let clip = rig.project.ensure_clip(rig.track).unwrap();
    rig.project.add_note(clip, Note::new(67, 3840, 480, 100)).unwrap();
    assert!(rig.scheduler.is_stale(&rig.project));
    assert!(rig.refresh());
    assert!(!rig.refresh());

    rig.advance(10.0);
    assert_eq!(rig.recorder.times(), vec![0.0, 2.0, 4.0]);
}

#[test]
fn test_edit_before_playhead_is_not_played() {
    let mut rig = Rig::with_notes(&[(60, 0, 480), (62, 3840, 480)]);
    rig.play();
    rig.advance(3.0);

    let clip = rig.project.ensure_clip(rig.track).unwrap();
    rig.project.add_note(clip, Note::new(48, 960, 480, 100)).unwrap();
    rig.refresh();
    rig.advance(5.0);
    assert_eq!(rig.recorder.times(), vec![0.0, 4.0]);
}

#[test]
fn test_seek_while_playing_restarts_from_position() {
    let mut rig = Rig::with_notes(&[(60, 0, 480), (62, 1920, 480), (64, 3840, 480)]);
    rig.play();
    rig.advance(0.5);

    rig.scheduler.seek(1.5, &rig.project, &rig.registry);
    assert!(rig.scheduler.is_playing());
    assert_eq!(rig.scheduler.clock().elapsed_seconds(), 3.0);

    rig.advance(5.0);
    assert_eq!(rig.recorder.times(), vec![0.0, 4.0]);
}

#[test]
fn test_frame_publishes_playhead() {
    let mut rig = Rig::with_notes(&[(60, 0, 480)]);
    let shared = rig.scheduler.shared_playhead();
    let time_base = rig.project.time_base();

    assert_eq!(rig.scheduler.frame(&time_base), None);
    rig.play();
    rig.advance(1.0);
    assert_eq!(rig.scheduler.frame(&time_base), Some(0.5));
    assert_eq!(shared.position_bars(), 0.5);
    assert!(shared.is_playing());

    rig.scheduler.stop(StopMode::At(2.0), &time_base);
    assert_eq!(rig.scheduler.frame(&time_base), None);
    assert_eq!(shared.position_bars(), 2.0);
    assert!(!shared.is_playing());
}

#[test]
fn test_play_from_parked_position() {
    let mut rig = Rig::with_notes(&[(60, 0, 480), (62, 1920, 480), (64, 3840, 480)]);
    rig.scheduler.stop(StopMode::At(1.0), &rig.project.time_base());

    // Onset exactly at the start position is included
    assert_eq!(rig.play(), 2);
    rig.advance(5.0);
    assert_eq!(rig.recorder.times(), vec![2.0, 4.0]);
}

#[test]
fn test_gain_follows_velocity_and_volume() {
    let mut rig = Rig::with_notes(&[(60, 0, 480)]);
    rig.project.set_track_volume(rig.track, 0.5).unwrap();
    rig.play();
    rig.advance(0.1);

    let triggers = rig.recorder.triggers.lock().unwrap();
    let expected = 100.0 / 127.0 * 0.5;
    assert!((triggers[0].notes[0].gain - expected).abs() < 1e-6);
}

/// Wall-clock scheduler with one note at tick 24 (25 ms at 120 BPM)
fn wall_clock_rig() -> (Project, SoundSourceRegistry, Scheduler<SystemClock>, TrackId, Arc<Recorder>) {
    let mut project = Project::new("Wall clock");
    let track = project.add_track("Keys", TrackType::Instrument, Some(InstrumentRef::new("piano")));
    let clip = project.ensure_clip(track).unwrap();
    project.add_note(clip, Note::new(60, 24, 240, 100)).unwrap();

    let recorder = Arc::new(Recorder::default());
    let mut registry = SoundSourceRegistry::new();
    registry.register(track, recorder.clone());
    let scheduler = Scheduler::new(SystemClock::new(), SchedulerSettings::default());
    (project, registry, scheduler, track, recorder)
}

#[test]
fn test_rebuild_fires_onsets_due_since_last_poll() {
    let (mut project, registry, mut scheduler, track, recorder) = wall_clock_rig();
    scheduler.play(&project, &registry);
    // The onset comes due without any poll
    thread::sleep(Duration::from_millis(60));

    let clip = project.ensure_clip(track).unwrap();
    project.add_note(clip, Note::new(72, 7680, 240, 100)).unwrap();
    assert!(scheduler.refresh(&project, &registry));
    let times = recorder.times();
    assert_eq!(times.len(), 1);
    assert!((times[0] - 0.025).abs() < 1e-9);

    scheduler.frame(&project.time_base());
    assert_eq!(recorder.count(), 1);
    // Only the far note is still pending
    assert_eq!(scheduler.clock().pending(), 1);
    scheduler.stop(StopMode::Rewind, &project.time_base());
}

#[test]
fn test_pause_fires_onsets_due_since_last_poll() {
    let (project, registry, mut scheduler, _track, recorder) = wall_clock_rig();
    scheduler.play(&project, &registry);
    thread::sleep(Duration::from_millis(60));

    scheduler.stop(StopMode::Pause, &project.time_base());
    assert_eq!(recorder.count(), 1);
    assert_eq!(scheduler.state(), TransportState::Paused);

    // Resuming past the onset does not play it again
    assert_eq!(scheduler.play(&project, &registry), 0);
    scheduler.frame(&project.time_base());
    assert_eq!(recorder.count(), 1);
    scheduler.stop(StopMode::Rewind, &project.time_base());
}
