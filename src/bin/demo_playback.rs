// Plays a small project on a manual clock and prints every trigger
// Run with: RUST_LOG=debug cargo run --bin demo_playback

use nextbeat::sound::{TriggerReceiver, create_trigger_channel};
use nextbeat::{
    ClipSource, EngineConfig, InstrumentRef, ManualClock, Note, Project, Session, SoundSource,
    SoundSourceFactory, Track, TrackType, TransportClock,
};
use std::sync::{Arc, Mutex};

/// Hands each track a ring-buffer source and keeps the receiving ends
#[derive(Default)]
struct ChannelFactory {
    receivers: Arc<Mutex<Vec<(String, TriggerReceiver)>>>,
}

impl SoundSourceFactory for ChannelFactory {
    fn create(&self, track: &Track) -> Option<Arc<dyn SoundSource>> {
        track.instrument.as_ref()?;
        let (source, receiver) = create_trigger_channel(256);
        let mut receivers = self.receivers.lock().ok()?;
        receivers.push((track.name.clone(), receiver));
        Some(Arc::new(source))
    }
}

fn build_project() -> Result<Project, Box<dyn std::error::Error>> {
    let mut project = Project::new("Demo Playback");
    project.set_tempo(120.0);

    let keys = project.add_track("Keys", TrackType::Instrument, Some(InstrumentRef::new("piano")));
    let clip = project.ensure_clip(keys)?;
    // C major chord on beat 1, then a melody
    project.add_notes(clip, [60, 64, 67].map(|p| Note::new(p, 0, 960, 96)))?;
    project.add_notes(
        clip,
        [(72, 960), (71, 1200), (69, 1440), (67, 1680)].map(|(p, t)| Note::new(p, t, 240, 88)),
    )?;

    let drums = project.add_track("Drums", TrackType::Drums, Some(InstrumentRef::new("kit")));
    let pattern = project.create_pattern("Four on the floor", 16);
    let kick = project.add_pattern_row(pattern, 36, 110)?;
    let hat = project.add_pattern_row(pattern, 42, 70)?;
    for step in 0..16 {
        project.set_pattern_step(pattern, kick, step, step % 4 == 0)?;
        project.set_pattern_step(pattern, hat, step, step % 2 == 1)?;
    }
    project.place(drums, ClipSource::Pattern(pattern), 0, 2)?;

    Ok(project)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let factory = ChannelFactory::default();
    let receivers = Arc::clone(&factory.receivers);
    let mut session = Session::new(
        build_project()?,
        ManualClock::new(),
        Box::new(factory),
        EngineConfig::default(),
    );

    println!("NextBeat - Playback Demo");
    println!("========================");
    println!(
        "Project: {} at {:.0} BPM, {} tracks",
        session.project().title(),
        session.project().tempo().bpm(),
        session.project().tracks().len()
    );

    let registered = session.play();
    println!("Registered {} onset groups\n", registered);

    // 60 frames per second for four seconds (two bars)
    let frame = 1.0 / 60.0;
    for _ in 0..240 {
        session.scheduler_mut().clock_mut().advance(frame);
        let bars = session.frame().unwrap_or(0.0);

        let mut receivers = receivers.lock().map_err(|_| "receiver lock poisoned")?;
        for (name, receiver) in receivers.iter_mut() {
            for trigger in receiver.drain() {
                println!(
                    "{:>7.3}s  {}  {:<6} {:?}",
                    trigger.at_seconds,
                    session.project().time_base().musical_time(bars),
                    name,
                    trigger.pitches()
                );
            }
        }
    }

    session.stop();
    println!(
        "\nStopped at {:.3}s, {} callbacks pending",
        session.scheduler().clock().elapsed_seconds(),
        session.scheduler().clock().pending()
    );
    Ok(())
}
