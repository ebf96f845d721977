// Drives the library the way the shell does: Middle turns edits into commands, the Engine renders.

use std::time::Duration;

use endless_ambient::audio::frame::{self, StereoFrame};
use endless_ambient::audio::{AudioSystem, BuildContext, Engine};
use endless_ambient::audio_api::AudioCommand;
use endless_ambient::field::{FieldRecordings, NoKeepAlive};
use endless_ambient::middle::Middle;
use endless_ambient::music::SequenceRandom;
use endless_ambient::pipeline::persistence;
use endless_ambient::shared::{InstrumentRole, InstrumentState};

const SR: u32 = 8_000;

fn engine() -> Engine {
    let sys = AudioSystem::initialize(0.7, &BuildContext { sample_rate: SR, seed: 42 }).unwrap();
    Engine::new(Some(sys), SR, Box::new(SequenceRandom::new([0.1, 0.6, 0.5, 0.9, 0.3])))
}

fn middle() -> Middle {
    let mut m = Middle::new(Box::new(FieldRecordings::new(SR)), Box::new(NoKeepAlive));
    m.set_audio_ready(true);
    m
}

fn only(m: &mut Middle, roles: &[InstrumentRole]) {
    for role in InstrumentRole::SYNTHESIZED {
        if m.instrument(role).active != roles.contains(&role) {
            m.toggle_instrument(role);
        }
    }
}

fn send(e: &mut Engine, cmds: Vec<AudioCommand>) {
    for cmd in cmds {
        e.handle_cmd(cmd);
    }
}

fn run(e: &mut Engine, seconds: f64) -> Vec<StereoFrame> {
    let mut out = vec![StereoFrame::zero(); (seconds * SR as f64) as usize];
    for block in out.chunks_mut(256) {
        e.render_block(block);
    }
    out
}

#[test]
fn lydian_pad_and_bass_start_two_staggered_loops() {
    let mut m = middle();
    let mut e = engine();
    only(&mut m, &[InstrumentRole::Pad, InstrumentRole::Bass]);
    assert_eq!(m.mood(), "Lydian");
    assert_eq!(m.tempo(), 60.0);

    send(&mut e, m.play());
    assert_eq!(e.loop_count(), 2);
    assert_eq!(e.scheduler().loop_roles(), [InstrumentRole::Pad, InstrumentRole::Bass]);
    assert_eq!(e.transport().bpm(), 60.0);
    let now = e.clock();
    assert_eq!(e.scheduler().first_fire(InstrumentRole::Bass), Some(now));
    assert_eq!(e.scheduler().first_fire(InstrumentRole::Pad), Some(now + 2_400));
}

#[test]
fn stopping_twice_is_harmless() {
    let mut m = middle();
    let mut e = engine();
    send(&mut e, m.play());
    run(&mut e, 0.5);
    send(&mut e, m.pause());
    send(&mut e, m.pause());
    assert_eq!(e.loop_count(), 0);
    assert_eq!(e.scheduler().pending_len(), 0);
    assert!(!e.transport().is_running());

    // nothing from before the stop fires afterwards
    run(&mut e, 2.0);
    assert!(InstrumentRole::SYNTHESIZED.iter().all(|r| e.scheduler().firings(*r) == 0));
}

#[test]
fn mood_changes_never_mix_moods() {
    let mut m = middle();
    let mut e = engine();
    send(&mut e, m.play());
    for mood in ["Dorian", "Whole Tone", "Phrygian", "Lydian"] {
        run(&mut e, 0.7);
        send(&mut e, m.set_mood(mood));
        assert_eq!(e.scheduler().loop_moods(), [mood]);
        assert_eq!(e.loop_count(), 4);
        assert!(e.transport().is_running());
    }
}

#[test]
fn bass_never_stacks_notes() {
    let mut m = middle();
    let mut e = engine();
    only(&mut m, &[InstrumentRole::Bass]);
    send(&mut e, m.play());
    send(&mut e, m.set_tempo(120.0));
    for _ in 0..40 {
        run(&mut e, 0.25);
        let bass = e.system().and_then(|s| s.voice(InstrumentRole::Bass)).unwrap();
        assert_eq!(bass.polyphony(), 1);
        assert!(bass.active_voices() <= 1);
    }
    assert!(e.scheduler().firings(InstrumentRole::Bass) >= 2);
}

#[test]
fn volume_on_an_inactive_role_makes_no_loop_and_no_sound() {
    let mut m = middle();
    let mut e = engine();
    only(&mut m, &[]);
    send(&mut e, m.play());
    send(&mut e, m.set_instrument_volume(InstrumentRole::Bass, 1.0));
    assert_eq!(m.instrument(InstrumentRole::Bass).volume, 1.0);
    assert_eq!(e.loop_count(), 0);
    assert_eq!(frame::peak(&run(&mut e, 1.0)), 0.0);

    // toggling it on brings it in
    send(&mut e, m.toggle_instrument(InstrumentRole::Bass));
    assert_eq!(e.loop_count(), 1);
    assert!(frame::peak(&run(&mut e, 1.0)) > 0.0);
}

#[test]
fn malformed_settings_leave_the_defaults_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = persistence::settings_file_path(dir.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "mood": "Dorian", "masterVolume": 0.2, "instruments": [] }"#).unwrap();

    let saved = persistence::load_settings(dir.path());
    assert!(saved.is_none());
    let m = Middle::with_settings(saved, Box::new(FieldRecordings::new(SR)), Box::new(NoKeepAlive));
    assert_eq!(m.instruments(), &InstrumentState::defaults());
    assert_eq!(m.mood(), "Lydian");
}

#[test]
fn session_survives_a_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut m = middle();
    m.set_mood("Aeolian");
    m.set_tempo(85.0);
    m.toggle_instrument(InstrumentRole::Bell);
    m.set_instrument_volume(InstrumentRole::Piano, 0.3);

    let record = m.tick(std::time::Instant::now() + Duration::from_secs(1)).unwrap();
    persistence::save_settings(dir.path(), &record).unwrap();

    let restored = Middle::with_settings(
        persistence::load_settings(dir.path()),
        Box::new(FieldRecordings::new(SR)),
        Box::new(NoKeepAlive),
    );
    assert_eq!(restored.mood(), "Aeolian");
    assert_eq!(restored.tempo(), 85.0);
    assert!(!restored.instrument(InstrumentRole::Bell).active);
    assert_eq!(restored.instrument(InstrumentRole::Piano).volume, 0.3);
}

#[test]
fn master_volume_moves_while_playing() {
    let mut m = middle();
    let mut e = engine();
    send(&mut e, m.play());
    run(&mut e, 1.0);
    send(&mut e, m.set_master_volume(0.0));
    assert_eq!(frame::peak(&run(&mut e, 0.5)), 0.0);
    assert!(e.transport().is_running());
}

#[test]
fn a_broken_voice_leaves_audio_unavailable_and_playback_refused() {
    use endless_ambient::audio::effects::{ReverbParams, StageSpec};
    use endless_ambient::audio::instruments::{InstrumentPreset, bell};
    use endless_ambient::audio::system::READY_TIMEOUT;

    static SILENT_HALL: InstrumentPreset = InstrumentPreset {
        chain: &[StageSpec::Reverb(ReverbParams::new(-1.0, 0.0, 1.0))],
        ..bell::PRESET
    };
    let ctx = BuildContext { sample_rate: SR, seed: 5 };
    let system = AudioSystem::initialize_with(0.7, &ctx, &[&SILENT_HALL], READY_TIMEOUT).ok();
    assert!(system.is_none());

    let mut e = Engine::new(system, SR, Box::new(SequenceRandom::new([0.5])));
    let mut m = Middle::new(Box::new(FieldRecordings::new(SR)), Box::new(NoKeepAlive));
    m.set_audio_ready(false);

    send(&mut e, m.play());
    assert!(!m.is_playing());
    // even a start that slips through finds nothing to play on
    let loops = endless_ambient::audio_api::plan_loops("Lydian", &InstrumentState::defaults());
    e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops });
    assert_eq!(e.loop_count(), 0);
    assert!(!e.transport().is_running());
    assert_eq!(frame::peak(&run(&mut e, 0.5)), 0.0);
}
