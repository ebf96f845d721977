use std::path::Path;

use endless_ambient::audio::frame::{self, StereoFrame};
use endless_ambient::audio::{AudioSystem, BuildContext, Engine};
use endless_ambient::field::{FieldRecordings, NoKeepAlive, StreamingChannel};
use endless_ambient::middle::Middle;
use endless_ambient::music::SeededRandom;
use endless_ambient::shared::{InputEvent, InstrumentRole};

const SR: u32 = 8_000;

fn write_noise(path: &Path, level: i16) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..SR as i32 {
        let s = if i % 2 == 0 { level } else { -level };
        w.write_sample(s).unwrap();
        w.write_sample(s).unwrap();
    }
    w.finalize().unwrap();
}

fn session(dir: &Path) -> (Middle, Engine) {
    let mut field = FieldRecordings::new(SR);
    let load = field.load(dir).unwrap();
    let sys = AudioSystem::initialize(1.0, &BuildContext { sample_rate: SR, seed: 1 }).unwrap();
    let mut engine = Engine::new(Some(sys), SR, Box::new(SeededRandom::new(1)));
    for cmd in load {
        engine.handle_cmd(cmd);
    }
    let mut m = Middle::new(Box::new(field), Box::new(NoKeepAlive));
    m.set_audio_ready(true);
    for role in InstrumentRole::SYNTHESIZED {
        if m.instrument(role).active {
            m.toggle_instrument(role);
        }
    }
    for cmd in m.initial_commands() {
        engine.handle_cmd(cmd);
    }
    (m, engine)
}

fn render(e: &mut Engine, frames: usize) -> Vec<StereoFrame> {
    let mut out = vec![StereoFrame::zero(); frames];
    e.render_block(&mut out);
    out
}

#[test]
fn field_recordings_follow_the_session() {
    let dir = tempfile::tempdir().unwrap();
    write_noise(&dir.path().join("01-rain.wav"), 8_000);
    write_noise(&dir.path().join("02-creek.wav"), 8_000);
    let (mut m, mut e) = session(dir.path());

    // 0.2 stored volume reaches the deck
    assert!((e.deck().volume() - 0.2).abs() < 1e-6);
    assert_eq!(frame::peak(&render(&mut e, 400)), 0.0);

    for cmd in m.play() {
        e.handle_cmd(cmd);
    }
    assert!(m.field().is_playing());
    assert!(e.deck().is_playing());
    assert!(frame::peak(&render(&mut e, 400)) > 0.0);
    assert_eq!(e.loop_count(), 0);

    for cmd in m.pause() {
        e.handle_cmd(cmd);
    }
    assert!(!e.deck().is_playing());
}

#[test]
fn mood_cards_move_the_playlist_on() {
    let dir = tempfile::tempdir().unwrap();
    write_noise(&dir.path().join("01-rain.wav"), 4_000);
    write_noise(&dir.path().join("02-creek.wav"), 4_000);
    let (mut m, mut e) = session(dir.path());
    assert_eq!(m.display_state().field_track.as_deref(), Some("01 rain"));

    let first = e.deck().track();
    for cmd in m.handle_input(InputEvent::MoodCard(2)) {
        e.handle_cmd(cmd);
    }
    assert_eq!(m.display_state().field_track.as_deref(), Some("02 creek"));
    assert_ne!(e.deck().track(), first);
    assert!(m.is_playing());
}

#[test]
fn toggling_field_recordings_off_pauses_the_deck() {
    let dir = tempfile::tempdir().unwrap();
    write_noise(&dir.path().join("wind.wav"), 4_000);
    let (mut m, mut e) = session(dir.path());
    for cmd in m.play() {
        e.handle_cmd(cmd);
    }
    for cmd in m.toggle_instrument(InstrumentRole::FieldRecordings) {
        e.handle_cmd(cmd);
    }
    assert!(!e.deck().is_playing());
    assert_eq!(frame::peak(&render(&mut e, 400)), 0.0);
}
