use log::{debug, info, warn};

use super::deck::Deck;
use super::frame::{self, StereoFrame};
use super::scheduler::{NoteEvent, Scheduler};
use super::system::AudioSystem;
use super::transport::Transport;
use crate::audio_api::{AudioCommand, LoopSpec};
use crate::music::RandomSource;
use crate::shared::{DEFAULT_TEMPO, InstrumentRole};

/// Everything that runs on the audio thread. Control messages come in through `handle_cmd`
/// between blocks; `render_block` fills the device buffer.
pub struct Engine {
    transport: Transport,
    scheduler: Scheduler,
    system: Option<AudioSystem>, // None when the graph failed to build
    deck: Deck,
    rng: Box<dyn RandomSource>,
    clock: u64, // frames rendered since the engine was made
}

impl Engine {
    pub fn new(system: Option<AudioSystem>, sample_rate: u32, rng: Box<dyn RandomSource>) -> Self {
        Self {
            transport: Transport::new(DEFAULT_TEMPO, sample_rate),
            scheduler: Scheduler::new(),
            system,
            deck: Deck::new(),
            rng,
            clock: 0,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn system(&self) -> Option<&AudioSystem> {
        self.system.as_ref()
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn loop_count(&self) -> usize {
        self.scheduler.loop_count()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::StartPlayback { tempo, loops } => {
                if self.system.is_none() {
                    warn!("start ignored, audio system isn't up");
                    return;
                }
                self.transport.set_bpm(tempo);
                self.apply_loop_volumes(&loops);
                self.scheduler.install(loops, self.clock, &self.transport);
                self.transport.start();
                info!("playback started at {} bpm with {} loops", self.transport.bpm(), self.scheduler.loop_count());
            }
            AudioCommand::RestartLoops { loops } => {
                if !self.transport.is_running() {
                    debug!("restart ignored while stopped");
                    return;
                }
                self.apply_loop_volumes(&loops);
                self.scheduler.install(loops, self.clock, &self.transport);
            }
            AudioCommand::StopPlayback => self.stop_playback(),
            AudioCommand::StartLoop(spec) => {
                if !self.transport.is_running() {
                    debug!("loop {} not started, transport is stopped", spec.role.id());
                    return;
                }
                self.apply_loop_volumes(std::slice::from_ref(&spec));
                self.scheduler.start_one(spec, self.clock, &self.transport);
            }
            AudioCommand::StopLoop(role) => {
                if self.scheduler.stop_one(role) {
                    self.release(role);
                }
            }
            AudioCommand::SetTempo(bpm) => {
                self.transport.set_bpm(bpm);
            }
            AudioCommand::SetVoiceVolume { role, volume } => {
                if let Some(voice) = self.system.as_mut().and_then(|s| s.voice_mut(role)) {
                    voice.set_volume(volume);
                }
            }
            AudioCommand::SetMasterVolume(v) => {
                if let Some(sys) = self.system.as_ref() {
                    sys.master().set_volume(v);
                }
            }
            AudioCommand::Deck(cmd) => self.deck.handle(cmd),
        }
    }

    /// Stops loops, releases every voice, then the transport. Fine to repeat.
    fn stop_playback(&mut self) {
        self.scheduler.stop_all();
        if let Some(sys) = self.system.as_mut() {
            sys.release_all();
        }
        if self.transport.is_running() {
            self.transport.stop();
            info!("playback stopped");
        }
    }

    fn apply_loop_volumes(&mut self, loops: &[LoopSpec]) {
        let Some(sys) = self.system.as_mut() else { return };
        for spec in loops {
            if let Some(voice) = sys.voice_mut(spec.role) {
                voice.set_volume(spec.volume);
            }
        }
    }

    fn release(&mut self, role: InstrumentRole) {
        if let Some(voice) = self.system.as_mut().and_then(|s| s.voice_mut(role)) {
            voice.release_all();
        }
    }

    /// Overwrites `out`. The block is cut at every frame a loop or note is due on, so note
    /// starts are sample accurate.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        frame::clear(out);
        let mut done = 0;
        while done < out.len() {
            let mut seg = out.len() - done;
            if self.transport.is_running() {
                self.dispatch_due();
                if let Some(due) = self.scheduler.next_due() {
                    seg = seg.min(due.saturating_sub(self.clock).max(1) as usize);
                }
            }

            let part = &mut out[done..done + seg];
            if let Some(sys) = self.system.as_mut() {
                for voice in sys.voices_mut() {
                    voice.render_into(part);
                }
            }
            self.deck.render_into(part);

            self.clock += seg as u64;
            self.transport.advance(seg);
            done += seg;
        }
        if let Some(sys) = self.system.as_ref() {
            sys.master().process(out);
        }
    }

    fn dispatch_due(&mut self) {
        self.scheduler.fire_due(self.clock, &self.transport, self.rng.as_mut());
        while let Some(event) = self.scheduler.pop_due(self.clock) {
            self.play(&event);
        }
    }

    fn play(&mut self, event: &NoteEvent) {
        if let Some(voice) = self.system.as_mut().and_then(|s| s.voice_mut(event.role)) {
            voice.trigger(&event.freqs, event.hold_frames);
        }
    }

    /// Tears the session down in reverse order of construction.
    pub fn dispose(&mut self) {
        self.stop_playback();
        if let Some(mut sys) = self.system.take() {
            sys.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::instruments::BuildContext;
    use crate::audio_api::{DeckCommand, plan_loop, plan_loops};
    use crate::music::SequenceRandom;
    use crate::shared::InstrumentState;

    const SR: u32 = 8_000;

    fn engine() -> Engine {
        let sys = AudioSystem::initialize(0.7, &BuildContext { sample_rate: SR, seed: 11 }).unwrap();
        Engine::new(Some(sys), SR, Box::new(SequenceRandom::new([0.5])))
    }

    fn only(roles: &[InstrumentRole]) -> Vec<LoopSpec> {
        let mut instruments = InstrumentState::defaults();
        for (role, s) in instruments.iter_mut() {
            s.active = roles.contains(&role);
        }
        plan_loops("Lydian", &instruments)
    }

    fn run(e: &mut Engine, seconds: f64) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); (seconds * SR as f64) as usize];
        for chunk in out.chunks_mut(512) {
            e.render_block(chunk);
        }
        out
    }

    #[test]
    fn start_plays_and_stop_silences_the_schedule() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops: only(&[InstrumentRole::Piano, InstrumentRole::Bass]) });
        assert_eq!(e.loop_count(), 2);
        assert!(e.transport().is_running());

        let out = run(&mut e, 1.0);
        assert!(frame::peak(&out) > 1e-4);
        assert!(e.scheduler().firings(InstrumentRole::Bass) >= 1);

        e.handle_cmd(AudioCommand::StopPlayback);
        e.handle_cmd(AudioCommand::StopPlayback);
        assert_eq!(e.loop_count(), 0);
        assert_eq!(e.scheduler().pending_len(), 0);
        assert!(!e.transport().is_running());
    }

    #[test]
    fn start_before_the_system_is_up_is_ignored() {
        let mut e = Engine::new(None, SR, Box::new(SequenceRandom::new([0.5])));
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops: only(&[InstrumentRole::Pad]) });
        assert_eq!(e.loop_count(), 0);
        let out = run(&mut e, 0.1);
        assert_eq!(frame::peak(&out), 0.0);
    }

    #[test]
    fn loop_volume_lands_on_the_voice() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops: only(&[InstrumentRole::Piano]) });
        let piano = e.system().and_then(|s| s.voice(InstrumentRole::Piano)).map(|v| v.volume());
        assert!((piano.unwrap_or(0.0) - 0.65).abs() < 1e-4);
    }

    #[test]
    fn restart_swaps_the_mood_without_stopping_the_transport() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops: only(&[InstrumentRole::Pad, InstrumentRole::Bell]) });
        run(&mut e, 0.5);
        let dorian = vec![
            plan_loop(InstrumentRole::Pad, "Dorian", 0.3).unwrap(),
            plan_loop(InstrumentRole::Bell, "Dorian", 0.3).unwrap(),
        ];
        e.handle_cmd(AudioCommand::RestartLoops { loops: dorian });
        assert!(e.transport().is_running());
        assert_eq!(e.scheduler().loop_moods(), ["Dorian"]);
        assert_eq!(e.scheduler().pending_len(), 0);
    }

    #[test]
    fn toggles_add_and_remove_single_loops() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 90.0, loops: only(&[InstrumentRole::Pad]) });
        e.handle_cmd(AudioCommand::StartLoop(plan_loop(InstrumentRole::Bass, "Lydian", 0.4).unwrap()));
        assert_eq!(e.scheduler().loop_roles(), [InstrumentRole::Pad, InstrumentRole::Bass]);
        e.handle_cmd(AudioCommand::StopLoop(InstrumentRole::Pad));
        assert_eq!(e.scheduler().loop_roles(), [InstrumentRole::Bass]);
    }

    #[test]
    fn first_firings_follow_the_stagger() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops: only(&[InstrumentRole::Pad, InstrumentRole::Bass]) });
        assert_eq!(e.scheduler().first_fire(InstrumentRole::Bass), Some(0));
        assert_eq!(e.scheduler().first_fire(InstrumentRole::Pad), Some(2_400)); // 0.3 s
        run(&mut e, 0.25);
        assert_eq!(e.scheduler().firings(InstrumentRole::Pad), 0);
        run(&mut e, 0.1);
        assert_eq!(e.scheduler().firings(InstrumentRole::Pad), 1);
    }

    #[test]
    fn master_volume_zero_silences_everything() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::SetMasterVolume(0.0));
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops: only(&[InstrumentRole::Piano]) });
        let out = run(&mut e, 0.5);
        assert_eq!(frame::peak(&out), 0.0);
    }

    #[test]
    fn deck_commands_reach_the_deck() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::Deck(DeckCommand::SetVolume(0.5)));
        e.handle_cmd(AudioCommand::Deck(DeckCommand::Play));
        assert!(e.deck().is_playing());
        assert_eq!(e.deck().volume(), 0.5);
    }

    #[test]
    fn dispose_tears_everything_down() {
        let mut e = engine();
        e.handle_cmd(AudioCommand::StartPlayback { tempo: 60.0, loops: only(&[InstrumentRole::Pad]) });
        e.dispose();
        assert!(e.system().is_none());
        assert_eq!(e.loop_count(), 0);
        e.dispose();
    }
}
