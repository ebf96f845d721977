// Oscillator voices. A voice is one sounding note: oscillators, envelopes, and for the duo core a
// pair of envelope-swept lowpass filters. PolySynth and MonoSynth own fixed voice pools and
// never allocate once built.

use log::debug;

use super::effects::filter::{Biquad, FilterKind};
use super::effects::modulation::Lfo;
use super::effects::time_coefficient;
use super::frame::StereoFrame;

pub const MAX_POLYPHONY: usize = 8; // hard cap so we wont malloc in audio callback

const SILENT: f32 = 1e-4;
const CONTROL_RATE: u32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    #[inline]
    fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (std::f32::consts::TAU * phase).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParams {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self { attack, decay, sustain, release }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FmParams {
    pub harmonicity: f32,
    pub modulation_index: f32,
    pub carrier: Waveform,
    pub modulator: Waveform,
    pub envelope: AdsrParams,
    pub modulation_envelope: AdsrParams,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmParams {
    pub harmonicity: f32,
    pub carrier: Waveform,
    pub modulator: Waveform,
    pub envelope: AdsrParams,
    pub modulation_envelope: AdsrParams,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DuoVoiceParams {
    pub waveform: Waveform,
    pub envelope: AdsrParams,
    pub filter_q: f32,
    pub filter_envelope: AdsrParams,
    pub filter_base: f32,
    pub filter_octaves: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DuoParams {
    pub harmonicity: f32,
    pub vibrato_rate: f32,
    pub vibrato_amount: f32,
    pub voices: [DuoVoiceParams; 2],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SynthCore {
    Fm(FmParams),
    Am(AmParams),
    Duo(DuoParams),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthParams {
    pub core: SynthCore,
    pub portamento: f32, // seconds
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Linear attack, exponential decay and release (-60 dB over the stage time).
#[derive(Clone, Copy, Debug)]
pub(crate) struct Envelope {
    sustain: f32,
    attack_step: f32,
    decay_coef: f32,
    release_coef: f32,
    stage: Stage,
    level: f32,
}

fn sixty_db_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        return 0.0;
    }
    (0.001f32.ln() / (seconds * sample_rate)).exp()
}

impl Envelope {
    pub(crate) fn new(p: AdsrParams, sample_rate: f32) -> Self {
        let attack_samples = p.attack * sample_rate;
        Self {
            sustain: p.sustain.clamp(0.0, 1.0),
            attack_step: if attack_samples < 1.0 { 1.0 } else { 1.0 / attack_samples },
            decay_coef: sixty_db_coefficient(p.decay, sample_rate),
            release_coef: sixty_db_coefficient(p.release, sample_rate),
            stage: Stage::Idle,
            level: 0.0,
        }
    }

    // re-attacks from wherever the level currently is
    pub(crate) fn trigger(&mut self) {
        self.stage = Stage::Attack;
    }

    pub(crate) fn release(&mut self) {
        if self.stage != Stage::Idle {
            self.stage = Stage::Release;
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub(crate) fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    pub(crate) fn tick(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => self.level = 0.0,
            Stage::Attack => {
                self.level += self.attack_step;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level = self.sustain + (self.level - self.sustain) * self.decay_coef;
                if (self.level - self.sustain).abs() < SILENT {
                    self.level = self.sustain;
                    self.stage = if self.sustain < SILENT { Stage::Idle } else { Stage::Sustain };
                }
            }
            Stage::Sustain => {}
            Stage::Release => {
                self.level *= self.release_coef;
                if self.level < SILENT {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Osc {
    phase: f32,
}

impl Osc {
    #[inline]
    fn tick(&mut self, w: Waveform, freq: f32, sample_rate: f32) -> f32 {
        let v = w.at(self.phase);
        self.phase = (self.phase + freq / sample_rate).rem_euclid(1.0);
        v
    }
}

// one sounding note
#[derive(Clone, Copy, Debug)]
struct Voice {
    core: SynthCore,
    sample_rate: f32,
    osc: [Osc; 2],
    env: [Envelope; 2], // fm/am: amplitude, modulation. duo: amplitude of each half
    filter_env: [Envelope; 2],
    filters: [Biquad; 2],
    vibrato: Lfo,
    freq: f32,
    target: f32,
    glide: f32,
    detune: f32,   // ratio
    hold: u64,     // frames left until release, 0 once released
    control: u32,
}

impl Voice {
    fn new(params: SynthParams, detune_cents: f32, sample_rate: f32) -> Self {
        let (env, filter_env, vibrato) = match params.core {
            SynthCore::Fm(p) => (
                [Envelope::new(p.envelope, sample_rate), Envelope::new(p.modulation_envelope, sample_rate)],
                [Envelope::new(p.envelope, sample_rate); 2],
                Lfo::new(0.0, sample_rate),
            ),
            SynthCore::Am(p) => (
                [Envelope::new(p.envelope, sample_rate), Envelope::new(p.modulation_envelope, sample_rate)],
                [Envelope::new(p.envelope, sample_rate); 2],
                Lfo::new(0.0, sample_rate),
            ),
            SynthCore::Duo(p) => (
                [
                    Envelope::new(p.voices[0].envelope, sample_rate),
                    Envelope::new(p.voices[1].envelope, sample_rate),
                ],
                [
                    Envelope::new(p.voices[0].filter_envelope, sample_rate),
                    Envelope::new(p.voices[1].filter_envelope, sample_rate),
                ],
                Lfo::new(p.vibrato_rate, sample_rate),
            ),
        };
        let filters = match params.core {
            SynthCore::Duo(p) => [0, 1].map(|i| {
                let v = p.voices[i];
                Biquad::new(FilterKind::Lowpass, v.filter_base, v.filter_q, sample_rate)
            }),
            _ => [Biquad::default(); 2],
        };
        Self {
            core: params.core,
            sample_rate,
            osc: [Osc::default(); 2],
            env,
            filter_env,
            filters,
            vibrato,
            freq: 0.0,
            target: 0.0,
            glide: time_coefficient(params.portamento, sample_rate),
            detune: 2f32.powf(detune_cents / 1200.0),
            hold: 0,
            control: 0,
        }
    }

    fn is_active(&self) -> bool {
        match self.core {
            SynthCore::Duo(_) => self.env[0].is_active() || self.env[1].is_active(),
            _ => self.env[0].is_active(),
        }
    }

    fn trigger(&mut self, freq: f32, hold_frames: u64, glide: bool) {
        self.target = freq;
        if !glide || !self.is_active() {
            self.freq = freq;
        }
        self.env.iter_mut().for_each(Envelope::trigger);
        if let SynthCore::Duo(_) = self.core {
            self.filter_env.iter_mut().for_each(Envelope::trigger);
        }
        self.hold = hold_frames.max(1);
    }

    fn release(&mut self) {
        self.hold = 0;
        self.env.iter_mut().for_each(Envelope::release);
        self.filter_env.iter_mut().for_each(Envelope::release);
    }

    #[inline]
    fn tick(&mut self) -> f32 {
        if self.hold > 0 {
            self.hold -= 1;
            if self.hold == 0 {
                self.release();
            }
        }
        self.freq = self.target + (self.freq - self.target) * self.glide;
        let f = self.freq * self.detune;
        let sr = self.sample_rate;

        match self.core {
            SynthCore::Fm(p) => {
                let amp = self.env[0].tick();
                let depth = self.env[1].tick();
                let m = self.osc[1].tick(p.modulator, f * p.harmonicity, sr) * depth;
                self.osc[0].tick(p.carrier, f * (1.0 + p.modulation_index * m), sr) * amp
            }
            SynthCore::Am(p) => {
                let amp = self.env[0].tick();
                let depth = self.env[1].tick();
                let m = self.osc[1].tick(p.modulator, f * p.harmonicity, sr);
                let gain = 1.0 - depth + depth * (m + 1.0) * 0.5;
                self.osc[0].tick(p.carrier, f, sr) * amp * gain
            }
            SynthCore::Duo(p) => {
                // vibrato swings +-50 cents at full amount
                let cents = 50.0 * p.vibrato_amount * self.vibrato.value_at(0.0);
                self.vibrato.advance(1);
                let f = f * 2f32.powf(cents / 1200.0);
                let retune = self.control == 0;
                self.control = (self.control + 1) % CONTROL_RATE;

                let mut out = 0.0;
                for i in 0..2 {
                    let v = p.voices[i];
                    let sweep = self.filter_env[i].tick();
                    if retune {
                        let cutoff = v.filter_base * 2f32.powf(v.filter_octaves * sweep);
                        self.filters[i].set(FilterKind::Lowpass, cutoff, v.filter_q, sr);
                    }
                    let freq = if i == 1 { f * p.harmonicity } else { f };
                    let raw = self.osc[i].tick(v.waveform, freq, sr);
                    out += self.filters[i].tick(raw, 0) * self.env[i].tick();
                }
                out * 0.5
            }
        }
    }
}

/// Anything a loop can play notes on.
pub trait SoundSource: Send {
    /// Starts `freqs` now and releases them after `hold_frames`. Returns how many notes sounded.
    fn trigger(&mut self, freqs: &[f32], hold_frames: u64) -> usize;

    /// Adds this source's output into `out`.
    fn render(&mut self, out: &mut [StereoFrame]);

    fn polyphony(&self) -> usize;

    fn active_voices(&self) -> usize;

    fn release_all(&mut self);
}

pub struct PolySynth {
    voices: Vec<Voice>,
}

impl PolySynth {
    pub fn new(params: SynthParams, max_polyphony: usize, sample_rate: f32) -> Self {
        Self::with_detune(params, max_polyphony, sample_rate, || 0.0)
    }

    /// Each voice slot gets its own fixed detune (in cents) from `detune`.
    pub fn with_detune(
        params: SynthParams,
        max_polyphony: usize,
        sample_rate: f32,
        mut detune: impl FnMut() -> f32,
    ) -> Self {
        let n = max_polyphony.clamp(1, MAX_POLYPHONY);
        Self { voices: (0..n).map(|_| Voice::new(params, detune(), sample_rate)).collect() }
    }

    pub fn detunes(&self) -> impl Iterator<Item = f32> + '_ {
        self.voices.iter().map(|v| 1200.0 * v.detune.log2())
    }
}

impl SoundSource for PolySynth {
    fn trigger(&mut self, freqs: &[f32], hold_frames: u64) -> usize {
        let mut started = 0;
        for &freq in freqs {
            match self.voices.iter_mut().find(|v| !v.is_active()) {
                Some(v) => {
                    v.trigger(freq, hold_frames, false);
                    started += 1;
                }
                None => {
                    debug!("voice ceiling ({}) reached, dropping {freq:.1} Hz", self.voices.len());
                }
            }
        }
        started
    }

    fn render(&mut self, out: &mut [StereoFrame]) {
        for v in self.voices.iter_mut().filter(|v| v.is_active()) {
            for f in out.iter_mut() {
                *f += StereoFrame::mono(v.tick());
            }
        }
    }

    fn polyphony(&self) -> usize {
        self.voices.len()
    }

    fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    fn release_all(&mut self) {
        self.voices.iter_mut().for_each(Voice::release);
    }
}

/// Exactly one voice. A new note while one is sounding glides to the new pitch and re-attacks
/// from the current level, so two notes never overlap.
pub struct MonoSynth {
    voice: Voice,
}

impl MonoSynth {
    pub fn new(params: SynthParams, sample_rate: f32) -> Self {
        Self { voice: Voice::new(params, 0.0, sample_rate) }
    }

    pub fn target_frequency(&self) -> Option<f32> {
        self.voice.is_active().then_some(self.voice.target)
    }
}

impl SoundSource for MonoSynth {
    fn trigger(&mut self, freqs: &[f32], hold_frames: u64) -> usize {
        let Some(&freq) = freqs.first() else {
            return 0;
        };
        self.voice.trigger(freq, hold_frames, true);
        1
    }

    fn render(&mut self, out: &mut [StereoFrame]) {
        if !self.voice.is_active() {
            return;
        }
        for f in out.iter_mut() {
            *f += StereoFrame::mono(self.voice.tick());
        }
    }

    fn polyphony(&self) -> usize {
        1
    }

    fn active_voices(&self) -> usize {
        self.voice.is_active() as usize
    }

    fn release_all(&mut self) {
        self.voice.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 8_000.0;

    fn fm() -> SynthParams {
        SynthParams {
            core: SynthCore::Fm(FmParams {
                harmonicity: 1.0,
                modulation_index: 2.5,
                carrier: Waveform::Sine,
                modulator: Waveform::Triangle,
                envelope: AdsrParams::new(0.01, 1.2, 0.0, 4.5),
                modulation_envelope: AdsrParams::new(0.0, 0.6, 0.0, 1.5),
            }),
            portamento: 0.0,
        }
    }

    fn am() -> SynthParams {
        SynthParams {
            core: SynthCore::Am(AmParams {
                harmonicity: 1.0,
                carrier: Waveform::Sine,
                modulator: Waveform::Triangle,
                envelope: AdsrParams::new(0.12, 0.9, 0.6, 3.2),
                modulation_envelope: AdsrParams::new(0.0, 0.4, 0.0, 1.2),
            }),
            portamento: 0.03,
        }
    }

    #[test]
    fn envelope_walks_its_stages() {
        let mut env = Envelope::new(AdsrParams::new(0.01, 0.1, 0.5, 0.1), 1_000.0);
        assert!(!env.is_active());
        env.trigger();
        for _ in 0..10 {
            env.tick();
        }
        assert!((env.level() - 1.0).abs() < 1e-5);
        for _ in 0..200 {
            env.tick();
        }
        assert!((env.level() - 0.5).abs() < 1e-3);
        env.release();
        for _ in 0..200 {
            env.tick();
        }
        assert!(!env.is_active());
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn zero_sustain_goes_idle_on_its_own() {
        let mut env = Envelope::new(AdsrParams::new(0.0, 0.05, 0.0, 1.0), 1_000.0);
        env.trigger();
        for _ in 0..100 {
            env.tick();
        }
        assert!(!env.is_active());
    }

    #[test]
    fn poly_drops_notes_past_its_ceiling() {
        let mut synth = PolySynth::new(fm(), 8, SR);
        let chord: Vec<f32> = (0..10).map(|i| 220.0 + i as f32 * 10.0).collect();
        assert_eq!(synth.trigger(&chord, 1_000), 8);
        assert_eq!(synth.active_voices(), 8);
        assert_eq!(synth.trigger(&[440.0], 1_000), 0);
    }

    #[test]
    fn poly_ceiling_is_capped() {
        assert_eq!(PolySynth::new(fm(), 32, SR).polyphony(), MAX_POLYPHONY);
    }

    #[test]
    fn voices_free_up_after_release() {
        let mut synth = PolySynth::new(fm(), 2, SR);
        synth.trigger(&[220.0, 330.0], 80);
        let mut buf = vec![StereoFrame::zero(); SR as usize * 8];
        synth.render(&mut buf);
        assert_eq!(synth.active_voices(), 0);
        assert!(buf.iter().any(|f| f.left.abs() > 0.01));
    }

    #[test]
    fn mono_never_stacks_notes() {
        let mut bass = MonoSynth::new(am(), SR);
        assert_eq!(bass.polyphony(), 1);
        bass.trigger(&[55.0], 8_000);
        let mut buf = vec![StereoFrame::zero(); 400];
        bass.render(&mut buf);
        // overlapping second note and a chord both retarget the single voice
        bass.trigger(&[82.41], 8_000);
        assert_eq!(bass.active_voices(), 1);
        assert_eq!(bass.target_frequency(), Some(82.41));
        bass.trigger(&[41.2, 61.7, 73.4], 8_000);
        assert_eq!(bass.active_voices(), 1);
        assert_eq!(bass.target_frequency(), Some(41.2));
    }

    #[test]
    fn detune_is_fixed_per_voice_slot() {
        let mut cents = [-2.0, -1.0, 0.5, 2.0].into_iter().cycle();
        let synth = PolySynth::with_detune(fm(), 4, SR, || cents.next().unwrap_or(0.0));
        let got: Vec<f32> = synth.detunes().collect();
        for (g, want) in got.iter().zip([-2.0, -1.0, 0.5, 2.0]) {
            assert!((g - want).abs() < 1e-3, "{got:?}");
        }
    }
}
