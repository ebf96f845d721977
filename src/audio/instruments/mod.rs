// Voice builders. Each role file holds a preset (plain data); `build` starts the two-phase
// build from one:
//
//   build(&preset, &ctx) -> PendingInstrument   allocates every node, kicks off slow stages
//   .await_ready(timeout) -> ReadyInstrument
//   .connect(&master) -> InstrumentVoice   only now may it receive signal

pub mod bass;
pub mod bell;
pub mod pad;
pub mod piano;
pub mod synth;

use std::time::{Duration, Instant};

use log::debug;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::chain::EffectChain;
use super::effects::{StageSpec, db_to_gain, gain_to_db};
use super::error::BuildError;
use super::frame::{self, StereoFrame};
use super::ids::BusId;
use super::master::MasterBus;
use super::synth::{MonoSynth, PolySynth, SoundSource, SynthParams};
use crate::shared::InstrumentRole;

/// Largest block a voice renders in one go; longer requests are chunked.
pub const MAX_BLOCK: usize = 1024;

#[derive(Clone, Copy, Debug)]
pub struct BuildContext {
    pub sample_rate: u32,
    pub seed: u64,
}

/// Parallel send tapped out of the main chain and summed back at the end.
#[derive(Clone, Copy, Debug)]
pub struct SendPreset {
    pub tap_after: usize,
    pub chain: &'static [StageSpec],
}

#[derive(Clone, Copy, Debug)]
pub struct InstrumentPreset {
    pub role: InstrumentRole,
    pub synth: SynthParams,
    pub polyphony: usize, // 1 means a mono synth
    pub headroom_db: f32,
    pub detune_cents: f32, // each voice slot gets a random detune in +-this
    pub chain: &'static [StageSpec],
    pub send: Option<SendPreset>,
}

pub fn preset(role: InstrumentRole) -> Option<&'static InstrumentPreset> {
    match role {
        InstrumentRole::Pad => Some(&pad::PRESET),
        InstrumentRole::Piano => Some(&piano::PRESET),
        InstrumentRole::LeadSynth => Some(&synth::PRESET),
        InstrumentRole::Bell => Some(&bell::PRESET),
        InstrumentRole::Bass => Some(&bass::PRESET),
        InstrumentRole::FieldRecordings => None,
    }
}

/// The five stock presets, in role order.
pub fn presets() -> Vec<&'static InstrumentPreset> {
    InstrumentRole::SYNTHESIZED.into_iter().filter_map(preset).collect()
}

// the parts every phase carries along
struct Parts {
    role: InstrumentRole,
    source: Box<dyn SoundSource>,
    headroom: f32,
    chain: EffectChain,
    send: Option<(usize, EffectChain)>,
}

pub struct PendingInstrument {
    parts: Parts,
}

pub struct ReadyInstrument {
    parts: Parts,
}

pub fn build(preset: &InstrumentPreset, ctx: &BuildContext) -> PendingInstrument {
    let sr = ctx.sample_rate as f32;
    debug!(
        "building {}: {}",
        preset.role.id(),
        preset.chain.iter().map(StageSpec::label).collect::<Vec<_>>().join(" -> ")
    );
    let source: Box<dyn SoundSource> = if preset.polyphony <= 1 {
        Box::new(MonoSynth::new(preset.synth, sr))
    } else {
        // seeded per role so two builds with the same seed sound the same
        let mut rng = Pcg32::seed_from_u64(ctx.seed ^ (preset.role.index() as u64 + 1));
        let spread = preset.detune_cents;
        Box::new(PolySynth::with_detune(preset.synth, preset.polyphony, sr, move || {
            if spread > 0.0 { rng.random_range(-spread..=spread) } else { 0.0 }
        }))
    };
    PendingInstrument {
        parts: Parts {
            role: preset.role,
            source,
            headroom: db_to_gain(preset.headroom_db),
            chain: EffectChain::create(preset.chain, ctx.sample_rate),
            send: preset.send.map(|s| (s.tap_after, EffectChain::create(s.chain, ctx.sample_rate))),
        },
    }
}

impl PendingInstrument {
    pub fn role(&self) -> InstrumentRole {
        self.parts.role
    }

    pub fn await_ready(mut self, timeout: Duration) -> Result<ReadyInstrument, BuildError> {
        let role = self.parts.role;
        let start = Instant::now();
        self.parts.chain.await_ready(timeout).map_err(|e| e.for_role(role))?;
        if let Some((_, send)) = self.parts.send.as_mut() {
            send.await_ready(timeout.saturating_sub(start.elapsed())).map_err(|e| e.for_role(role))?;
        }
        Ok(ReadyInstrument { parts: self.parts })
    }
}

impl ReadyInstrument {
    pub fn role(&self) -> InstrumentRole {
        self.parts.role
    }

    pub fn connect(mut self, bus: &MasterBus) -> Result<InstrumentVoice, BuildError> {
        let role = self.parts.role;
        let id = self.parts.chain.connect(bus).map_err(|e| e.for_role(role))?;
        if let Some((_, send)) = self.parts.send.as_mut() {
            send.connect(bus).map_err(|e| e.for_role(role))?;
        }
        let sends = self.parts.send.is_some();
        Ok(InstrumentVoice {
            parts: self.parts,
            bus: id,
            volume_db: 0.0,
            scratch: vec![StereoFrame::zero(); MAX_BLOCK],
            tap: if sends { vec![StereoFrame::zero(); MAX_BLOCK] } else { Vec::new() },
        })
    }
}

/// A connected voice: sound source, headroom trim, user volume, effect chain, optional send.
pub struct InstrumentVoice {
    parts: Parts,
    bus: BusId,
    volume_db: f32,
    scratch: Vec<StereoFrame>,
    tap: Vec<StereoFrame>,
}

impl InstrumentVoice {
    pub fn role(&self) -> InstrumentRole {
        self.parts.role
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    pub fn polyphony(&self) -> usize {
        self.parts.source.polyphony()
    }

    pub fn active_voices(&self) -> usize {
        self.parts.source.active_voices()
    }

    pub fn chain_labels(&self) -> Vec<&'static str> {
        self.parts.chain.labels()
    }

    pub fn has_send(&self) -> bool {
        self.parts.send.is_some()
    }

    /// Linear [0, 1]; zero is silence.
    pub fn set_volume(&mut self, volume: f32) {
        let v = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        self.volume_db = gain_to_db(v);
    }

    pub fn volume(&self) -> f32 {
        db_to_gain(self.volume_db)
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    pub fn trigger(&mut self, freqs: &[f32], hold_frames: u64) -> usize {
        self.parts.source.trigger(freqs, hold_frames)
    }

    pub fn release_all(&mut self) {
        self.parts.source.release_all();
    }

    /// Renders through the chain and adds the result into `out`.
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        for chunk in out.chunks_mut(MAX_BLOCK) {
            self.render_chunk(chunk);
        }
    }

    fn render_chunk(&mut self, out: &mut [StereoFrame]) {
        let n = out.len();
        let buf = &mut self.scratch[..n];
        frame::clear(buf);
        self.parts.source.render(buf);

        let gain = self.parts.headroom * db_to_gain(self.volume_db);
        for f in buf.iter_mut() {
            *f = f.scaled(gain);
        }

        match self.parts.send.as_mut() {
            Some((tap_after, send)) => {
                let tap = &mut self.tap[..n];
                self.parts.chain.process_tapped(buf, *tap_after, tap);
                send.process(tap);
                for ((o, b), t) in out.iter_mut().zip(buf.iter()).zip(tap.iter()) {
                    *o += *b + *t;
                }
            }
            None => {
                self.parts.chain.process(buf);
                for (o, b) in out.iter_mut().zip(buf.iter()) {
                    *o += *b;
                }
            }
        }
    }
}
