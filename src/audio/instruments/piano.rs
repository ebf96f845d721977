// Soft FM piano: fast attack, no sustain, a long ring out.

use super::InstrumentPreset;
use crate::audio::effects::{ChorusParams, DelayParams, FilterParams, ReverbParams, StageSpec};
use crate::audio::synth::{AdsrParams, FmParams, SynthCore, SynthParams, Waveform};
use crate::shared::InstrumentRole;

pub const PRESET: InstrumentPreset = InstrumentPreset {
    role: InstrumentRole::Piano,
    synth: SynthParams {
        core: SynthCore::Fm(FmParams {
            harmonicity: 1.0,
            modulation_index: 2.5,
            carrier: Waveform::Sine,
            modulator: Waveform::Triangle,
            envelope: AdsrParams::new(0.01, 1.2, 0.0, 4.5),
            modulation_envelope: AdsrParams::new(0.0, 0.6, 0.0, 1.5),
        }),
        portamento: 0.0,
    },
    polyphony: 8,
    headroom_db: -6.0,
    detune_cents: 0.0,
    chain: &[
        StageSpec::Filter(FilterParams::highpass(80.0, 0.707)),
        StageSpec::Chorus(ChorusParams::new(0.25, 3.5, 0.4, 0.05, 0.35)),
        StageSpec::FeedbackDelay(DelayParams::new(0.667, 0.25, 0.2)), // 3n at 120
        StageSpec::Reverb(ReverbParams::new(14.0, 0.06, 0.55)),
        StageSpec::Limiter { threshold_db: -2.0 },
    ],
    send: None,
};
