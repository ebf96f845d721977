// Glassy FM bell. Near instant attack, long decay, every voice slightly detuned.

use super::InstrumentPreset;
use crate::audio::effects::{ChorusParams, DelayParams, FilterParams, ReverbParams, StageSpec};
use crate::audio::synth::{AdsrParams, FmParams, SynthCore, SynthParams, Waveform};
use crate::shared::InstrumentRole;

pub const PRESET: InstrumentPreset = InstrumentPreset {
    role: InstrumentRole::Bell,
    synth: SynthParams {
        core: SynthCore::Fm(FmParams {
            harmonicity: 2.0,
            modulation_index: 8.0,
            carrier: Waveform::Sine,
            modulator: Waveform::Sine,
            envelope: AdsrParams::new(0.005, 4.0, 0.0, 6.0),
            modulation_envelope: AdsrParams::new(0.0, 2.5, 0.0, 5.0),
        }),
        portamento: 0.0,
    },
    polyphony: 8,
    headroom_db: -8.0,
    detune_cents: 2.0,
    chain: &[
        StageSpec::Filter(FilterParams::lowpass(4500.0, 0.7)),
        StageSpec::Chorus(ChorusParams::new(0.2, 3.5, 0.5, 0.05, 0.3)),
        StageSpec::PingPongDelay(DelayParams::new(0.667, 0.4, 0.35)), // 3n at 120
        StageSpec::Reverb(ReverbParams::new(14.0, 0.1, 0.6)),
        StageSpec::Limiter { threshold_db: -3.0 },
    ],
    send: None,
};
