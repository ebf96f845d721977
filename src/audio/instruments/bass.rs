// Mono AM bass. Sub rumble cut, kept dark, breathing very slowly.

use super::InstrumentPreset;
use crate::audio::effects::{AutoFilterParams, CompressorParams, FilterParams, StageSpec};
use crate::audio::synth::{AdsrParams, AmParams, SynthCore, SynthParams, Waveform};
use crate::shared::InstrumentRole;

pub const PRESET: InstrumentPreset = InstrumentPreset {
    role: InstrumentRole::Bass,
    synth: SynthParams {
        core: SynthCore::Am(AmParams {
            harmonicity: 1.0,
            carrier: Waveform::Sine,
            modulator: Waveform::Triangle,
            envelope: AdsrParams::new(0.12, 0.9, 0.6, 3.2),
            modulation_envelope: AdsrParams::new(0.0, 0.4, 0.0, 1.2),
        }),
        portamento: 0.03,
    },
    polyphony: 1,
    headroom_db: -6.0,
    detune_cents: 0.0,
    chain: &[
        StageSpec::Filter(FilterParams::highpass(20.0, 0.707)),
        StageSpec::Filter(FilterParams::lowpass(220.0, 0.8)),
        StageSpec::AutoFilter(AutoFilterParams::new(0.03, 70.0, 1.2, 0.5, 0.25).steep()),
        StageSpec::Distortion { drive: 0.05, wet: 0.12 },
        StageSpec::Compressor(CompressorParams::new(-30.0, 1.8, 0.01, 0.22).knee(8.0)),
        StageSpec::Limiter { threshold_db: -3.0 },
    ],
    send: None,
};
