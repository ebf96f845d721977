// Spatial FM lead. Drifts around the stereo field, and a pitched-up shimmer send is tapped out
// after the auto-filter, run through its own reverb and mixed back in low.

use super::{InstrumentPreset, SendPreset};
use crate::audio::effects::{
    AutoFilterParams, AutoPannerParams, CompressorParams, DelayParams, FilterParams, PhaserParams,
    PitchShiftParams, ReverbParams, StageSpec,
};
use crate::audio::synth::{AdsrParams, FmParams, SynthCore, SynthParams, Waveform};
use crate::shared::InstrumentRole;

const AUTO_FILTER_STAGE: usize = 4;

pub const PRESET: InstrumentPreset = InstrumentPreset {
    role: InstrumentRole::LeadSynth,
    synth: SynthParams {
        core: SynthCore::Fm(FmParams {
            harmonicity: 1.0,
            modulation_index: 5.0,
            carrier: Waveform::Triangle,
            modulator: Waveform::Sine,
            envelope: AdsrParams::new(0.02, 1.6, 0.15, 6.0),
            modulation_envelope: AdsrParams::new(0.0, 1.2, 0.0, 1.8),
        }),
        portamento: 0.02,
    },
    polyphony: 8,
    headroom_db: -6.0,
    detune_cents: 0.0,
    chain: &[
        StageSpec::Filter(FilterParams::highpass(90.0, 0.707)),
        StageSpec::AutoPanner(AutoPannerParams { frequency: 0.06, depth: 0.9, wet: 0.6 }),
        StageSpec::Widener { width: 0.8 },
        StageSpec::Phaser(PhaserParams { frequency: 0.08, octaves: 3.0, base_frequency: 600.0, q: 0.5, wet: 0.25 }),
        StageSpec::AutoFilter(AutoFilterParams::new(0.04, 800.0, 3.0, 0.4, 0.35).steep()),
        StageSpec::PingPongDelay(DelayParams::new(0.667, 0.55, 0.45)), // 3n at 120
        StageSpec::FeedbackDelay(DelayParams::new(0.5, 0.4, 0.35)),
        StageSpec::Reverb(ReverbParams::new(18.0, 0.07, 0.6)),
        StageSpec::Compressor(CompressorParams::new(-34.0, 1.6, 0.02, 0.25).knee(8.0)),
        StageSpec::Limiter { threshold_db: -2.5 },
    ],
    send: Some(SendPreset {
        tap_after: AUTO_FILTER_STAGE,
        chain: &[
            StageSpec::PitchShift(PitchShiftParams::new(12.0, 0.25)),
            StageSpec::Reverb(ReverbParams::new(20.0, 0.05, 0.9)),
            StageSpec::Gain { db: -16.0 },
        ],
    }),
};
