// Slow dual-oscillator pad: two detuned halves with their own filter sweeps, long tails.

use super::InstrumentPreset;
use crate::audio::effects::{
    AutoFilterParams, ChorusParams, CompressorParams, DelayParams, FilterParams, ReverbParams,
    StageSpec,
};
use crate::audio::synth::{AdsrParams, DuoParams, DuoVoiceParams, SynthCore, SynthParams, Waveform};
use crate::shared::InstrumentRole;

pub const PRESET: InstrumentPreset = InstrumentPreset {
    role: InstrumentRole::Pad,
    synth: SynthParams {
        core: SynthCore::Duo(DuoParams {
            harmonicity: 1.35,
            vibrato_rate: 0.15,
            vibrato_amount: 0.15,
            voices: [
                DuoVoiceParams {
                    waveform: Waveform::Triangle,
                    envelope: AdsrParams::new(2.4, 0.6, 0.85, 8.0),
                    filter_q: 0.6,
                    filter_envelope: AdsrParams::new(3.0, 2.0, 0.4, 6.0),
                    filter_base: 600.0,
                    filter_octaves: 2.5,
                },
                DuoVoiceParams {
                    waveform: Waveform::Sine,
                    envelope: AdsrParams::new(3.0, 0.6, 0.88, 9.0),
                    filter_q: 0.5,
                    filter_envelope: AdsrParams::new(3.5, 2.2, 0.45, 6.5),
                    filter_base: 700.0,
                    filter_octaves: 2.2,
                },
            ],
        }),
        portamento: 0.06,
    },
    polyphony: 8,
    headroom_db: -6.0,
    detune_cents: 0.0,
    chain: &[
        StageSpec::Filter(FilterParams::highpass(120.0, 0.7)),
        StageSpec::Chorus(ChorusParams::new(0.25, 3.5, 0.7, 0.08, 0.45)),
        StageSpec::AutoFilter(AutoFilterParams::new(0.06, 600.0, 2.5, 0.4, 0.35).steep()),
        StageSpec::FeedbackDelay(DelayParams::new(0.5, 0.45, 0.25)),
        StageSpec::Reverb(ReverbParams::new(14.0, 0.12, 0.55)),
        StageSpec::Compressor(CompressorParams::new(-26.0, 2.0, 0.03, 0.25)),
        StageSpec::Limiter { threshold_db: -1.0 },
    ],
    send: None,
};
