// Effect stages. Presets describe a chain as a list of `StageSpec`s (plain data, const-friendly)
// and `StageSpec::create` turns each one into a live stage at build time.

pub mod delay;
pub mod dynamics;
pub mod filter;
pub mod global;
pub mod modulation;
pub mod reverb;
pub mod utility;

use std::time::Duration;

use super::error::BuildError;
use super::frame::StereoFrame;

pub use delay::{DelayParams, FeedbackDelay, PingPongDelay, PitchShift, PitchShiftParams};
pub use dynamics::{Compressor, CompressorParams, Distortion, Limiter};
pub use filter::{Filter, FilterKind, FilterParams, Rolloff};
pub use global::{GlobalEffects, SendKind};
pub use modulation::{
    AutoFilter, AutoFilterParams, AutoPanner, AutoPannerParams, Chorus, ChorusParams, Phaser,
    PhaserParams,
};
pub use reverb::{Reverb, ReverbParams};
pub use utility::{Gain, StereoWidener};

pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);

    fn label(&self) -> &'static str;

    // most stages are ready the moment they exist
    fn is_ready(&self) -> bool {
        true
    }

    fn await_ready(&mut self, _timeout: Duration) -> Result<(), BuildError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StageSpec {
    Filter(FilterParams),
    Chorus(ChorusParams),
    AutoFilter(AutoFilterParams),
    AutoPanner(AutoPannerParams),
    Widener { width: f32 },
    Phaser(PhaserParams),
    FeedbackDelay(DelayParams),
    PingPongDelay(DelayParams),
    Reverb(ReverbParams),
    PitchShift(PitchShiftParams),
    Distortion { drive: f32, wet: f32 },
    Compressor(CompressorParams),
    Limiter { threshold_db: f32 },
    Gain { db: f32 },
}

impl StageSpec {
    pub fn create(&self, sample_rate: u32) -> Box<dyn Effect> {
        let sr = sample_rate as f32;
        match *self {
            StageSpec::Filter(p) => Box::new(Filter::new(p, sr)),
            StageSpec::Chorus(p) => Box::new(Chorus::new(p, sr)),
            StageSpec::AutoFilter(p) => Box::new(AutoFilter::new(p, sr)),
            StageSpec::AutoPanner(p) => Box::new(AutoPanner::new(p, sr)),
            StageSpec::Widener { width } => Box::new(StereoWidener::new(width)),
            StageSpec::Phaser(p) => Box::new(Phaser::new(p, sr)),
            StageSpec::FeedbackDelay(p) => Box::new(FeedbackDelay::new(p, sr)),
            StageSpec::PingPongDelay(p) => Box::new(PingPongDelay::new(p, sr)),
            StageSpec::Reverb(p) => Box::new(Reverb::create(p, sample_rate)),
            StageSpec::PitchShift(p) => Box::new(PitchShift::new(p, sr)),
            StageSpec::Distortion { drive, wet } => Box::new(Distortion::new(drive, wet)),
            StageSpec::Compressor(p) => Box::new(Compressor::new(p, sr)),
            StageSpec::Limiter { threshold_db } => Box::new(Limiter::new(threshold_db, sr)),
            StageSpec::Gain { db } => Box::new(Gain::from_db(db)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            StageSpec::Filter(p) => format!("{:?}({})", p.kind, p.frequency),
            StageSpec::Chorus(p) => format!("Chorus({}Hz)", p.frequency),
            StageSpec::AutoFilter(p) => format!("AutoFilter({}Hz)", p.frequency),
            StageSpec::AutoPanner(p) => format!("AutoPan({}Hz)", p.frequency),
            StageSpec::Widener { width } => format!("Widener({})", width),
            StageSpec::Phaser(p) => format!("Phaser({}Hz)", p.frequency),
            StageSpec::FeedbackDelay(p) => format!("Delay({}s)", p.time),
            StageSpec::PingPongDelay(p) => format!("PingPong({}s)", p.time),
            StageSpec::Reverb(p) => format!("Reverb({}s)", p.decay),
            StageSpec::PitchShift(p) => format!("PitchShift({:+})", p.semitones),
            StageSpec::Distortion { drive, .. } => format!("Distortion({})", drive),
            StageSpec::Compressor(p) => format!("Comp({}dB)", p.threshold_db),
            StageSpec::Limiter { threshold_db } => format!("Limiter({}dB)", threshold_db),
            StageSpec::Gain { db } => format!("Gain({}dB)", db),
        }
    }
}

pub fn db_to_gain(db: f32) -> f32 {
    if db == f32::NEG_INFINITY {
        return 0.0;
    }
    10f32.powf(db / 20.0)
}

pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * gain.log10()
}

// one-pole smoothing coefficient for a time constant in seconds
pub(crate) fn time_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        return 0.0;
    }
    (-1.0 / (seconds * sample_rate)).exp()
}
