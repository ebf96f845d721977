// Offline bounce: runs the same engine the device callback runs, into a WAV file.

use std::path::Path;

use anyhow::Context;
use log::info;

use super::engine::Engine;
use super::frame::{self, StereoFrame};
use super::instruments::{BuildContext, MAX_BLOCK};
use super::system::AudioSystem;
use crate::audio_api::{AudioCommand, plan_loops};
use crate::music::SeededRandom;
use crate::shared::{DEFAULT_MASTER_VOLUME, DEFAULT_MOOD, DEFAULT_TEMPO, InstrumentState, RoleTable};

#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub seconds: f64,
    pub mood: String,
    pub tempo: f64,
    pub seed: u64,
    pub sample_rate: u32,
    pub master_volume: f32,
    pub instruments: RoleTable<InstrumentState>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            seconds: 30.0,
            mood: DEFAULT_MOOD.to_string(),
            tempo: DEFAULT_TEMPO,
            seed: 0,
            sample_rate: 44_100,
            master_volume: DEFAULT_MASTER_VOLUME,
            instruments: InstrumentState::defaults(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderSummary {
    pub frames: u64,
    pub peak: f32,
}

pub fn render_to_wav(path: &Path, opts: &RenderOptions) -> anyhow::Result<RenderSummary> {
    anyhow::ensure!(opts.seconds.is_finite() && opts.seconds > 0.0, "render length must be positive");
    anyhow::ensure!(opts.sample_rate > 0, "sample rate must be positive");

    let ctx = BuildContext { sample_rate: opts.sample_rate, seed: opts.seed };
    let system = AudioSystem::initialize(opts.master_volume, &ctx).context("building the audio graph")?;
    let mut engine = Engine::new(Some(system), opts.sample_rate, Box::new(SeededRandom::new(opts.seed)));
    engine.handle_cmd(AudioCommand::StartPlayback {
        tempo: opts.tempo,
        loops: plan_loops(&opts.mood, &opts.instruments),
    });

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: opts.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;

    let total = (opts.seconds * opts.sample_rate as f64).round() as u64;
    let mut block = vec![StereoFrame::zero(); MAX_BLOCK];
    let mut written = 0u64;
    let mut peak = 0.0f32;
    while written < total {
        let n = (total - written).min(MAX_BLOCK as u64) as usize;
        let buf = &mut block[..n];
        engine.render_block(buf);
        peak = peak.max(frame::peak(buf));
        for f in buf.iter() {
            writer.write_sample(f.left)?;
            writer.write_sample(f.right)?;
        }
        written += n as u64;
    }
    writer.finalize().context("finishing the wav file")?;
    engine.dispose();

    info!("rendered {written} frames of {} to {} (peak {peak:.3})", opts.mood, path.display());
    Ok(RenderSummary { frames: written, peak })
}
