use super::Effect;
use super::delay::DelayLine;
use super::filter::{FilterCore, FilterKind, FilterParams, Rolloff};
use crate::audio::frame::StereoFrame;

const CONTROL_RATE: usize = 32; // sweeps retune the filters every this many frames

/// Sine LFO; `phase` is in cycles [0, 1).
#[derive(Clone, Copy, Debug)]
pub(crate) struct Lfo {
    phase: f32,
    step: f32,
}

impl Lfo {
    pub(crate) fn new(rate_hz: f32, sample_rate: f32) -> Self {
        Self { phase: 0.0, step: rate_hz.max(0.0) / sample_rate }
    }

    #[inline]
    pub(crate) fn value_at(&self, offset_cycles: f32) -> f32 {
        (std::f32::consts::TAU * (self.phase + offset_cycles)).sin()
    }

    #[inline]
    pub(crate) fn advance(&mut self, frames: usize) {
        self.phase = (self.phase + self.step * frames as f32).fract();
    }
}

// base * 2^(octaves * unit), unit in [0,1]
fn sweep(base: f32, octaves: f32, lfo: f32) -> f32 {
    base * 2f32.powf(octaves * (lfo + 1.0) * 0.5)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChorusParams {
    pub frequency: f32,
    pub delay_ms: f32,
    pub depth: f32,
    pub feedback: f32,
    pub spread_degrees: f32,
    pub wet: f32,
}

impl ChorusParams {
    pub const fn new(frequency: f32, delay_ms: f32, depth: f32, feedback: f32, wet: f32) -> Self {
        Self { frequency, delay_ms, depth, feedback, spread_degrees: 180.0, wet }
    }
}

pub struct Chorus {
    lines: [DelayLine; 2],
    lfo: Lfo,
    spread: f32,
    delay: f32,
    depth: f32,
    feedback: f32,
    wet: f32,
}

impl Chorus {
    pub fn new(p: ChorusParams, sample_rate: f32) -> Self {
        let delay = (p.delay_ms.max(0.1) / 1000.0) * sample_rate;
        let max = (delay * 2.0).ceil() as usize + 4;
        Self {
            lines: [DelayLine::new(max), DelayLine::new(max)],
            lfo: Lfo::new(p.frequency, sample_rate),
            spread: p.spread_degrees / 360.0,
            delay,
            depth: p.depth.clamp(0.0, 1.0),
            feedback: p.feedback.clamp(0.0, 0.9),
            wet: p.wet.clamp(0.0, 1.0),
        }
    }
}

impl Effect for Chorus {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let mut wet = [0.0; 2];
            let input = [f.left, f.right];
            for ch in 0..2 {
                let m = self.lfo.value_at(self.spread * ch as f32);
                let d = self.delay * (1.0 + 0.5 * self.depth * m);
                wet[ch] = self.lines[ch].read(d);
                self.lines[ch].write(input[ch] + wet[ch] * self.feedback);
            }
            self.lfo.advance(1);
            *f = f.mix(StereoFrame { left: wet[0], right: wet[1] }, self.wet);
        }
    }

    fn label(&self) -> &'static str {
        "chorus"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoFilterParams {
    pub frequency: f32,
    pub base_frequency: f32,
    pub octaves: f32,
    pub q: f32,
    pub rolloff: Rolloff,
    pub wet: f32,
}

impl AutoFilterParams {
    pub const fn new(frequency: f32, base_frequency: f32, octaves: f32, q: f32, wet: f32) -> Self {
        Self { frequency, base_frequency, octaves, q, rolloff: Rolloff::Db12, wet }
    }

    pub const fn steep(mut self) -> Self {
        self.rolloff = Rolloff::Db24;
        self
    }
}

/// Lowpass whose cutoff an LFO sweeps between base and base * 2^octaves.
pub struct AutoFilter {
    core: FilterCore,
    lfo: Lfo,
    params: AutoFilterParams,
    sample_rate: f32,
}

impl AutoFilter {
    pub fn new(p: AutoFilterParams, sample_rate: f32) -> Self {
        let lfo = Lfo::new(p.frequency, sample_rate);
        let start = sweep(p.base_frequency, p.octaves, lfo.value_at(0.0));
        let mut params = FilterParams::lowpass(start, p.q);
        params.rolloff = p.rolloff;
        Self { core: FilterCore::new(params, sample_rate), lfo, params: p, sample_rate }
    }
}

impl Effect for AutoFilter {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for chunk in buf.chunks_mut(CONTROL_RATE) {
            let cutoff = sweep(self.params.base_frequency, self.params.octaves, self.lfo.value_at(0.0));
            self.core.retune(FilterKind::Lowpass, cutoff, self.params.q, self.sample_rate);
            for f in chunk.iter_mut() {
                let filtered = self.core.tick_frame(*f);
                *f = f.mix(filtered, self.params.wet);
            }
            self.lfo.advance(chunk.len());
        }
    }

    fn label(&self) -> &'static str {
        "autofilter"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoPannerParams {
    pub frequency: f32,
    pub depth: f32,
    pub wet: f32,
}

pub struct AutoPanner {
    lfo: Lfo,
    depth: f32,
    wet: f32,
}

impl AutoPanner {
    pub fn new(p: AutoPannerParams, sample_rate: f32) -> Self {
        Self {
            lfo: Lfo::new(p.frequency, sample_rate),
            depth: p.depth.clamp(0.0, 1.0),
            wet: p.wet.clamp(0.0, 1.0),
        }
    }
}

impl Effect for AutoPanner {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            // equal power pan, pan in [-1, 1]
            let pan = self.depth * self.lfo.value_at(0.0);
            let theta = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
            let panned = StereoFrame { left: f.left * theta.cos(), right: f.right * theta.sin() };
            *f = f.mix(panned, self.wet);
            self.lfo.advance(1);
        }
    }

    fn label(&self) -> &'static str {
        "autopan"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaserParams {
    pub frequency: f32,
    pub octaves: f32,
    pub base_frequency: f32,
    pub q: f32,
    pub wet: f32,
}

const PHASER_STAGES: usize = 4;

// first order allpass, one state per channel
#[derive(Clone, Copy, Debug, Default)]
struct Allpass {
    x1: [f32; 2],
    y1: [f32; 2],
}

impl Allpass {
    #[inline]
    fn tick(&mut self, a: f32, x: f32, ch: usize) -> f32 {
        let y = a * x + self.x1[ch] - a * self.y1[ch];
        self.x1[ch] = x;
        self.y1[ch] = y;
        y
    }
}

pub struct Phaser {
    stages: [Allpass; PHASER_STAGES],
    lfo: Lfo,
    params: PhaserParams,
    sample_rate: f32,
}

impl Phaser {
    pub fn new(p: PhaserParams, sample_rate: f32) -> Self {
        Self {
            stages: [Allpass::default(); PHASER_STAGES],
            lfo: Lfo::new(p.frequency, sample_rate),
            params: p,
            sample_rate,
        }
    }

    fn coefficient(&self, lfo: f32) -> f32 {
        let fc = sweep(self.params.base_frequency, self.params.octaves, lfo).min(self.sample_rate * 0.45);
        let t = (std::f32::consts::PI * fc / self.sample_rate).tan();
        (t - 1.0) / (t + 1.0)
    }
}

impl Effect for Phaser {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        // higher q narrows the notches by pulling the wet mix toward the allpass output
        let resonance = (self.params.q / (1.0 + self.params.q)).clamp(0.0, 0.9);
        for chunk in buf.chunks_mut(CONTROL_RATE) {
            let a = [self.coefficient(self.lfo.value_at(0.0)), self.coefficient(self.lfo.value_at(0.25))];
            for f in chunk.iter_mut() {
                let mut out = [f.left, f.right];
                for (ch, sample) in out.iter_mut().enumerate() {
                    for stage in self.stages.iter_mut() {
                        *sample = stage.tick(a[ch], *sample, ch);
                    }
                }
                let phased = StereoFrame {
                    left: f.left * (1.0 - resonance) + out[0] * resonance,
                    right: f.right * (1.0 - resonance) + out[1] * resonance,
                };
                *f = f.mix(phased, self.params.wet);
            }
            self.lfo.advance(chunk.len());
        }
    }

    fn label(&self) -> &'static str {
        "phaser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lfo_wraps_and_stays_in_range() {
        let mut lfo = Lfo::new(2.0, 100.0);
        for _ in 0..500 {
            let v = lfo.value_at(0.0);
            assert!((-1.0..=1.0).contains(&v));
            lfo.advance(1);
        }
        assert!((0.0..1.0).contains(&lfo.phase));
    }

    #[test]
    fn autopan_center_is_equal_power() {
        let mut pan = AutoPanner::new(AutoPannerParams { frequency: 0.0, depth: 0.9, wet: 1.0 }, 48_000.0);
        let mut buf = vec![StereoFrame::mono(1.0); 4];
        pan.process(&mut buf);
        let f = buf[3];
        assert!((f.left - f.right).abs() < 1e-5);
        assert!((f.left * f.left + f.right * f.right - 1.0).abs() < 1e-4);
    }

    #[test]
    fn chorus_dry_mix_is_transparent() {
        let mut c = Chorus::new(ChorusParams::new(0.25, 3.5, 0.7, 0.08, 0.0), 48_000.0);
        let mut buf: Vec<_> = (0..256).map(|i| StereoFrame::mono((i as f32 * 0.01).sin())).collect();
        let before = buf.clone();
        c.process(&mut buf);
        assert_eq!(buf, before);
    }

    #[test]
    fn sweep_spans_the_octave_range() {
        assert!((sweep(600.0, 2.5, -1.0) - 600.0).abs() < 1e-3);
        assert!((sweep(600.0, 2.5, 1.0) - 600.0 * 2f32.powf(2.5)).abs() < 1e-2);
    }
}
