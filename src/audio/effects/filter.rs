use super::Effect;
use crate::audio::frame::StereoFrame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
}

// -24 is two cascaded biquads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rolloff {
    Db12,
    Db24,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParams {
    pub kind: FilterKind,
    pub frequency: f32,
    pub q: f32,
    pub rolloff: Rolloff,
}

impl FilterParams {
    pub const fn lowpass(frequency: f32, q: f32) -> Self {
        Self { kind: FilterKind::Lowpass, frequency, q, rolloff: Rolloff::Db12 }
    }

    pub const fn highpass(frequency: f32, q: f32) -> Self {
        Self { kind: FilterKind::Highpass, frequency, q, rolloff: Rolloff::Db12 }
    }

    pub const fn steep(mut self) -> Self {
        self.rolloff = Rolloff::Db24;
        self
    }
}

/// RBJ cookbook biquad, transposed direct form II, two independent channels.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: [f32; 2],
    z2: [f32; 2],
}

impl Biquad {
    pub(crate) fn new(kind: FilterKind, frequency: f32, q: f32, sample_rate: f32) -> Self {
        let mut bq = Self::default();
        bq.set(kind, frequency, q, sample_rate);
        bq
    }

    // recomputes coefficients, keeps the state so sweeps don't click
    pub(crate) fn set(&mut self, kind: FilterKind, frequency: f32, q: f32, sample_rate: f32) {
        let f = frequency.clamp(10.0, sample_rate * 0.45);
        let q = q.max(0.05);
        let w0 = std::f32::consts::TAU * f / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;
        let (b0, b1, b2) = match kind {
            FilterKind::Lowpass => ((1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0),
            FilterKind::Highpass => ((1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0),
        };
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    pub(crate) fn tick(&mut self, x: f32, ch: usize) -> f32 {
        let y = self.b0 * x + self.z1[ch];
        self.z1[ch] = self.b1 * x - self.a1 * y + self.z2[ch];
        self.z2[ch] = self.b2 * x - self.a2 * y;
        y
    }

    pub(crate) fn reset(&mut self) {
        self.z1 = [0.0; 2];
        self.z2 = [0.0; 2];
    }
}

/// Cascade of one or two biquads depending on rolloff.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FilterCore {
    stages: [Biquad; 2],
    steep: bool,
}

impl FilterCore {
    pub(crate) fn new(params: FilterParams, sample_rate: f32) -> Self {
        let bq = Biquad::new(params.kind, params.frequency, params.q, sample_rate);
        Self { stages: [bq, bq], steep: params.rolloff == Rolloff::Db24 }
    }

    pub(crate) fn retune(&mut self, kind: FilterKind, frequency: f32, q: f32, sample_rate: f32) {
        for s in self.stages.iter_mut() {
            s.set(kind, frequency, q, sample_rate);
        }
    }

    #[inline]
    pub(crate) fn tick(&mut self, x: f32, ch: usize) -> f32 {
        let y = self.stages[0].tick(x, ch);
        if self.steep { self.stages[1].tick(y, ch) } else { y }
    }

    #[inline]
    pub(crate) fn tick_frame(&mut self, f: StereoFrame) -> StereoFrame {
        StereoFrame { left: self.tick(f.left, 0), right: self.tick(f.right, 1) }
    }

    pub(crate) fn reset(&mut self) {
        for s in self.stages.iter_mut() {
            s.reset();
        }
    }
}

pub struct Filter {
    core: FilterCore,
}

impl Filter {
    pub fn new(params: FilterParams, sample_rate: f32) -> Self {
        Self { core: FilterCore::new(params, sample_rate) }
    }
}

impl Effect for Filter {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            *f = self.core.tick_frame(*f);
        }
    }

    fn label(&self) -> &'static str {
        "filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_rms(filter: &mut Filter, freq: f32, sr: f32) -> f32 {
        let n = (sr * 0.5) as usize;
        let mut buf: Vec<StereoFrame> = (0..n)
            .map(|i| StereoFrame::mono((std::f32::consts::TAU * freq * i as f32 / sr).sin()))
            .collect();
        filter.process(&mut buf);
        // skip the settling part
        let tail = &buf[n / 2..];
        (tail.iter().map(|f| f.left * f.left).sum::<f32>() / tail.len() as f32).sqrt()
    }

    #[test]
    fn lowpass_passes_lows_and_cuts_highs() {
        let sr = 48_000.0;
        let mut lp = Filter::new(FilterParams::lowpass(220.0, 0.8), sr);
        let low = sine_rms(&mut lp, 55.0, sr);
        let mut lp = Filter::new(FilterParams::lowpass(220.0, 0.8), sr);
        let high = sine_rms(&mut lp, 4_000.0, sr);
        assert!(low > 0.6, "low {low}");
        assert!(high < 0.01, "high {high}");
    }

    #[test]
    fn steep_highpass_cuts_harder() {
        let sr = 48_000.0;
        let mut gentle = Filter::new(FilterParams::highpass(500.0, 0.7), sr);
        let mut steep = Filter::new(FilterParams::highpass(500.0, 0.7).steep(), sr);
        assert!(sine_rms(&mut steep, 100.0, sr) < sine_rms(&mut gentle, 100.0, sr));
    }
}
