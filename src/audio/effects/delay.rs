use super::Effect;
use crate::audio::frame::StereoFrame;

const MAX_DELAY_SECONDS: f32 = 2.0;

/// Ring buffer with fractional (linearly interpolated) reads.
pub(crate) struct DelayLine {
    buf: Vec<f32>,
    pos: usize,
}

impl DelayLine {
    pub(crate) fn new(max_samples: usize) -> Self {
        Self { buf: vec![0.0; max_samples.max(1) + 2], pos: 0 }
    }

    pub(crate) fn with_seconds(seconds: f32, sample_rate: f32) -> Self {
        Self::new((seconds * sample_rate).ceil() as usize)
    }

    #[inline]
    pub(crate) fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buf.len();
        let d = delay_samples.clamp(1.0, (len - 2) as f32);
        let whole = d.floor();
        let frac = d - whole;
        // a delay of 1 is the most recent write
        let i0 = (self.pos + len + 1 - whole as usize) % len;
        let i1 = (i0 + len - 1) % len;
        self.buf[i0] * (1.0 - frac) + self.buf[i1] * frac
    }

    #[inline]
    pub(crate) fn write(&mut self, x: f32) {
        self.pos = (self.pos + 1) % self.buf.len();
        self.buf[self.pos] = x;
    }

    pub(crate) fn clear(&mut self) {
        self.buf.fill(0.0);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayParams {
    pub time: f32, // seconds
    pub feedback: f32,
    pub wet: f32,
}

impl DelayParams {
    pub const fn new(time: f32, feedback: f32, wet: f32) -> Self {
        Self { time, feedback, wet }
    }
}

pub struct FeedbackDelay {
    lines: [DelayLine; 2],
    delay: f32,
    feedback: f32,
    wet: f32,
}

impl FeedbackDelay {
    pub fn new(p: DelayParams, sample_rate: f32) -> Self {
        let time = p.time.clamp(0.0, MAX_DELAY_SECONDS);
        Self {
            lines: [
                DelayLine::with_seconds(MAX_DELAY_SECONDS, sample_rate),
                DelayLine::with_seconds(MAX_DELAY_SECONDS, sample_rate),
            ],
            delay: time * sample_rate,
            feedback: p.feedback.clamp(0.0, 0.95),
            wet: p.wet.clamp(0.0, 1.0),
        }
    }
}

impl Effect for FeedbackDelay {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let dl = self.lines[0].read(self.delay);
            let dr = self.lines[1].read(self.delay);
            self.lines[0].write(f.left + dl * self.feedback);
            self.lines[1].write(f.right + dr * self.feedback);
            *f = f.mix(StereoFrame { left: dl, right: dr }, self.wet);
        }
    }

    fn label(&self) -> &'static str {
        "delay"
    }
}

/// Echoes bounce left, right, left... each bounce one delay time later.
pub struct PingPongDelay {
    left: DelayLine,
    right: DelayLine,
    delay: f32,
    feedback: f32,
    wet: f32,
}

impl PingPongDelay {
    pub fn new(p: DelayParams, sample_rate: f32) -> Self {
        let time = p.time.clamp(0.0, MAX_DELAY_SECONDS);
        Self {
            left: DelayLine::with_seconds(MAX_DELAY_SECONDS, sample_rate),
            right: DelayLine::with_seconds(MAX_DELAY_SECONDS, sample_rate),
            delay: time * sample_rate,
            feedback: p.feedback.clamp(0.0, 0.95),
            wet: p.wet.clamp(0.0, 1.0),
        }
    }
}

impl Effect for PingPongDelay {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let dl = self.left.read(self.delay);
            let dr = self.right.read(self.delay);
            let input = (f.left + f.right) * 0.5;
            self.left.write(input + dr * self.feedback);
            self.right.write(dl);
            *f = f.mix(StereoFrame { left: dl, right: dr }, self.wet);
        }
    }

    fn label(&self) -> &'static str {
        "pingpong"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchShiftParams {
    pub semitones: f32,
    pub window: f32, // seconds
    pub feedback: f32,
    pub wet: f32,
}

impl PitchShiftParams {
    pub const fn new(semitones: f32, feedback: f32) -> Self {
        Self { semitones, window: 0.1, feedback, wet: 1.0 }
    }
}

/// Two crossfaded taps sweeping through a short delay; the sweep rate sets the pitch ratio.
pub struct PitchShift {
    lines: [DelayLine; 2],
    phase: f32,
    step: f32,
    window: f32,
    feedback: f32,
    wet: f32,
}

impl PitchShift {
    pub fn new(p: PitchShiftParams, sample_rate: f32) -> Self {
        let ratio = 2f32.powf(p.semitones / 12.0);
        let window = (p.window.clamp(0.01, 0.5) * sample_rate).max(2.0);
        Self {
            lines: [
                DelayLine::new(window as usize + 4),
                DelayLine::new(window as usize + 4),
            ],
            phase: 0.0,
            step: (1.0 - ratio) / window,
            window,
            feedback: p.feedback.clamp(0.0, 0.9),
            wet: p.wet.clamp(0.0, 1.0),
        }
    }

    #[inline]
    fn taps(&self, ch: usize) -> f32 {
        let mut out = 0.0;
        for offset in [0.0, 0.5] {
            let p = (self.phase + offset).rem_euclid(1.0);
            // sin^2 windows of the two taps sum to one
            let w = (std::f32::consts::PI * p).sin().powi(2);
            out += self.lines[ch].read(1.0 + p * self.window) * w;
        }
        out
    }
}

impl Effect for PitchShift {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let wl = self.taps(0);
            let wr = self.taps(1);
            self.lines[0].write(f.left + wl * self.feedback);
            self.lines[1].write(f.right + wr * self.feedback);
            self.phase = (self.phase + self.step).rem_euclid(1.0);
            *f = f.mix(StereoFrame { left: wl, right: wr }, self.wet);
        }
    }

    fn label(&self) -> &'static str {
        "pitchshift"
    }
}
