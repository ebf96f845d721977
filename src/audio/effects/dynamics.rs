use super::{Effect, db_to_gain, gain_to_db, time_coefficient};
use crate::audio::frame::StereoFrame;

const FLOOR_DB: f32 = -120.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack: f32,  // seconds
    pub release: f32, // seconds
    pub knee_db: f32,
}

impl CompressorParams {
    pub const fn new(threshold_db: f32, ratio: f32, attack: f32, release: f32) -> Self {
        Self { threshold_db, ratio, attack, release, knee_db: 30.0 }
    }

    pub const fn knee(mut self, knee_db: f32) -> Self {
        self.knee_db = knee_db;
        self
    }

    // soft knee static curve, returns gain change in dB (<= 0)
    fn reduction_db(&self, level_db: f32) -> f32 {
        let slope = 1.0 / self.ratio.max(1.0) - 1.0;
        let over = level_db - self.threshold_db;
        let knee = self.knee_db.max(0.0);
        if 2.0 * over <= -knee {
            0.0
        } else if knee > 0.0 && 2.0 * over.abs() <= knee {
            slope * (over + knee / 2.0).powi(2) / (2.0 * knee)
        } else {
            slope * over
        }
    }
}

/// Peak-detecting compressor, both channels share the detector so the image doesn't wander.
pub struct Compressor {
    params: CompressorParams,
    attack: f32,
    release: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(params: CompressorParams, sample_rate: f32) -> Self {
        Self {
            params,
            attack: time_coefficient(params.attack, sample_rate),
            release: time_coefficient(params.release, sample_rate),
            envelope: 0.0,
        }
    }

    #[inline]
    fn tick(&mut self, f: StereoFrame) -> StereoFrame {
        let level = f.peak();
        let coef = if level > self.envelope { self.attack } else { self.release };
        self.envelope = level + coef * (self.envelope - level);
        let level_db = gain_to_db(self.envelope).max(FLOOR_DB);
        let reduction = self.params.reduction_db(level_db);
        if reduction == 0.0 { f } else { f.scaled(db_to_gain(reduction)) }
    }
}

impl Effect for Compressor {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            *f = self.tick(*f);
        }
    }

    fn label(&self) -> &'static str {
        "compressor"
    }
}

/// Fast, high ratio compressor with a hard ceiling at the threshold behind it.
pub struct Limiter {
    comp: Compressor,
    ceiling: f32,
}

impl Limiter {
    pub fn new(threshold_db: f32, sample_rate: f32) -> Self {
        let params = CompressorParams::new(threshold_db, 20.0, 0.003, 0.01).knee(0.0);
        Self { comp: Compressor::new(params, sample_rate), ceiling: db_to_gain(threshold_db) }
    }
}

impl Effect for Limiter {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let out = self.comp.tick(*f);
            f.left = out.left.clamp(-self.ceiling, self.ceiling);
            f.right = out.right.clamp(-self.ceiling, self.ceiling);
        }
    }

    fn label(&self) -> &'static str {
        "limiter"
    }
}

//distortion
pub struct Distortion {
    drive: f32,
    wet: f32,
}

impl Distortion {
    pub fn new(drive: f32, wet: f32) -> Self {
        Self {
            drive: drive.clamp(0.0, 1.0),
            wet: wet.clamp(0.0, 1.0),
        }
    }
}

impl Effect for Distortion {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let pre_gain = 1.0 + self.drive * 10.0;
        for f in buf.iter_mut() {
            let driven = StereoFrame {
                left: (pre_gain * f.left.clamp(-1.0, 1.0)).tanh(),
                right: (pre_gain * f.right.clamp(-1.0, 1.0)).tanh(),
            };
            *f = f.mix(driven, self.wet);
        }
    }

    fn label(&self) -> &'static str {
        "distortion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_curve_is_flat_below_the_knee_and_sloped_above() {
        let p = CompressorParams::new(-26.0, 2.0, 0.03, 0.25).knee(0.0);
        assert_eq!(p.reduction_db(-40.0), 0.0);
        assert!((p.reduction_db(-16.0) + 5.0).abs() < 1e-5);

        let soft = CompressorParams::new(-34.0, 1.6, 0.02, 0.25).knee(8.0);
        let inside = soft.reduction_db(-34.0);
        assert!(inside < 0.0 && inside > soft.reduction_db(-20.0));
    }

    #[test]
    fn limiter_never_exceeds_its_ceiling() {
        let mut lim = Limiter::new(-3.0, 48_000.0);
        let mut buf: Vec<_> = (0..2_000)
            .map(|i| StereoFrame::mono(2.0 * (i as f32 * 0.05).sin()))
            .collect();
        lim.process(&mut buf);
        let ceiling = db_to_gain(-3.0);
        assert!(buf.iter().all(|f| f.peak() <= ceiling + 1e-6));
    }

    #[test]
    fn light_distortion_mostly_leaves_quiet_signal_alone() {
        let mut d = Distortion::new(0.05, 0.12);
        let mut buf = vec![StereoFrame::mono(0.01); 8];
        d.process(&mut buf);
        assert!((buf[0].left - 0.01).abs() < 1e-3);
    }
}
