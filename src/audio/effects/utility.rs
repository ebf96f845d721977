use super::{Effect, db_to_gain};
use crate::audio::frame::StereoFrame;

pub struct Gain {
    gain: f32,
}

impl Gain {
    pub fn from_db(db: f32) -> Self {
        Self { gain: db_to_gain(db) }
    }
}

impl Effect for Gain {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            *f = f.scaled(self.gain);
        }
    }

    fn label(&self) -> &'static str {
        "gain"
    }
}

/// Mid/side width. 0.5 leaves the image alone, 1.0 is all side, 0.0 is mono.
pub struct StereoWidener {
    mid: f32,
    side: f32,
}

impl StereoWidener {
    pub fn new(width: f32) -> Self {
        let w = width.clamp(0.0, 1.0);
        Self { mid: 2.0 * (1.0 - w), side: 2.0 * w }
    }
}

impl Effect for StereoWidener {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let m = (f.left + f.right) * 0.5 * self.mid;
            let s = (f.left - f.right) * 0.5 * self.side;
            f.left = m + s;
            f.right = m - s;
        }
    }

    fn label(&self) -> &'static str {
        "widener"
    }
}
