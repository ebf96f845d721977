// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    pub fn mono(v: f32) -> Self {
        Self { left: v, right: v }
    }

    pub fn scaled(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }

    pub fn peak(self) -> f32 {
        self.left.abs().max(self.right.abs())
    }

    // dry/wet crossfade, 0.0 = all self, 1.0 = all `wet`
    pub fn mix(self, wet: StereoFrame, amount: f32) -> Self {
        Self {
            left: self.left * (1.0 - amount) + wet.left * amount,
            right: self.right * (1.0 - amount) + wet.right * amount,
        }
    }
}

impl std::ops::Add for StereoFrame {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            left: self.left + rhs.left,
            right: self.right + rhs.right,
        }
    }
}

impl std::ops::AddAssign for StereoFrame {
    fn add_assign(&mut self, rhs: Self) {
        self.left += rhs.left;
        self.right += rhs.right;
    }
}

pub fn clear(buf: &mut [StereoFrame]) {
    buf.fill(StereoFrame::zero());
}

pub fn peak(buf: &[StereoFrame]) -> f32 {
    buf.iter().fold(0.0, |acc, f| acc.max(f.peak()))
}
