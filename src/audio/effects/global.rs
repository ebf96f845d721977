// Shared send pool. Built once with the audio system and kept around for voices that want a
// common space; the default voice chains don't route through it.

use std::time::{Duration, Instant};

use super::{
    Chorus, ChorusParams, DelayParams, Effect, Filter, FilterParams, PingPongDelay, Reverb,
    ReverbParams,
};
use crate::audio::error::BuildError;
use crate::audio::frame::StereoFrame;

pub const REVERB: ReverbParams = ReverbParams::new(8.0, 0.01, 1.0);
pub const DELAY: DelayParams = DelayParams::new(0.25, 0.2, 0.3); // 8n at 120
pub const FILTER: FilterParams = FilterParams::lowpass(800.0, 1.0);
pub const CHORUS: ChorusParams = ChorusParams::new(1.5, 3.5, 0.7, 0.0, 1.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendKind {
    Reverb,
    Delay,
    Filter,
    Chorus,
}

pub struct GlobalEffects {
    reverb: Reverb,
    delay: PingPongDelay,
    filter: Filter,
    chorus: Chorus,
}

impl GlobalEffects {
    pub fn create(sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        Self {
            reverb: Reverb::create(REVERB, sample_rate),
            delay: PingPongDelay::new(DELAY, sr),
            filter: Filter::new(FILTER, sr),
            chorus: Chorus::new(CHORUS, sr),
        }
    }

    pub fn await_ready(&mut self, timeout: Duration) -> Result<(), BuildError> {
        let start = Instant::now();
        for stage in self.stages_mut() {
            let left = timeout.saturating_sub(start.elapsed());
            stage.await_ready(left)?;
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.reverb.is_ready()
            && self.delay.is_ready()
            && self.filter.is_ready()
            && self.chorus.is_ready()
    }

    /// Runs one pooled effect over `buf` in place.
    pub fn send(&mut self, kind: SendKind, buf: &mut [StereoFrame]) {
        match kind {
            SendKind::Reverb => self.reverb.process(buf),
            SendKind::Delay => self.delay.process(buf),
            SendKind::Filter => self.filter.process(buf),
            SendKind::Chorus => self.chorus.process(buf),
        }
    }

    fn stages_mut(&mut self) -> [&mut dyn Effect; 4] {
        [&mut self.reverb, &mut self.delay, &mut self.filter, &mut self.chorus]
    }
}
