// Schroeder style reverb: parallel damped combs into series allpasses, with a pre-delay and a
// block of early reflection taps in front. The expensive part (buffers, tap table) is computed on
// a worker thread; the stage isn't connectable until `await_ready` has collected it.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use log::{debug, error};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::Effect;
use super::delay::DelayLine;
use crate::audio::error::BuildError;
use crate::audio::frame::StereoFrame;

const STAGE: &str = "reverb";

// comb and allpass lengths in seconds, right channel gets a small spread
const COMB_TIMES: [f32; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
const ALLPASS_TIMES: [f32; 2] = [0.005, 0.0017];
const ALLPASS_GAIN: f32 = 0.7;
const STEREO_SPREAD: f32 = 0.00052;
const EARLY_TAPS: usize = 12;
const EARLY_WINDOW: f32 = 0.08;
const DAMPING: f32 = 0.3;
const MAX_DECAY: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReverbParams {
    pub decay: f32, // seconds to fall 60 dB
    pub pre_delay: f32,
    pub wet: f32,
}

impl ReverbParams {
    pub const fn new(decay: f32, pre_delay: f32, wet: f32) -> Self {
        Self { decay, pre_delay, wet }
    }
}

struct Comb {
    line: DelayLine,
    length: f32,
    feedback: f32,
    damp_state: f32,
}

impl Comb {
    #[inline]
    fn tick(&mut self, x: f32) -> f32 {
        let out = self.line.read(self.length);
        self.damp_state = out * (1.0 - DAMPING) + self.damp_state * DAMPING;
        self.line.write(x + self.damp_state * self.feedback);
        out
    }
}

struct Allpass {
    line: DelayLine,
    length: f32,
}

impl Allpass {
    #[inline]
    fn tick(&mut self, x: f32) -> f32 {
        let delayed = self.line.read(self.length);
        let v = x + delayed * ALLPASS_GAIN;
        self.line.write(v);
        delayed - v * ALLPASS_GAIN
    }
}

struct ReverbChannel {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl ReverbChannel {
    fn tick(&mut self, x: f32) -> f32 {
        let mut sum = 0.0;
        for c in self.combs.iter_mut() {
            sum += c.tick(x);
        }
        let mut y = sum * 0.25;
        for a in self.allpasses.iter_mut() {
            y = a.tick(y);
        }
        y
    }
}

// everything the worker precomputes
struct ReverbKernel {
    pre_delay: DelayLine,
    pre_delay_samples: f32,
    early: DelayLine,
    taps: Vec<(f32, [f32; 2])>, // delay in samples, per channel gain
    channels: [ReverbChannel; 2],
}

impl ReverbKernel {
    fn compute(params: ReverbParams, sample_rate: u32) -> Result<Self, BuildError> {
        if !params.decay.is_finite() || params.decay <= 0.0 || params.decay > MAX_DECAY {
            return Err(BuildError::InvalidParameter {
                stage: STAGE,
                reason: format!("decay must be in (0, {MAX_DECAY}] seconds, got {}", params.decay),
            });
        }
        if !params.pre_delay.is_finite() || !(0.0..=1.0).contains(&params.pre_delay) {
            return Err(BuildError::InvalidParameter {
                stage: STAGE,
                reason: format!("pre-delay must be in [0, 1] seconds, got {}", params.pre_delay),
            });
        }
        let sr = sample_rate as f32;

        let channel = |spread: f32| ReverbChannel {
            combs: COMB_TIMES
                .iter()
                .map(|&t| {
                    let t = t + spread;
                    Comb {
                        line: DelayLine::with_seconds(t, sr),
                        length: t * sr,
                        // reach -60 dB after `decay` seconds
                        feedback: 0.001f32.powf(t / params.decay),
                        damp_state: 0.0,
                    }
                })
                .collect(),
            allpasses: ALLPASS_TIMES
                .iter()
                .map(|&t| Allpass { line: DelayLine::with_seconds(t + spread, sr), length: (t + spread) * sr })
                .collect(),
        };

        // early reflections: random times inside the window, exponentially decaying gains,
        // seeded by the decay so the same params always give the same room
        let mut rng = Pcg32::seed_from_u64(params.decay.to_bits() as u64 ^ sample_rate as u64);
        let mut taps: Vec<(f32, [f32; 2])> = (0..EARLY_TAPS)
            .map(|_| {
                let t = rng.random::<f32>() * EARLY_WINDOW + 0.002;
                let level = 0.001f32.powf(t / params.decay) * 0.6;
                let l = level * (rng.random::<f32>() * 2.0 - 1.0);
                let r = level * (rng.random::<f32>() * 2.0 - 1.0);
                (t * sr, [l, r])
            })
            .collect();
        taps.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self {
            pre_delay: DelayLine::with_seconds(params.pre_delay.max(0.001), sr),
            pre_delay_samples: params.pre_delay * sr,
            early: DelayLine::with_seconds(EARLY_WINDOW + 0.01, sr),
            taps,
            channels: [channel(0.0), channel(STEREO_SPREAD)],
        })
    }

    #[inline]
    fn tick(&mut self, f: StereoFrame) -> StereoFrame {
        self.pre_delay.write((f.left + f.right) * 0.5);
        let x = if self.pre_delay_samples < 1.0 {
            (f.left + f.right) * 0.5
        } else {
            self.pre_delay.read(self.pre_delay_samples)
        };
        self.early.write(x);
        let mut early = [0.0; 2];
        for (delay, gain) in self.taps.iter() {
            let s = self.early.read(*delay);
            early[0] += s * gain[0];
            early[1] += s * gain[1];
        }
        StereoFrame {
            left: early[0] + self.channels[0].tick(x),
            right: early[1] + self.channels[1].tick(x),
        }
    }
}

enum ReverbState {
    Pending(Receiver<Result<ReverbKernel, BuildError>>),
    Ready(Box<ReverbKernel>),
    Failed,
}

pub struct Reverb {
    params: ReverbParams,
    state: ReverbState,
}

impl Reverb {
    /// Returns at once; the tail is computed on a worker thread.
    pub fn create(params: ReverbParams, sample_rate: u32) -> Self {
        let (tx, rx) = bounded(1);
        let spawned = thread::Builder::new()
            .name("reverb-tail".into())
            .spawn(move || {
                let _ = tx.send(ReverbKernel::compute(params, sample_rate));
            });
        let state = match spawned {
            Ok(_) => ReverbState::Pending(rx),
            Err(e) => {
                error!("couldn't spawn reverb worker: {e}");
                ReverbState::Failed
            }
        };
        Self { params, state }
    }

    pub fn params(&self) -> ReverbParams {
        self.params
    }
}

impl Effect for Reverb {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        // unready: pass through untouched
        let ReverbState::Ready(kernel) = &mut self.state else {
            return;
        };
        let wet = self.params.wet.clamp(0.0, 1.0);
        for f in buf.iter_mut() {
            let r = kernel.tick(*f);
            *f = f.mix(r, wet);
        }
    }

    fn label(&self) -> &'static str {
        STAGE
    }

    fn is_ready(&self) -> bool {
        matches!(self.state, ReverbState::Ready(_))
    }

    fn await_ready(&mut self, timeout: Duration) -> Result<(), BuildError> {
        let rx = match &self.state {
            ReverbState::Ready(_) => return Ok(()),
            ReverbState::Failed => {
                return Err(BuildError::Worker { stage: STAGE, reason: "worker is gone".into() });
            }
            ReverbState::Pending(rx) => rx.clone(),
        };
        match rx.recv_timeout(timeout) {
            Ok(Ok(kernel)) => {
                debug!("reverb ready (decay {}s)", self.params.decay);
                self.state = ReverbState::Ready(Box::new(kernel));
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = ReverbState::Failed;
                Err(e)
            }
            // still pending; a later call may pick it up
            Err(RecvTimeoutError::Timeout) => Err(BuildError::Timeout { stage: STAGE, waited_ms: timeout.as_millis() }),
            Err(RecvTimeoutError::Disconnected) => {
                self.state = ReverbState::Failed;
                Err(BuildError::Worker { stage: STAGE, reason: "worker exited without a result".into() })
            }
        }
    }
}
