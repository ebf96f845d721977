use std::time::{Duration, Instant};

use super::effects::{Effect, StageSpec};
use super::error::BuildError;
use super::frame::StereoFrame;
use super::ids::BusId;
use super::master::MasterBus;

/// Serial effect stages, owned by exactly one voice.
pub struct EffectChain {
    stages: Vec<Box<dyn Effect>>,
    bus: Option<BusId>,
}

impl EffectChain {
    pub fn create(specs: &[StageSpec], sample_rate: u32) -> Self {
        Self { stages: specs.iter().map(|s| s.create(sample_rate)).collect(), bus: None }
    }

    /// Waits for every stage, sharing one deadline across the whole chain.
    pub fn await_ready(&mut self, timeout: Duration) -> Result<(), BuildError> {
        let start = Instant::now();
        for stage in self.stages.iter_mut() {
            stage.await_ready(timeout.saturating_sub(start.elapsed()))?;
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.stages.iter().all(|s| s.is_ready())
    }

    /// Refuses unless every stage is safe to receive signal.
    pub fn connect(&mut self, bus: &MasterBus) -> Result<BusId, BuildError> {
        if let Some(stage) = self.stages.iter().find(|s| !s.is_ready()) {
            return Err(BuildError::NotReady { stage: stage.label() });
        }
        self.bus = Some(bus.id());
        Ok(bus.id())
    }

    pub fn bus(&self) -> Option<BusId> {
        self.bus
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.label()).collect()
    }

    pub fn process(&mut self, buf: &mut [StereoFrame]) {
        for stage in self.stages.iter_mut() {
            stage.process(buf);
        }
    }

    /// Like `process`, but copies the signal after stage `tap_after` into `tap`.
    pub fn process_tapped(&mut self, buf: &mut [StereoFrame], tap_after: usize, tap: &mut [StereoFrame]) {
        for (i, stage) in self.stages.iter_mut().enumerate() {
            stage.process(buf);
            if i == tap_after {
                let n = buf.len().min(tap.len());
                tap[..n].copy_from_slice(&buf[..n]);
            }
        }
    }
}
