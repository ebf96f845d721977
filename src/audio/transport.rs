use log::warn;

/// Session clock. Owned by the engine; every loop schedules against it.
#[derive(Clone, Debug)]
pub struct Transport {
    bpm: f64,
    running: bool,
    position_beats: f64,
    sample_rate: u32,
}

impl Transport {
    pub fn new(bpm: f64, sample_rate: u32) -> Self {
        let bpm = if valid_bpm(bpm) { bpm } else { crate::shared::DEFAULT_TEMPO };
        Self { bpm, running: false, position_beats: 0.0, sample_rate }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Applies immediately. Non-positive or non-finite tempos are ignored.
    pub fn set_bpm(&mut self, bpm: f64) -> bool {
        if !valid_bpm(bpm) {
            warn!("ignoring tempo {bpm}");
            return false;
        }
        self.bpm = bpm;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.position_beats = 0.0;
    }

    pub fn position_beats(&self) -> f64 {
        self.position_beats
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn advance(&mut self, frames: usize) {
        if self.running {
            self.position_beats += frames as f64 / self.frames_per_beat();
        }
    }

    pub fn frames_per_beat(&self) -> f64 {
        self.sample_rate as f64 * 60.0 / self.bpm
    }

    pub fn beats_to_frames(&self, beats: f64) -> u64 {
        (beats * self.frames_per_beat()).round().max(0.0) as u64
    }

    pub fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate as f64).round().max(0.0) as u64
    }
}

fn valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_only_while_running() {
        let mut t = Transport::new(60.0, 1_000);
        t.advance(500);
        assert_eq!(t.position_beats(), 0.0);
        t.start();
        t.advance(500);
        assert!((t.position_beats() - 0.5).abs() < 1e-9);
        t.stop();
        assert_eq!(t.position_beats(), 0.0);
    }

    #[test]
    fn tempo_changes_apply_at_once_and_bad_tempos_are_refused() {
        let mut t = Transport::new(60.0, 48_000);
        assert!(t.set_bpm(120.0));
        assert_eq!(t.beats_to_frames(1.0), 24_000);
        assert!(!t.set_bpm(0.0));
        assert!(!t.set_bpm(f64::NAN));
        assert_eq!(t.bpm(), 120.0);
        // any positive number is fine for the core, ui quantization is not its business
        assert!(t.set_bpm(333.3));
    }
}
