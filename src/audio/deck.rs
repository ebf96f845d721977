use super::frame::StereoFrame;
use super::ids::TrackId;
use super::sample_buffer::SampleBuffer;
use crate::audio_api::DeckCommand;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Loops the current field recording into the mix. Buffers are decoded off the audio thread and
/// arrive ready to play.
#[derive(Debug)]
pub struct Deck {
    track: Option<TrackId>,
    buffer: SampleBuffer,
    pos: f64,
    rate: f64, // playback step in frames, 1.0 once the loader has resampled
    volume: f32,
    playing: bool,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    pub fn new() -> Self {
        Self {
            track: None,
            buffer: SampleBuffer::default(),
            pos: 0.0,
            rate: 1.0,
            volume: 0.0,
            playing: false,
        }
    }

    pub fn handle(&mut self, cmd: DeckCommand) {
        match cmd {
            DeckCommand::Load { track, buffer } => {
                self.track = Some(track);
                self.buffer = buffer;
                self.pos = 0.0;
            }
            DeckCommand::Play => self.playing = true,
            DeckCommand::Pause => self.playing = false,
            DeckCommand::SetVolume(v) => {
                self.volume = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
            }
        }
    }

    pub fn track(&self) -> Option<TrackId> {
        self.track
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn position(&self) -> f64 {
        self.pos
    }

    /// Adds the looping track into `out`.
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        let len = self.buffer.data.len();
        if !self.playing || len == 0 {
            return;
        }
        let data = &self.buffer.data;
        for frame in out.iter_mut() {
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            let s0 = data[i];
            let s1 = data[(i + 1) % len]; // wraps so the loop seam interpolates too
            frame.left += lerp(s0.left, s1.left, frac) * self.volume;
            frame.right += lerp(s0.right, s1.right, frac) * self.volume;

            self.pos += self.rate;
            while self.pos >= len as f64 {
                self.pos -= len as f64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ids::next_track_id;

    fn loaded(frames: &[f32]) -> Deck {
        let mut deck = Deck::new();
        let buffer = SampleBuffer::from_frames(frames.iter().map(|&v| StereoFrame::mono(v)).collect());
        deck.handle(DeckCommand::Load { track: next_track_id(), buffer });
        deck.handle(DeckCommand::SetVolume(1.0));
        deck
    }

    #[test]
    fn paused_deck_adds_nothing() {
        let mut deck = loaded(&[1.0, 1.0]);
        let mut out = vec![StereoFrame::mono(0.25); 4];
        deck.render_into(&mut out);
        assert!(out.iter().all(|f| f.left == 0.25));
    }

    #[test]
    fn playing_deck_loops_the_track() {
        let mut deck = loaded(&[0.1, 0.2, 0.3]);
        deck.handle(DeckCommand::Play);
        let mut out = vec![StereoFrame::zero(); 7];
        deck.render_into(&mut out);
        let lefts: Vec<f32> = out.iter().map(|f| f.left).collect();
        for (got, want) in lefts.iter().zip([0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]) {
            assert!((got - want).abs() < 1e-6);
        }
        assert_eq!(deck.position(), 1.0);
    }

    #[test]
    fn volume_scales_and_clamps() {
        let mut deck = loaded(&[1.0]);
        deck.handle(DeckCommand::Play);
        deck.handle(DeckCommand::SetVolume(0.2));
        let mut out = vec![StereoFrame::zero(); 2];
        deck.render_into(&mut out);
        assert!((out[0].left - 0.2).abs() < 1e-6);
        deck.handle(DeckCommand::SetVolume(7.0));
        assert_eq!(deck.volume(), 1.0);
    }

    #[test]
    fn loading_a_new_track_rewinds() {
        let mut deck = loaded(&[0.0; 10]);
        deck.handle(DeckCommand::Play);
        let mut out = vec![StereoFrame::zero(); 5];
        deck.render_into(&mut out);
        let next = next_track_id();
        deck.handle(DeckCommand::Load { track: next, buffer: SampleBuffer::from_frames(vec![StereoFrame::zero(); 3]) });
        assert_eq!(deck.position(), 0.0);
        assert_eq!(deck.track(), Some(next));
        assert!(deck.is_playing());
    }
}
