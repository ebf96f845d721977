// Boundaries to collaborators the session drives but doesn't own: the field-recordings streaming
// channel, and the platform keep-alive that stops the OS from suspending a playing session.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::audio_api::{AudioCommand, DeckCommand};
use crate::loader::sample_loader;

/// Field-recordings transport. Every call returns the audio commands it needs sent.
pub trait StreamingChannel {
    fn is_ready(&self) -> bool;
    fn is_playing(&self) -> bool;
    fn play(&mut self) -> Vec<AudioCommand>;
    fn pause(&mut self) -> Vec<AudioCommand>;
    /// 0 to 100, clamped.
    fn set_volume(&mut self, volume: u8) -> Vec<AudioCommand>;
    fn next_track(&mut self) -> Vec<AudioCommand>;
    fn prev_track(&mut self) -> Vec<AudioCommand>;
    fn current_title(&self) -> Option<String>;
}

pub trait KeepAlive {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// Desktop terminals don't get suspended, so there is nothing to hold open.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoKeepAlive;

impl KeepAlive for NoKeepAlive {
    fn enable(&mut self) {}
    fn disable(&mut self) {}
}

pub const FIELD_DIR: &str = "field-recordings";
pub const DEFAULT_FIELD_VOLUME: u8 = 60;

/// A playlist of WAV files looped through the engine's deck.
#[derive(Debug)]
pub struct FieldRecordings {
    tracks: Vec<PathBuf>,
    current: usize,
    sample_rate: u32,
    ready: bool,
    playing: bool,
    volume: u8,
}

impl FieldRecordings {
    /// Not ready until `load` succeeds.
    pub fn new(sample_rate: u32) -> Self {
        Self { tracks: Vec::new(), current: 0, sample_rate, ready: false, playing: false, volume: DEFAULT_FIELD_VOLUME }
    }

    /// Indexes `dir` and decodes the first track. Success is the readiness event.
    pub fn load(&mut self, dir: &Path) -> anyhow::Result<Vec<AudioCommand>> {
        let tracks = sample_loader::index_wav_in_dir(dir)?;
        anyhow::ensure!(!tracks.is_empty(), "no wav files in {}", dir.display());
        self.tracks = tracks;
        self.current = 0;
        let mut cmds = self.decode_current()?;
        cmds.push(AudioCommand::Deck(DeckCommand::SetVolume(self.volume as f32 / 100.0)));
        self.ready = true;
        info!("field recordings ready: {} tracks", self.tracks.len());
        Ok(cmds)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    fn decode_current(&self) -> anyhow::Result<Vec<AudioCommand>> {
        let path = &self.tracks[self.current];
        let (track, buffer) = sample_loader::load(path, self.sample_rate)?;
        Ok(vec![AudioCommand::Deck(DeckCommand::Load { track, buffer })])
    }

    fn step(&mut self, forward: bool) -> Vec<AudioCommand> {
        if !self.ready {
            warn!("field recordings not ready, track change ignored");
            return Vec::new();
        }
        let n = self.tracks.len();
        self.current = if forward { (self.current + 1) % n } else { (self.current + n - 1) % n };
        match self.decode_current() {
            Ok(cmds) => cmds,
            Err(e) => {
                warn!("couldn't load {}: {e:#}", self.tracks[self.current].display());
                Vec::new()
            }
        }
    }
}

impl StreamingChannel for FieldRecordings {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) -> Vec<AudioCommand> {
        if !self.ready {
            warn!("field recordings not ready, play ignored");
            return Vec::new();
        }
        self.playing = true;
        vec![AudioCommand::Deck(DeckCommand::Play)]
    }

    fn pause(&mut self) -> Vec<AudioCommand> {
        if !self.ready {
            return Vec::new();
        }
        self.playing = false;
        vec![AudioCommand::Deck(DeckCommand::Pause)]
    }

    fn set_volume(&mut self, volume: u8) -> Vec<AudioCommand> {
        self.volume = volume.min(100);
        if !self.ready {
            // kept, and applied once the channel comes up
            return Vec::new();
        }
        vec![AudioCommand::Deck(DeckCommand::SetVolume(self.volume as f32 / 100.0))]
    }

    fn next_track(&mut self) -> Vec<AudioCommand> {
        self.step(true)
    }

    fn prev_track(&mut self) -> Vec<AudioCommand> {
        self.step(false)
    }

    fn current_title(&self) -> Option<String> {
        if !self.ready {
            return None;
        }
        self.tracks
            .get(self.current)
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().replace(['-', '_'], " "))
    }
}
