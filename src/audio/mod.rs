use std::cell::Cell;
use std::time::Duration;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{error, info, warn};

use crate::audio_api::AudioCommand;
use crate::music::SeededRandom;

pub mod chain;
pub mod deck;
pub mod effects;
pub mod engine;
pub mod error;
pub mod frame;
pub mod ids;
pub mod instruments;
pub mod master;
pub mod render;
pub mod sample_buffer;
pub mod scheduler;
pub mod synth;
pub mod system;
pub mod transport;

pub use engine::Engine;
pub use error::BuildError;
pub use frame::StereoFrame;
pub use ids::{TrackId, next_track_id};
pub use instruments::BuildContext;
pub use master::MasterBusHandle;
pub use sample_buffer::SampleBuffer;
pub use system::AudioSystem;

const COMMAND_QUEUE: usize = 1024;
const CALLBACK_SCRATCH: usize = 4096; // frames; bigger device buffers are rendered in pieces
const STOP_SEND_TIMEOUT: Duration = Duration::from_millis(500);

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    master: Option<MasterBusHandle>, // None when the graph didn't build
    sample_rate: u32,
    running: Cell<bool>,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    /// True once the audio system built. Until then playback requests are refused upstream.
    pub fn is_ready(&self) -> bool {
        self.master.is_some()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The output stream is built paused; this resumes it. Returns whether it's running.
    pub fn ensure_running(&self) -> bool {
        if self.running.get() {
            return true;
        }
        match self._output_stream.play() {
            Ok(()) => {
                self.running.set(true);
                info!("output stream resumed");
                true
            }
            Err(e) => {
                error!("couldn't resume output stream: {e}");
                false
            }
        }
    }

    /// False when the command was dropped; a dropped `StartPlayback` means nothing will sound.
    pub fn send(&self, cmd: AudioCommand) -> bool {
        match cmd {
            // straight into the shared gain, no queue hop
            AudioCommand::SetMasterVolume(v) => match &self.master {
                Some(master) => {
                    master.set_volume(v);
                    true
                }
                None => false,
            },
            AudioCommand::StartPlayback { .. } => {
                if !self.ensure_running() {
                    warn!("dropping start, output stream isn't running");
                    return false;
                }
                self.enqueue(cmd)
            }
            cmd => self.enqueue(cmd),
        }
    }

    fn enqueue(&self, cmd: AudioCommand) -> bool {
        enqueue(&self.tx, cmd, STOP_SEND_TIMEOUT)
    }
}

fn enqueue(tx: &Sender<AudioCommand>, cmd: AudioCommand, stop_timeout: Duration) -> bool {
    match tx.try_send(cmd) {
        Ok(()) => true,
        // a stop has to land; wait for the callback to drain a block
        Err(TrySendError::Full(cmd @ AudioCommand::StopPlayback)) => match tx.send_timeout(cmd, stop_timeout) {
            Ok(()) => true,
            Err(e) => {
                error!("couldn't queue stop: {e}");
                false
            }
        },
        Err(TrySendError::Full(cmd)) => {
            warn!("audio queue full, dropped {cmd:?}");
            false
        }
        Err(TrySendError::Disconnected(cmd)) => {
            error!("audio thread is gone, dropped {cmd:?}");
            false
        }
    }
}

pub fn start_audio(master_volume: f32) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    // a graph that fails to build leaves the shell running with audio unavailable
    let seed = rand::random::<u64>();
    let system = match AudioSystem::initialize(master_volume, &BuildContext { sample_rate, seed }) {
        Ok(sys) => Some(sys),
        Err(e) => {
            error!("couldn't start audio: {e}");
            None
        }
    };
    let master = system.as_ref().map(|s| s.master_handle());
    let engine = Engine::new(system, sample_rate, Box::new(SeededRandom::new(seed)));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(&device, &config.into(), rx, engine, channels)?;
            // held suspended until the first playback start
            output_stream.pause().context("failed to pause output stream")?;
            info!("output ready: {sample_rate} Hz, {channels} channels");

            Ok(AudioHandle {
                tx,
                master,
                sample_rate,
                running: Cell::new(false),
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut scratch = vec![StereoFrame::zero(); CALLBACK_SCRATCH];
    let err_fn = |err| error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }
            for out in data.chunks_mut(CALLBACK_SCRATCH * channels.max(1)) {
                let n = out.len() / channels.max(1);
                let frames = &mut scratch[..n];
                engine.render_block(frames);
                interleave(frames, out, channels);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// stereo frames to the device layout; mono gets the average, extra channels stay silent
fn interleave(frames: &[StereoFrame], out: &mut [f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            for (o, f) in out.iter_mut().zip(frames) {
                *o = (f.left + f.right) * 0.5;
            }
        }
        _ => {
            for (o, f) in out.chunks_exact_mut(channels).zip(frames) {
                o[0] = f.left;
                o[1] = f.right;
                for extra in o[2..].iter_mut() {
                    *extra = 0.0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_handles_mono_stereo_and_surround() {
        let frames = [StereoFrame { left: 0.2, right: 0.4 }, StereoFrame { left: -1.0, right: 1.0 }];

        let mut mono = [9.0; 2];
        interleave(&frames, &mut mono, 1);
        assert!((mono[0] - 0.3).abs() < 1e-6 && mono[1] == 0.0);

        let mut stereo = [9.0; 4];
        interleave(&frames, &mut stereo, 2);
        assert_eq!(stereo, [0.2, 0.4, -1.0, 1.0]);

        let mut quad = [9.0; 8];
        interleave(&frames, &mut quad, 4);
        assert_eq!(quad, [0.2, 0.4, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn a_full_queue_drops_edits_but_waits_for_a_stop() {
        let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1);
        assert!(enqueue(&tx, AudioCommand::SetTempo(70.0), Duration::ZERO));
        assert!(!enqueue(&tx, AudioCommand::SetTempo(80.0), Duration::ZERO));

        let drain = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let first = rx.recv().unwrap();
            let second = rx.recv().unwrap();
            (first, second)
        });
        assert!(enqueue(&tx, AudioCommand::StopPlayback, Duration::from_secs(5)));
        let (first, second) = drain.join().unwrap();
        assert!(matches!(first, AudioCommand::SetTempo(t) if t == 70.0));
        assert!(matches!(second, AudioCommand::StopPlayback));
    }

    #[test]
    fn a_stop_gives_up_once_the_audio_thread_is_gone() {
        let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1);
        assert!(enqueue(&tx, AudioCommand::SetTempo(70.0), Duration::ZERO));
        drop(rx);
        assert!(!enqueue(&tx, AudioCommand::StopPlayback, Duration::from_millis(10)));
    }
}
