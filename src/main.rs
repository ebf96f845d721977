mod tui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::terminal;
use log::{LevelFilter, error, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};

use endless_ambient::audio::{self, AudioHandle};
use endless_ambient::audio::render::{RenderOptions, render_to_wav};
use endless_ambient::audio_api::AudioCommand;
use endless_ambient::field::{FIELD_DIR, FieldRecordings, NoKeepAlive};
use endless_ambient::middle::Middle;
use endless_ambient::pipeline::persistence;
use endless_ambient::pipeline::settings::UserSettings;
use endless_ambient::shared::{DEFAULT_MASTER_VOLUME, DEFAULT_MOOD, DEFAULT_TEMPO, InputEvent};

#[derive(Parser)]
#[command(name = "endless-ambient")]
#[command(version, about = "Generative ambient music in the terminal")]
struct Args {
    /// Session directory; settings go in .endless-ambient/, recordings in field-recordings/
    dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Bounce a session offline to a 32-bit float stereo WAV
    Render {
        /// Output file
        out: PathBuf,

        /// Length in seconds
        #[arg(long, default_value = "60")]
        seconds: f64,

        /// Mood name, e.g. "Dorian" (defaults to the saved or default mood)
        #[arg(long)]
        mood: Option<String>,

        /// Tempo in BPM
        #[arg(long)]
        tempo: Option<f64>,

        /// Seed for every random choice
        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long, default_value = "44100")]
        sample_rate: u32,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let session_dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("no current directory")?,
    };

    match args.command {
        Some(Command::Render { out, seconds, mood, tempo, seed, sample_rate }) => {
            TermLogger::init(args.log_level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
                .context("installing the logger")?;
            let saved = persistence::load_settings(&session_dir);
            let opts = render_options(saved, mood, tempo, seconds, seed, sample_rate);
            let summary = render_to_wav(&out, &opts)?;
            println!("wrote {} ({} frames, peak {:.3})", out.display(), summary.frames, summary.peak);
            Ok(())
        }
        None => {
            init_file_logger(&session_dir, args.log_level)?;
            run_shell(&session_dir)
        }
    }
}

fn render_options(
    saved: Option<UserSettings>,
    mood: Option<String>,
    tempo: Option<f64>,
    seconds: f64,
    seed: u64,
    sample_rate: u32,
) -> RenderOptions {
    let mut opts = RenderOptions { seconds, seed, sample_rate, ..Default::default() };
    if let Some(s) = saved {
        opts.mood = s.mood.clone();
        opts.tempo = s.tempo;
        opts.master_volume = s.master_volume;
        s.apply_instruments(&mut opts.instruments);
    }
    opts.mood = mood.unwrap_or(opts.mood);
    opts.tempo = tempo.unwrap_or(opts.tempo);
    if opts.mood.is_empty() {
        opts.mood = DEFAULT_MOOD.to_string();
    }
    if !(opts.tempo.is_finite() && opts.tempo > 0.0) {
        opts.tempo = DEFAULT_TEMPO;
    }
    opts
}

// the tui owns the terminal, so logs go to a file next to the settings
fn init_file_logger(session_dir: &Path, level: LevelFilter) -> anyhow::Result<()> {
    let path = persistence::log_file_path(session_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    WriteLogger::init(level, Config::default(), file).context("installing the logger")?;
    Ok(())
}

fn run_shell(session_dir: &Path) -> anyhow::Result<()> {
    let saved = persistence::load_settings(session_dir);
    let master_volume = saved.as_ref().map_or(DEFAULT_MASTER_VOLUME, |s| s.master_volume);

    let audio = audio::start_audio(master_volume)?;

    let mut field = FieldRecordings::new(audio.sample_rate());
    let field_dir = session_dir.join(FIELD_DIR);
    let field_cmds = match field.load(&field_dir) {
        Ok(cmds) => cmds,
        Err(e) => {
            warn!("field recordings unavailable: {e:#}");
            Vec::new()
        }
    };

    let mut middle = Middle::with_settings(saved, Box::new(field), Box::new(NoKeepAlive));
    middle.set_audio_ready(audio.is_ready());
    dispatch(&mut middle, &audio, field_cmds);
    let initial = middle.initial_commands();
    dispatch(&mut middle, &audio, initial);

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    crossterm::execute!(std::io::stdout(), terminal::EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let result = shell_loop(&mut term, &mut middle, &audio, session_dir);

    // save before quitting, whatever the loop did
    save_now(session_dir, &mut middle);
    info!("leaving on {} at {} bpm", middle.mood(), middle.tempo());
    let stop = middle.pause();
    dispatch(&mut middle, &audio, stop);
    drop(term);
    drop(audio);
    result
}

fn shell_loop(
    term: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    middle: &mut Middle,
    audio: &AudioHandle,
    session_dir: &Path,
) -> anyhow::Result<()> {
    let tick_rate = Duration::from_millis(33);
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let ds = middle.display_state();
        tui_state.sync(&ds);

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        let events = tui::input::poll_input(tick_rate, &tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                return Ok(());
            }
            let cmds = middle.handle_input(event);
            dispatch(middle, audio, cmds);
        }

        if let Some(record) = middle.tick(Instant::now()) {
            if let Err(e) = persistence::save_settings(session_dir, &record) {
                error!("couldn't save settings: {e}");
            }
        }
    }
}

// sends everything; a start the output drops puts the session back to stopped
fn dispatch(middle: &mut Middle, audio: &AudioHandle, cmds: Vec<AudioCommand>) {
    let mut start_dropped = false;
    for cmd in cmds {
        let starts = matches!(cmd, AudioCommand::StartPlayback { .. });
        if !audio.send(cmd) && starts {
            start_dropped = true;
        }
    }
    if start_dropped {
        for cmd in middle.playback_failed() {
            audio.send(cmd);
        }
    }
}

fn save_now(session_dir: &Path, middle: &mut Middle) {
    let record = middle.flush_save().unwrap_or_else(|| middle.settings());
    if let Err(e) = persistence::save_settings(session_dir, &record) {
        error!("couldn't save settings: {e}");
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
