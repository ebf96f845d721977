// The session. Owns every piece of state the listener can change, turns each change into the
// audio commands it needs, and schedules a debounced save. Nothing here touches the audio thread
// directly; callers ship the returned commands.

use std::time::Instant;

use log::{info, warn};

use crate::audio_api::{AudioCommand, plan_loop, plan_loops};
use crate::field::{KeepAlive, StreamingChannel};
use crate::music::{MOODS, lookup, scales};
use crate::pipeline::persistence::DebouncedSaver;
use crate::pipeline::settings::UserSettings;
use crate::shared::{
    DEFAULT_MASTER_VOLUME, DEFAULT_MOOD, DEFAULT_TEMPO, DisplayState, InputEvent, InstrumentRole,
    InstrumentRow, InstrumentState, NUM_ROLES, RoleTable, TEMPO_MAX, TEMPO_MIN, TEMPO_STEP,
};

pub struct Middle {
    mood: String,
    tempo: f64,
    master_volume: f32,
    instruments: RoleTable<InstrumentState>,
    playing: bool,
    audio_ready: bool,
    selected: usize, // index into InstrumentRole::ALL
    status: String,
    field: Box<dyn StreamingChannel>,
    keep_alive: Box<dyn KeepAlive>,
    saver: DebouncedSaver,
}

impl Middle {
    pub fn new(field: Box<dyn StreamingChannel>, keep_alive: Box<dyn KeepAlive>) -> Self {
        Self {
            mood: DEFAULT_MOOD.to_string(),
            tempo: DEFAULT_TEMPO,
            master_volume: DEFAULT_MASTER_VOLUME,
            instruments: InstrumentState::defaults(),
            playing: false,
            audio_ready: false,
            selected: 0,
            status: String::new(),
            field,
            keep_alive,
            saver: DebouncedSaver::default(),
        }
    }

    /// Starts from the saved record when there is one, defaults otherwise.
    pub fn with_settings(
        settings: Option<UserSettings>,
        field: Box<dyn StreamingChannel>,
        keep_alive: Box<dyn KeepAlive>,
    ) -> Self {
        let mut middle = Self::new(field, keep_alive);
        if let Some(s) = settings {
            middle.mood = s.mood.clone();
            middle.tempo = s.tempo;
            middle.master_volume = s.master_volume;
            s.apply_instruments(&mut middle.instruments);
            info!("restored settings: {} at {} bpm", middle.mood, middle.tempo);
        }
        middle
    }

    /// Pushes the stored volumes out, for a freshly started engine.
    pub fn initial_commands(&mut self) -> Vec<AudioCommand> {
        let mut cmds = vec![AudioCommand::SetMasterVolume(self.master_volume)];
        for role in InstrumentRole::SYNTHESIZED {
            cmds.push(AudioCommand::SetVoiceVolume { role, volume: self.instruments[role].volume });
        }
        let field_volume = self.instruments[InstrumentRole::FieldRecordings].volume;
        cmds.extend(self.field.set_volume(percent(field_volume)));
        cmds
    }

    pub fn set_audio_ready(&mut self, ready: bool) {
        self.audio_ready = ready;
        if !ready {
            self.status = "couldn't start audio".to_string();
        }
    }

    pub fn is_audio_ready(&self) -> bool {
        self.audio_ready
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn mood(&self) -> &str {
        &self.mood
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn instrument(&self, role: InstrumentRole) -> InstrumentState {
        self.instruments[role]
    }

    pub fn instruments(&self) -> &RoleTable<InstrumentState> {
        &self.instruments
    }

    pub fn field(&self) -> &dyn StreamingChannel {
        self.field.as_ref()
    }

    pub fn settings(&self) -> UserSettings {
        UserSettings::from_session(&self.mood, self.tempo, self.master_volume, &self.instruments)
    }

    fn touch(&mut self) {
        let record = self.settings();
        self.saver.schedule(record, Instant::now());
    }

    // -- session operations --

    /// Same mood is a no-op. While playing, every loop is rebuilt for the new mood.
    pub fn set_mood(&mut self, name: &str) -> Vec<AudioCommand> {
        if name == self.mood {
            return Vec::new();
        }
        if lookup(name).is_none() {
            warn!("unknown mood {name:?}, composition falls back to defaults");
        }
        self.mood = name.to_string();
        self.touch();
        if self.playing {
            info!("mood -> {name}, restarting loops");
            return vec![AudioCommand::RestartLoops { loops: plan_loops(&self.mood, &self.instruments) }];
        }
        Vec::new()
    }

    pub fn set_tempo(&mut self, bpm: f64) -> Vec<AudioCommand> {
        if !bpm.is_finite() || bpm <= 0.0 {
            warn!("ignoring tempo {bpm}");
            return Vec::new();
        }
        self.tempo = bpm;
        self.touch();
        vec![AudioCommand::SetTempo(bpm)]
    }

    pub fn set_master_volume(&mut self, v: f32) -> Vec<AudioCommand> {
        self.master_volume = clamp_unit(v);
        self.touch();
        vec![AudioCommand::SetMasterVolume(self.master_volume)]
    }

    pub fn toggle_instrument(&mut self, role: InstrumentRole) -> Vec<AudioCommand> {
        let state = &mut self.instruments[role];
        state.active = !state.active;
        let (active, volume) = (state.active, state.volume);
        self.touch();
        if !self.playing {
            return Vec::new();
        }
        match (role.is_synthesized(), active) {
            (true, true) => plan_loop(role, &self.mood, volume).map(AudioCommand::StartLoop).into_iter().collect(),
            (true, false) => vec![AudioCommand::StopLoop(role)],
            (false, true) => {
                let mut cmds = self.field.set_volume(percent(volume));
                cmds.extend(self.field.play());
                cmds
            }
            (false, false) => self.field.pause(),
        }
    }

    /// Stored for inactive roles too; an inactive role still makes no sound.
    pub fn set_instrument_volume(&mut self, role: InstrumentRole, v: f32) -> Vec<AudioCommand> {
        let volume = clamp_unit(v);
        self.instruments[role].volume = volume;
        self.touch();
        if role.is_synthesized() {
            vec![AudioCommand::SetVoiceVolume { role, volume }]
        } else {
            self.field.set_volume(percent(volume))
        }
    }

    pub fn play_pause(&mut self) -> Vec<AudioCommand> {
        if self.playing { self.pause() } else { self.play() }
    }

    pub fn play(&mut self) -> Vec<AudioCommand> {
        if !self.audio_ready {
            warn!("play ignored, audio system isn't ready");
            self.status = "audio isn't ready".to_string();
            return Vec::new();
        }
        if self.playing {
            return Vec::new();
        }
        let loops = plan_loops(&self.mood, &self.instruments);
        let mut cmds = vec![AudioCommand::StartPlayback { tempo: self.tempo, loops }];
        if self.instruments[InstrumentRole::FieldRecordings].active {
            cmds.extend(self.field.play());
        }
        self.keep_alive.enable();
        self.playing = true;
        self.status = format!("playing {}", self.mood);
        cmds
    }

    /// Stops everything. Safe to call when already stopped.
    pub fn pause(&mut self) -> Vec<AudioCommand> {
        let mut cmds = vec![AudioCommand::StopPlayback];
        if self.field.is_playing() {
            cmds.extend(self.field.pause());
        }
        if self.playing {
            self.keep_alive.disable();
            self.playing = false;
            self.status = "paused".to_string();
        }
        cmds
    }

    /// The output refused a start it was sent: back to stopped, and no more play attempts.
    pub fn playback_failed(&mut self) -> Vec<AudioCommand> {
        warn!("playback didn't start, marking audio unavailable");
        let cmds = self.pause();
        self.set_audio_ready(false);
        cmds
    }

    /// A click on a mood card: the current card toggles playback, another card switches to
    /// that mood, moves the field recordings on a track, and starts playing if stopped.
    pub fn mood_card(&mut self, name: &str) -> Vec<AudioCommand> {
        if name == self.mood {
            return self.play_pause();
        }
        let mut cmds = self.set_mood(name);
        if self.instruments[InstrumentRole::FieldRecordings].active && self.field.is_ready() {
            cmds.extend(self.field.next_track());
        }
        if !self.playing {
            cmds.extend(self.play());
        }
        cmds
    }

    pub fn next_track(&mut self) -> Vec<AudioCommand> {
        self.field.next_track()
    }

    pub fn prev_track(&mut self) -> Vec<AudioCommand> {
        self.field.prev_track()
    }

    // -- shell plumbing --

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<AudioCommand> {
        match event {
            InputEvent::MoodCard(i) => match MOODS.get(i as usize) {
                Some(m) => self.mood_card(m.name),
                None => Vec::new(),
            },
            InputEvent::PlayPause => self.play_pause(),
            InputEvent::SelectInstrument(delta) => {
                self.selected = (self.selected as i64 + delta as i64).rem_euclid(NUM_ROLES as i64) as usize;
                Vec::new()
            }
            InputEvent::ToggleInstrument(role) => self.toggle_instrument(role),
            InputEvent::AdjustInstrumentVolume(role, delta) => {
                let v = round_tenth(self.instruments[role].volume + delta);
                self.set_instrument_volume(role, v)
            }
            InputEvent::AdjustTempo(delta) => {
                let stepped = ((self.tempo + delta) / TEMPO_STEP).round() * TEMPO_STEP;
                let bpm = stepped.clamp(TEMPO_MIN, TEMPO_MAX);
                if bpm == self.tempo { Vec::new() } else { self.set_tempo(bpm) }
            }
            InputEvent::AdjustMasterVolume(delta) => {
                let v = round_tenth(self.master_volume + delta);
                self.set_master_volume(v)
            }
            InputEvent::NextTrack => self.next_track(),
            InputEvent::PrevTrack => self.prev_track(),
            InputEvent::Quit => Vec::new(),
        }
    }

    /// The settings record to write, once the debounce has run out.
    pub fn tick(&mut self, now: Instant) -> Option<UserSettings> {
        self.saver.poll(now)
    }

    /// Pending save regardless of the debounce; called on quit.
    pub fn flush_save(&mut self) -> Option<UserSettings> {
        self.saver.flush()
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            mood: self.mood.clone(),
            mood_index: scales::index_of(&self.mood),
            playing: self.playing,
            audio_ready: self.audio_ready,
            tempo: self.tempo,
            master_volume: self.master_volume,
            instruments: self
                .instruments
                .values()
                .map(|s| InstrumentRow { role: s.role, name: s.role.name(), active: s.active, volume: s.volume })
                .collect(),
            selected: InstrumentRole::ALL[self.selected],
            field_track: self.field.current_title(),
            status: self.status.clone(),
        }
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

// keeps repeated 0.1 steps from drifting
fn round_tenth(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

fn percent(volume: f32) -> u8 {
    (clamp_unit(volume) * 100.0).round() as u8
}
