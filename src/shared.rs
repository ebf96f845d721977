// The current input plan for the terminal shell:
//
// Mood cards (the 8 moods, laid out 4 x 2):
//   1 2 3 4       //  MoodCard(0 or ... or 3)
//   5 6 7 8       //  MoodCard(4 or ... or 7)
//   same card as the current mood = play/pause, different card = switch mood (+ next field track)
//
// Instrument panel:
//   Up / Down     //  SelectInstrument(-1 / +1)
//   Enter         //  ToggleInstrument(selected)
//   Left / Right  //  AdjustInstrumentVolume(-0.1 / +0.1)
//
// Session:
//   Space         //  PlayPause
//   [ / ]         //  AdjustTempo(-5 / +5)
//   - / =         //  AdjustMasterVolume(-0.1 / +0.1)
//   n / p         //  NextTrack / PrevTrack (field recordings)
//   Esc           //  Quit
//
// Same split as always: the tui resolves keys into semantic events, the middle layer owns
// every piece of session state, and the tui just draws the DisplayState it gets back.

use serde::{Deserialize, Serialize};

pub const NUM_ROLES: usize = 6;
pub const NUM_SYNTH_ROLES: usize = 5;

pub const TEMPO_MIN: f64 = 40.0;
pub const TEMPO_MAX: f64 = 120.0;
pub const TEMPO_STEP: f64 = 5.0;
pub const VOLUME_STEP: f32 = 0.1;

pub const DEFAULT_MOOD: &str = "Lydian";
pub const DEFAULT_TEMPO: f64 = 60.0;
pub const DEFAULT_MASTER_VOLUME: f32 = 0.7;

/// The closed set of instrument roles. The first five are synthesized; field recordings are
/// forwarded to an external streaming channel and own no synthesis state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentRole {
    #[serde(rename = "pad")]
    Pad,
    #[serde(rename = "piano")]
    Piano,
    #[serde(rename = "synth")]
    LeadSynth,
    #[serde(rename = "bell")]
    Bell,
    #[serde(rename = "bass")]
    Bass,
    #[serde(rename = "fieldRecordings")]
    FieldRecordings,
}

impl InstrumentRole {
    pub const ALL: [InstrumentRole; NUM_ROLES] = [
        InstrumentRole::Pad,
        InstrumentRole::Piano,
        InstrumentRole::LeadSynth,
        InstrumentRole::Bell,
        InstrumentRole::Bass,
        InstrumentRole::FieldRecordings,
    ];

    pub const SYNTHESIZED: [InstrumentRole; NUM_SYNTH_ROLES] = [
        InstrumentRole::Pad,
        InstrumentRole::Piano,
        InstrumentRole::LeadSynth,
        InstrumentRole::Bell,
        InstrumentRole::Bass,
    ];

    pub fn index(self) -> usize {
        match self {
            InstrumentRole::Pad => 0,
            InstrumentRole::Piano => 1,
            InstrumentRole::LeadSynth => 2,
            InstrumentRole::Bell => 3,
            InstrumentRole::Bass => 4,
            InstrumentRole::FieldRecordings => 5,
        }
    }

    // persisted id, same strings the settings record uses
    pub fn id(self) -> &'static str {
        match self {
            InstrumentRole::Pad => "pad",
            InstrumentRole::Piano => "piano",
            InstrumentRole::LeadSynth => "synth",
            InstrumentRole::Bell => "bell",
            InstrumentRole::Bass => "bass",
            InstrumentRole::FieldRecordings => "fieldRecordings",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            InstrumentRole::Pad => "Pad",
            InstrumentRole::Piano => "Piano",
            InstrumentRole::LeadSynth => "Synth",
            InstrumentRole::Bell => "Bell",
            InstrumentRole::Bass => "Bass",
            InstrumentRole::FieldRecordings => "Field Recordings",
        }
    }

    pub fn is_synthesized(self) -> bool {
        self != InstrumentRole::FieldRecordings
    }

    // pad and piano voice chords, everyone else plays single notes
    pub fn plays_chords(self) -> bool {
        matches!(self, InstrumentRole::Pad | InstrumentRole::Piano)
    }
}

/// One slot per role. The role set is closed, so lookups can never miss.
#[derive(Clone, Debug, PartialEq)]
pub struct RoleTable<T> {
    slots: [T; NUM_ROLES],
}

impl<T> RoleTable<T> {
    pub fn from_fn(mut f: impl FnMut(InstrumentRole) -> T) -> Self {
        Self {
            slots: std::array::from_fn(|i| f(InstrumentRole::ALL[i])),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstrumentRole, &T)> {
        InstrumentRole::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (InstrumentRole, &mut T)> {
        InstrumentRole::ALL.into_iter().zip(self.slots.iter_mut())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

impl<T: Default> Default for RoleTable<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> std::ops::Index<InstrumentRole> for RoleTable<T> {
    type Output = T;
    fn index(&self, role: InstrumentRole) -> &T {
        &self.slots[role.index()]
    }
}

impl<T> std::ops::IndexMut<InstrumentRole> for RoleTable<T> {
    fn index_mut(&mut self, role: InstrumentRole) -> &mut T {
        &mut self.slots[role.index()]
    }
}

/// Per-role session state: is it playing, and how loud. Lives as long as the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstrumentState {
    pub role: InstrumentRole,
    pub active: bool,
    pub volume: f32, // linear, 0.0 to 1.0
}

impl InstrumentState {
    pub fn default_for(role: InstrumentRole) -> Self {
        let (active, volume) = match role {
            InstrumentRole::Pad => (true, 0.05),
            InstrumentRole::Piano => (true, 0.65),
            InstrumentRole::LeadSynth => (true, 0.05),
            InstrumentRole::Bell => (true, 0.05),
            InstrumentRole::Bass => (false, 0.4),
            InstrumentRole::FieldRecordings => (true, 0.2),
        };
        Self { role, active, volume }
    }

    pub fn defaults() -> RoleTable<InstrumentState> {
        RoleTable::from_fn(Self::default_for)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    MoodCard(u8), // index into the mood table, 0-7
    PlayPause,
    SelectInstrument(i8),
    ToggleInstrument(InstrumentRole),
    AdjustInstrumentVolume(InstrumentRole, f32),
    AdjustTempo(f64),
    AdjustMasterVolume(f32),
    NextTrack,
    PrevTrack,
    Quit,
}

#[derive(Clone, Debug)]
pub struct InstrumentRow {
    pub role: InstrumentRole,
    pub name: &'static str,
    pub active: bool,
    pub volume: f32,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub mood: String,
    pub mood_index: Option<usize>, // None if the mood isn't in the table
    pub playing: bool,
    pub audio_ready: bool,
    pub tempo: f64,
    pub master_volume: f32,
    pub instruments: Vec<InstrumentRow>,
    pub selected: InstrumentRole, // highlighted row in the instrument panel
    pub field_track: Option<String>, // title of the current field recording, if the channel is up
    pub status: String,              // one short line for the footer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip_through_from_id() {
        for role in InstrumentRole::ALL {
            assert_eq!(InstrumentRole::from_id(role.id()), Some(role));
        }
        assert_eq!(InstrumentRole::from_id("kazoo"), None);
    }

    #[test]
    fn role_table_indexes_every_role() {
        let mut table = RoleTable::from_fn(|r| r.index());
        for role in InstrumentRole::ALL {
            assert_eq!(table[role], role.index());
        }
        table[InstrumentRole::Bass] = 99;
        assert_eq!(table[InstrumentRole::Bass], 99);
        assert_eq!(table.iter().count(), NUM_ROLES);
    }

    #[test]
    fn only_pad_and_piano_play_chords() {
        let chordal: Vec<_> = InstrumentRole::ALL.into_iter().filter(|r| r.plays_chords()).collect();
        assert_eq!(chordal, vec![InstrumentRole::Pad, InstrumentRole::Piano]);
        assert!(!InstrumentRole::FieldRecordings.is_synthesized());
    }

    #[test]
    fn default_instruments() {
        let d = InstrumentState::defaults();
        assert!(!d[InstrumentRole::Bass].active);
        assert_eq!(d[InstrumentRole::Piano].volume, 0.65);
        assert_eq!(d[InstrumentRole::FieldRecordings].volume, 0.2);
        assert!(d.iter().all(|(role, s)| s.role == role));
    }
}
