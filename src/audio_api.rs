use crate::music::{self, MusicalTime, NoteToken};
use crate::shared::{InstrumentRole, InstrumentState, RoleTable};

pub use crate::audio::{SampleBuffer, TrackId};

/// Seconds after playback starts before a role's first firing. Builds the texture from the bass
/// outward instead of every voice attacking at once.
pub fn stagger_seconds(role: InstrumentRole) -> f64 {
    match role {
        InstrumentRole::Bass => 0.0,
        InstrumentRole::Pad => 0.3,
        InstrumentRole::Piano => 0.6,
        InstrumentRole::LeadSynth => 0.9,
        InstrumentRole::Bell => 1.2,
        InstrumentRole::FieldRecordings => 0.0,
    }
}

/// Everything a loop needs, captured when it's created. A mood change builds new specs
/// rather than editing live ones.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopSpec {
    pub role: InstrumentRole,
    pub mood: String,
    pub pool: Vec<NoteToken>,
    pub pattern: Vec<MusicalTime>,
    pub interval: MusicalTime,
    pub chords: bool,
    pub volume: f32,
    pub start_offset: f64, // seconds
}

// None for field recordings, that role never gets a loop
pub fn plan_loop(role: InstrumentRole, mood: &str, volume: f32) -> Option<LoopSpec> {
    if !role.is_synthesized() {
        return None;
    }
    Some(LoopSpec {
        role,
        mood: mood.to_string(),
        pool: music::note_pool(mood, role),
        pattern: music::mood_pattern(mood, role).to_vec(),
        interval: music::loop_interval(mood, role),
        chords: role.plays_chords(),
        volume,
        start_offset: stagger_seconds(role),
    })
}

/// One spec per active synthesized role.
pub fn plan_loops(mood: &str, instruments: &RoleTable<InstrumentState>) -> Vec<LoopSpec> {
    instruments
        .values()
        .filter(|s| s.active)
        .filter_map(|s| plan_loop(s.role, mood, s.volume))
        .collect()
}

#[derive(Clone, Debug)]
pub enum DeckCommand {
    // Decoding happens on the control side; the engine only ever gets a ready buffer
    Load { track: TrackId, buffer: SampleBuffer },
    Play,
    Pause,
    SetVolume(f32), // linear
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // Start the transport at `tempo` with a fresh loop set
    StartPlayback { tempo: f64, loops: Vec<LoopSpec> },

    // Mood change: every loop goes, then the new set comes in. The transport keeps running
    RestartLoops { loops: Vec<LoopSpec> },

    // Idempotent. Nothing scheduled before it can fire after it
    StopPlayback,

    // Instrument toggles while playing
    StartLoop(LoopSpec),
    StopLoop(InstrumentRole),

    SetTempo(f64),
    SetVoiceVolume { role: InstrumentRole, volume: f32 },

    // AudioHandle writes this straight into the shared master gain
    SetMasterVolume(f32),

    Deck(DeckCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lydian_pad_and_bass_plan_two_staggered_loops() {
        let mut instruments = InstrumentState::defaults();
        for (role, s) in instruments.iter_mut() {
            s.active = matches!(role, InstrumentRole::Pad | InstrumentRole::Bass);
        }
        let loops = plan_loops("Lydian", &instruments);
        let roles: Vec<_> = loops.iter().map(|l| l.role.id()).collect();
        assert_eq!(roles, ["pad", "bass"]);
        assert_eq!(loops[0].start_offset, 0.3);
        assert_eq!(loops[1].start_offset, 0.0);
        assert!(loops[0].chords && !loops[1].chords);
        assert!(loops.iter().all(|l| l.mood == "Lydian" && !l.pool.is_empty()));
    }

    #[test]
    fn every_role_has_its_own_start_offset() {
        let all_on = RoleTable::from_fn(|role| InstrumentState { role, active: true, volume: 0.5 });
        let offsets: Vec<_> = plan_loops("Aeolian", &all_on).iter().map(|l| (l.role, l.start_offset)).collect();
        assert_eq!(
            offsets,
            [
                (InstrumentRole::Pad, 0.3),
                (InstrumentRole::Piano, 0.6),
                (InstrumentRole::LeadSynth, 0.9),
                (InstrumentRole::Bell, 1.2),
                (InstrumentRole::Bass, 0.0),
            ]
        );
    }

    #[test]
    fn field_recordings_never_get_a_loop() {
        assert!(plan_loop(InstrumentRole::FieldRecordings, "Lydian", 1.0).is_none());
        let all_on = RoleTable::from_fn(|role| InstrumentState { role, active: true, volume: 0.5 });
        assert_eq!(plan_loops("Dorian", &all_on).len(), 5);
    }
}
