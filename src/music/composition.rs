// The composition engine: pure lookups over (mood, role) plus bounded randomness.
// Nothing in here holds state; loops capture what they need at creation time.

use smallvec::{SmallVec, smallvec};

use super::notes::NoteToken;
use super::random::RandomSource;
use super::scales::{self, MoodScale};
use super::time::MusicalTime;
use crate::shared::InstrumentRole;

pub type Chord = SmallVec<[NoteToken; 3]>;

// chance of adding the scale's third / fifth above the root, sampled independently
pub const THIRD_WEIGHT: f64 = 0.8;
pub const FIFTH_WEIGHT: f64 = 0.9;

pub const DEFAULT_INTERVAL: MusicalTime = MusicalTime::note(2);

const W: MusicalTime = MusicalTime::note(1); // whole
const WD: MusicalTime = MusicalTime::dotted(1);
const H: MusicalTime = MusicalTime::note(2); // half
const HD: MusicalTime = MusicalTime::dotted(2);
const Q: MusicalTime = MusicalTime::note(4); // quarter
const QD: MusicalTime = MusicalTime::dotted(4);
const E: MusicalTime = MusicalTime::note(8); // eighth
const ED: MusicalTime = MusicalTime::dotted(8);
const TWO_BEATS: MusicalTime = MusicalTime::position(0, 0, 8);
const SIX_SIXTEENTHS: MusicalTime = MusicalTime::position(0, 0, 6);

const DEFAULT_POOL: [&str; 3] = ["C3", "E3", "G3"];
const DEFAULT_TRIAD: [&str; 3] = ["C4", "E4", "G4"];
const FALLBACK_PATTERN: &[MusicalTime] = &[H];

// one row per mood, columns are pad, piano, synth, bell, bass
type RoleColumns<T> = [T; 5];

// the possible note lengths each role may pick at a firing; rhythms interlock per mood
static PATTERNS: [(&str, RoleColumns<&[MusicalTime]>); 8] = [
    ("Lydian", [&[W, HD], &[QD, E, H], &[E, Q, ED], &[HD, W], &[WD, TWO_BEATS]]),
    ("Dorian", [&[H, WD], &[ED, Q, E], &[Q, ED, Q], &[WD, H], &[W, SIX_SIXTEENTHS]]),
    ("Aeolian", [&[HD, W], &[QD, ED, Q], &[ED, QD, E], &[H, WD], &[WD, TWO_BEATS]]),
    ("Mixolydian", [&[H, HD], &[E, QD], &[QD, E, Q], &[W, HD], &[W, SIX_SIXTEENTHS]]),
    ("Phrygian", [&[WD, HD], &[Q, ED], &[ED, Q], &[HD, WD], &[TWO_BEATS, WD]]),
    ("Whole Tone", [&[W, HD], &[ED, QD], &[QD, ED], &[H, WD], &[WD, TWO_BEATS]]),
    ("Pentatonic Major", [&[H, WD], &[Q, ED], &[E, QD], &[WD, H], &[W, SIX_SIXTEENTHS]]),
    ("Hirajoshi", [&[WD, H], &[ED, QD], &[QD, E], &[HD, W], &[TWO_BEATS, WD]]),
];

// how often each role's loop fires
static INTERVALS: [(&str, RoleColumns<MusicalTime>); 8] = [
    ("Lydian", [H, WD, W, HD, TWO_BEATS]),
    ("Dorian", [HD, W, WD, H, WD]),
    ("Aeolian", [W, H, W, WD, W]),
    ("Mixolydian", [H, WD, WD, HD, WD]),
    ("Phrygian", [WD, HD, H, W, H]),
    ("Whole Tone", [HD, W, W, H, WD]),
    ("Pentatonic Major", [H, W, WD, HD, WD]),
    ("Hirajoshi", [WD, H, HD, WD, HD]),
];

fn column(role: InstrumentRole) -> Option<usize> {
    match role {
        InstrumentRole::Pad => Some(0),
        InstrumentRole::Piano => Some(1),
        InstrumentRole::LeadSynth => Some(2),
        InstrumentRole::Bell => Some(3),
        InstrumentRole::Bass => Some(4),
        InstrumentRole::FieldRecordings => None,
    }
}

/// Octaves each role draws its notes from; bass sits lowest, bell highest.
pub fn octaves(role: InstrumentRole) -> &'static [i8] {
    match role {
        InstrumentRole::Pad => &[2, 3, 4],
        InstrumentRole::Piano => &[3, 4],
        InstrumentRole::LeadSynth => &[3, 4, 5],
        InstrumentRole::Bell => &[4, 5],
        InstrumentRole::Bass => &[1, 2],
        InstrumentRole::FieldRecordings => &[4],
    }
}

fn tokens(names: &[&str]) -> Vec<NoteToken> {
    names.iter().filter_map(|n| NoteToken::parse(n)).collect()
}

/// Every pitch of the mood's scale in each of the role's octaves.
pub fn note_pool(mood: &str, role: InstrumentRole) -> Vec<NoteToken> {
    let Some(scale) = scales::lookup(mood) else {
        return tokens(&DEFAULT_POOL);
    };
    octaves(role)
        .iter()
        .flat_map(|&octave| scale.scale.iter().filter_map(move |p| NoteToken::new(p, octave)))
        .collect()
}

/// The note lengths a role may pick from. Unknown moods use the Lydian row.
pub fn mood_pattern(mood: &str, role: InstrumentRole) -> &'static [MusicalTime] {
    let Some(col) = column(role) else {
        return FALLBACK_PATTERN;
    };
    PATTERNS
        .iter()
        .find(|(name, _)| *name == mood)
        .or_else(|| PATTERNS.iter().find(|(name, _)| *name == "Lydian"))
        .map(|(_, cols)| cols[col])
        .unwrap_or(FALLBACK_PATTERN)
}

pub fn loop_interval(mood: &str, role: InstrumentRole) -> MusicalTime {
    let Some(col) = column(role) else {
        return DEFAULT_INTERVAL;
    };
    INTERVALS
        .iter()
        .find(|(name, _)| *name == mood)
        .map(|(_, cols)| cols[col])
        .unwrap_or(DEFAULT_INTERVAL)
}

/// Root, then maybe the scale's third and fifth above it. Same root twice rarely gives the same
/// voicing, but every voicing stays inside the scale.
pub fn chord_from_note(root: NoteToken, mood: &str, rng: &mut dyn RandomSource) -> Chord {
    let Some(scale) = scales::lookup(mood) else {
        return tokens(&DEFAULT_TRIAD).into_iter().collect();
    };
    let Some(root_index) = scale.position(root.pitch) else {
        return major_triad(root);
    };

    let mut chord: Chord = smallvec![root];
    for (steps, weight) in [(2, THIRD_WEIGHT), (4, FIFTH_WEIGHT)] {
        if rng.chance(weight) {
            chord.push(scale_step_above(scale, root, root_index, steps));
        }
    }
    chord
}

// walk `steps` scale degrees up from the root, going up an octave when the scale wraps
fn scale_step_above(scale: &MoodScale, root: NoteToken, root_index: usize, steps: usize) -> NoteToken {
    let target = root_index + steps;
    let wraps = (target / scale.len()) as i8;
    let pitch = scale.scale[target % scale.len()];
    NoteToken::new(pitch, root.octave + wraps).unwrap_or(root)
}

fn major_triad(root: NoteToken) -> Chord {
    smallvec![root, root.transpose(4), root.transpose(7)]
}
