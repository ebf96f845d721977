use std::fmt;

// every spelling a scale in the mood table uses, plus the sharps we spell new pitches with
const SPELLINGS: [(&str, u8); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

const SHARPS: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Semitones above C for a pitch name, e.g. "Eb" -> 3.
pub fn pitch_class(name: &str) -> Option<u8> {
    SPELLINGS.iter().find(|(n, _)| *n == name).map(|(_, pc)| *pc)
}

fn canonical(name: &str) -> Option<&'static str> {
    SPELLINGS.iter().find(|(n, _)| *n == name).map(|(n, _)| *n)
}

/// A pitch name plus an octave, e.g. "F#4". This is what the note pools are made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoteToken {
    pub pitch: &'static str,
    pub octave: i8,
}

impl NoteToken {
    pub fn new(pitch: &str, octave: i8) -> Option<Self> {
        Some(Self {
            pitch: canonical(pitch)?,
            octave,
        })
    }

    /// Parse scientific pitch notation ("C3", "Bb4", "F#-1").
    pub fn parse(s: &str) -> Option<Self> {
        let split = s.find(|c: char| c.is_ascii_digit() || c == '-')?;
        let (pitch, octave) = s.split_at(split);
        Self::new(pitch, octave.parse().ok()?)
    }

    pub fn from_midi(midi: i32) -> Self {
        let pc = midi.rem_euclid(12) as usize;
        Self {
            pitch: SHARPS[pc],
            octave: (midi.div_euclid(12) - 1) as i8,
        }
    }

    pub fn midi(&self) -> i32 {
        // canonical() only ever hands out names that are in the table
        let pc = pitch_class(self.pitch).unwrap_or(0) as i32;
        (self.octave as i32 + 1) * 12 + pc
    }

    pub fn frequency(&self) -> f32 {
        440.0 * 2.0_f32.powf((self.midi() - 69) as f32 / 12.0)
    }

    pub fn transpose(&self, semitones: i32) -> Self {
        Self::from_midi(self.midi() + semitones)
    }
}

impl fmt::Display for NoteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch, self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_scientific_pitch() {
        let n = NoteToken::parse("F#4").unwrap();
        assert_eq!(n.pitch, "F#");
        assert_eq!(n.octave, 4);
        assert_eq!(n.to_string(), "F#4");
        assert_eq!(NoteToken::parse("Bb1").unwrap().midi(), 34);
        assert!(NoteToken::parse("H2").is_none());
        assert!(NoteToken::parse("C").is_none());
    }

    #[test]
    fn a4_is_440() {
        let a4 = NoteToken::parse("A4").unwrap();
        assert_eq!(a4.midi(), 69);
        assert!((a4.frequency() - 440.0).abs() < 1e-3);
        let c4 = NoteToken::parse("C4").unwrap();
        assert!((c4.frequency() - 261.626).abs() < 0.01);
    }

    #[test]
    fn enharmonics_share_a_midi_number() {
        assert_eq!(
            NoteToken::parse("Db3").unwrap().midi(),
            NoteToken::parse("C#3").unwrap().midi()
        );
        assert_eq!(NoteToken::parse("B3").unwrap().transpose(1).to_string(), "C4");
    }
}
