// The mood table: every mood the listener can pick, each one a named scale rooted on C.

#[derive(Debug, PartialEq)]
pub struct MoodScale {
    pub name: &'static str,
    pub mood: &'static str, // descriptive tag
    pub scale: &'static [&'static str],
    pub degrees: &'static [u8], // semitones above C, parallel to `scale`
    pub accent: (u8, u8, u8), // card colour in the shell
    pub symbol: &'static str,
    pub description: &'static str, // short label under the card
}

impl MoodScale {
    pub fn len(&self) -> usize {
        self.scale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scale.is_empty()
    }

    // where a pitch name sits in this scale, if it's in it at all
    pub fn position(&self, pitch: &str) -> Option<usize> {
        self.scale.iter().position(|p| *p == pitch)
    }
}

pub static MOODS: [MoodScale; 8] = [
    MoodScale {
        name: "Pentatonic Major",
        mood: "clear watercolor tones",
        scale: &["C", "D", "E", "G", "A"],
        degrees: &[0, 2, 4, 7, 9],
        accent: (163, 230, 53),
        symbol: "🎋",
        description: "zen gardens",
    },
    MoodScale {
        name: "Lydian",
        mood: "bright, floating",
        scale: &["C", "D", "E", "F#", "G", "A", "B"],
        degrees: &[0, 2, 4, 6, 7, 9, 11],
        accent: (251, 191, 36),
        symbol: "✨",
        description: "ethereal brightness",
    },
    MoodScale {
        name: "Dorian",
        mood: "cool, cinematic",
        scale: &["C", "D", "Eb", "F", "G", "A", "Bb"],
        degrees: &[0, 2, 3, 5, 7, 9, 10],
        accent: (96, 165, 250),
        symbol: "🌙",
        description: "midnight stories",
    },
    MoodScale {
        name: "Aeolian",
        mood: "warm melancholy",
        scale: &["C", "D", "Eb", "F", "G", "Ab", "Bb"],
        degrees: &[0, 2, 3, 5, 7, 8, 10],
        accent: (251, 146, 60),
        symbol: "🍃",
        description: "autumn memories",
    },
    MoodScale {
        name: "Mixolydian",
        mood: "bright but with soft tension",
        scale: &["C", "D", "E", "F", "G", "A", "Bb"],
        degrees: &[0, 2, 4, 5, 7, 9, 10],
        accent: (52, 211, 153),
        symbol: "🌊",
        description: "ocean waves",
    },
    MoodScale {
        name: "Phrygian",
        mood: "misty, exotic",
        scale: &["C", "Db", "Eb", "F", "G", "Ab", "Bb"],
        degrees: &[0, 1, 3, 5, 7, 8, 10],
        accent: (192, 132, 252),
        symbol: "🔮",
        description: "mystic realms",
    },
    MoodScale {
        name: "Whole Tone",
        mood: "floating weightlessness",
        scale: &["C", "D", "E", "F#", "G#", "A#"],
        degrees: &[0, 2, 4, 6, 8, 10],
        accent: (34, 211, 238),
        symbol: "☁️",
        description: "dreamlike suspension",
    },
    MoodScale {
        name: "Hirajoshi",
        mood: "glassy meditation",
        scale: &["C", "Db", "F", "G", "Ab"],
        degrees: &[0, 1, 5, 7, 8],
        accent: (251, 113, 133),
        symbol: "🌸",
        description: "cherry blossoms",
    },
];

/// Find a mood by name. Callers fall back to a default triad on `None`, never an error.
pub fn lookup(name: &str) -> Option<&'static MoodScale> {
    MOODS.iter().find(|m| m.name == name)
}

pub fn index_of(name: &str) -> Option<usize> {
    MOODS.iter().position(|m| m.name == name)
}
