pub mod composition;
pub mod notes;
pub mod random;
pub mod scales;
pub mod time;

pub use composition::{Chord, chord_from_note, loop_interval, mood_pattern, note_pool};
pub use notes::NoteToken;
pub use random::{RandomSource, SeededRandom, SequenceRandom};
pub use scales::{MOODS, MoodScale, lookup};
pub use time::MusicalTime;
