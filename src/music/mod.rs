//! Music primitives: primers, chord progressions, MIDI I/O and statistics

pub mod chords;
pub mod midi;
pub mod primer;
pub mod stats;

pub use chords::ChordProgression;
pub use primer::{PrimerMelody, PrimerTiming};
