//! Primer melodies
//!
//! A primer is the short seed melody handed to the generator. The external
//! tools accept it either as a bracketed pitch literal (`[60, 62, 64]`) or as
//! a quantized MIDI file, so this module knows how to render both.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Steps per quarter note used when quantizing primers for melody models
pub const STEPS_PER_QUARTER: u32 = 4;

/// Largest tempo a MIDI set-tempo event can carry (24-bit microseconds per quarter)
pub const MAX_TEMPO_MICROS: u32 = 0xFF_FFFF;

/// Accepted primer tempo range; the lower bound keeps the tempo within 24 bits
const MIN_QPM: f64 = 60_000_000.0 / MAX_TEMPO_MICROS as f64;
const MAX_QPM: f64 = 1000.0;

/// Upper bound on primer note spacing and length, in seconds
const MAX_NOTE_SECS: f64 = 60.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A non-empty sequence of MIDI pitches (0-127)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct PrimerMelody {
    pitches: Vec<u8>,
}

impl PrimerMelody {
    pub fn new(pitches: Vec<u8>) -> Result<Self, String> {
        if pitches.is_empty() {
            return Err("Primer melody must contain at least one pitch".to_string());
        }
        if let Some(bad) = pitches.iter().find(|&&p| p > 127) {
            return Err(format!("Primer pitch {} is outside the MIDI range 0-127", bad));
        }
        Ok(Self { pitches })
    }

    /// Parse a bracketed literal such as `[62, 74, 69, 60]`
    pub fn parse(literal: &str) -> Result<Self, String> {
        let trimmed = literal.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| format!("Primer literal must be bracketed: '{}'", literal))?;

        let pitches = inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u8>()
                    .map_err(|e| format!("Invalid primer pitch '{}': {}", s, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(pitches)
    }

    pub fn pitches(&self) -> &[u8] {
        &self.pitches
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    /// Keep only the first `n` notes (at least one is always kept)
    pub fn truncated(&self, n: usize) -> Self {
        let n = n.clamp(1, self.pitches.len());
        Self {
            pitches: self.pitches[..n].to_vec(),
        }
    }

    /// Literal form understood by the generator's `--primer_melody` flag
    pub fn literal(&self) -> String {
        let parts: Vec<String> = self.pitches.iter().map(|p| p.to_string()).collect();
        format!("[{}]", parts.join(", "))
    }

    /// Scientific pitch names, e.g. `D4` for 62
    pub fn note_names(&self) -> Vec<String> {
        self.pitches.iter().map(|&p| pitch_name(p)).collect()
    }
}

impl TryFrom<Vec<u8>> for PrimerMelody {
    type Error = String;

    fn try_from(pitches: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(pitches)
    }
}

impl From<PrimerMelody> for Vec<u8> {
    fn from(primer: PrimerMelody) -> Self {
        primer.pitches
    }
}

impl fmt::Display for PrimerMelody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

/// Name a MIDI pitch with its octave (middle C = C4)
pub fn pitch_name(pitch: u8) -> String {
    let octave = (pitch as i32 / 12) - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// How primer notes are laid out in time before quantization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimerTiming {
    /// Tempo in quarter notes per minute
    pub qpm: f64,
    /// Seconds between consecutive note onsets
    pub note_spacing_secs: f64,
    /// Sounding length of each note in seconds
    pub note_length_secs: f64,
    pub velocity: u8,
}

impl Default for PrimerTiming {
    fn default() -> Self {
        Self {
            qpm: 120.0,
            note_spacing_secs: 0.5,
            note_length_secs: 0.5,
            velocity: 80,
        }
    }
}

impl PrimerTiming {
    /// Fast, short notes for a bouncy game-music feel
    pub fn bouncy() -> Self {
        Self {
            qpm: 140.0,
            note_spacing_secs: 0.3,
            note_length_secs: 0.25,
            velocity: 90,
        }
    }

    /// Check the timing can be quantized and written as MIDI
    pub fn validate(&self) -> Result<(), String> {
        if !(self.qpm.is_finite() && (MIN_QPM..=MAX_QPM).contains(&self.qpm)) {
            return Err(format!(
                "qpm {} is outside {:.2}-{}",
                self.qpm, MIN_QPM, MAX_QPM
            ));
        }
        for (field, secs) in [
            ("note_spacing_secs", self.note_spacing_secs),
            ("note_length_secs", self.note_length_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0 && secs <= MAX_NOTE_SECS) {
                return Err(format!("{} {} must be above 0 and at most {}", field, secs, MAX_NOTE_SECS));
            }
        }
        if !(1..=127).contains(&self.velocity) {
            return Err(format!("velocity {} is outside 1-127", self.velocity));
        }
        Ok(())
    }

    fn seconds_per_step(&self) -> f64 {
        60.0 / self.qpm / STEPS_PER_QUARTER as f64
    }

    /// Number of grid steps covering `secs`, rounded to the nearest step
    pub fn steps_for(&self, secs: f64) -> u32 {
        (secs / self.seconds_per_step()).round() as u32
    }

    /// Snap every primer note onto the step grid.
    ///
    /// Onsets and releases round to the nearest step. A note that collapses
    /// to zero length is held for one step so it still sounds.
    pub fn quantize(&self, primer: &PrimerMelody) -> Vec<QuantizedNote> {
        let step = self.seconds_per_step();
        primer
            .pitches()
            .iter()
            .enumerate()
            .map(|(i, &pitch)| {
                let start = i as f64 * self.note_spacing_secs;
                let end = start + self.note_length_secs;
                let start_step = (start / step).round() as u32;
                let mut end_step = (end / step).round() as u32;
                if end_step <= start_step {
                    end_step = start_step.saturating_add(1);
                }
                QuantizedNote {
                    pitch,
                    start_step,
                    end_step,
                    velocity: self.velocity.min(127),
                }
            })
            .collect()
    }
}

/// A primer note placed on the quantized step grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizedNote {
    pub pitch: u8,
    pub start_step: u32,
    pub end_step: u32,
    pub velocity: u8,
}
