//! Backing chord progressions
//!
//! Progressions are passed to the improv generator as a space-separated list
//! of chord symbols. We check the symbols up front so a typo fails at config
//! load time instead of inside the external tool.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chord quality suffixes accepted after the root (and optional accidental)
const QUALITIES: &[&str] = &[
    "", "m", "min", "maj", "M", "7", "m7", "maj7", "M7", "dim", "dim7", "aug", "+", "sus2",
    "sus4", "6", "m6", "9", "m9", "maj9", "add9", "m7b5", "7sus4",
];

/// An ordered, non-empty list of chord symbols
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChordProgression {
    chords: Vec<String>,
}

impl ChordProgression {
    pub fn parse(text: &str) -> Result<Self, String> {
        let chords: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if chords.is_empty() {
            return Err("Chord progression is empty".to_string());
        }
        for chord in &chords {
            validate_chord_symbol(chord)?;
        }
        Ok(Self { chords })
    }

    pub fn chords(&self) -> &[String] {
        &self.chords
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Literal form for `--backing_chords`
    pub fn literal(&self) -> String {
        self.chords.join(" ")
    }
}

impl TryFrom<String> for ChordProgression {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl From<ChordProgression> for String {
    fn from(progression: ChordProgression) -> Self {
        progression.literal()
    }
}

impl fmt::Display for ChordProgression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

/// Check a single symbol such as `Am`, `F#7` or `Bbmaj7`.
///
/// `N.C.` (no chord) is accepted as-is.
pub fn validate_chord_symbol(symbol: &str) -> Result<(), String> {
    if symbol == "N.C." {
        return Ok(());
    }

    let mut chars = symbol.chars();
    match chars.next() {
        Some('A'..='G') => {}
        _ => return Err(format!("Chord '{}' must start with a root A-G", symbol)),
    }

    let rest = chars.as_str();
    let quality = rest
        .strip_prefix('#')
        .or_else(|| rest.strip_prefix('b'))
        .unwrap_or(rest);

    // Slash chords: validate the bass note separately
    let (quality, bass) = match quality.split_once('/') {
        Some((q, b)) => (q, Some(b)),
        None => (quality, None),
    };

    if !QUALITIES.contains(&quality) {
        return Err(format!("Chord '{}' has unknown quality '{}'", symbol, quality));
    }

    if let Some(bass) = bass {
        let valid_bass = matches!(bass.len(), 1 | 2)
            && bass.starts_with(|c: char| ('A'..='G').contains(&c))
            && (bass.len() == 1 || bass.ends_with('#') || bass.ends_with('b'));
        if !valid_bass {
            return Err(format!("Chord '{}' has invalid bass note '{}'", symbol, bass));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_progression_literal() {
        let prog = ChordProgression::parse("C G Am F C G Am F").unwrap();
        assert_eq!(prog.len(), 8);
        assert_eq!(prog.literal(), "C G Am F C G Am F");
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let prog = ChordProgression::parse("  Am   F\tC G ").unwrap();
        assert_eq!(prog.literal(), "Am F C G");
    }

    #[test]
    fn test_accidentals_and_qualities() {
        for symbol in ["F#", "Bb", "Ebmaj7", "C#m7", "Gsus4", "Bdim", "D/F#", "N.C."] {
            assert!(validate_chord_symbol(symbol).is_ok(), "{} should be valid", symbol);
        }
    }

    #[test]
    fn test_rejects_invalid_symbols() {
        assert!(ChordProgression::parse("").is_err());
        assert!(ChordProgression::parse("   ").is_err());
        assert!(validate_chord_symbol("H").is_err());
        assert!(validate_chord_symbol("cm").is_err());
        assert!(validate_chord_symbol("Cxyz").is_err());
        assert!(validate_chord_symbol("C/X").is_err());
    }

    #[test]
    fn test_serde_round_trips_as_string() {
        let prog: ChordProgression = serde_json::from_str("\"G D Em C\"").unwrap();
        assert_eq!(prog.chords(), &["G", "D", "Em", "C"]);
        assert_eq!(serde_json::to_string(&prog).unwrap(), "\"G D Em C\"");
        assert!(serde_json::from_str::<ChordProgression>("\"Q\"").is_err());
    }
}
