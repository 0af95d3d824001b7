//! Derived statistics for generated melodies
//!
//! Measures whether a continuation stays close to the primer's intervals
//! and register.

use std::fmt::Write as _;

use super::primer::PrimerMelody;

/// Number of intervals shown when comparing against the primer
const PREVIEW_INTERVALS: usize = 5;

/// Successive pitch differences (in semitones)
pub fn intervals(pitches: &[u8]) -> Vec<i16> {
    pitches
        .windows(2)
        .map(|w| w[1] as i16 - w[0] as i16)
        .collect()
}

/// Lowest and highest pitch, if any
pub fn pitch_range(pitches: &[u8]) -> Option<(u8, u8)> {
    let min = pitches.iter().min()?;
    let max = pitches.iter().max()?;
    Some((*min, *max))
}

/// Statistics of one generated melody measured against its primer
#[derive(Debug, Clone, PartialEq)]
pub struct MelodyStats {
    pub pitches: Vec<u8>,
    pub primer_intervals: Vec<i16>,
    /// Intervals of the generated melody, truncated to the primer's interval count
    pub generated_intervals: Vec<i16>,
    pub primer_range: (u8, u8),
    pub generated_range: Option<(u8, u8)>,
    /// Notes after the primer-length prefix
    pub continuation: Vec<u8>,
}

impl MelodyStats {
    pub fn compare(primer: &PrimerMelody, generated: &[u8]) -> Self {
        let primer_pitches = primer.pitches();
        let primer_intervals = intervals(primer_pitches);

        let mut generated_intervals = intervals(generated);
        generated_intervals.truncate(primer_intervals.len());

        let continuation = generated
            .get(primer_pitches.len()..)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        Self {
            pitches: generated.to_vec(),
            primer_intervals,
            generated_intervals,
            // Primers are never empty
            primer_range: pitch_range(primer_pitches).unwrap_or((0, 0)),
            generated_range: pitch_range(generated),
            continuation,
        }
    }

    /// Whether every generated pitch lies inside the primer's register
    pub fn stays_in_primer_range(&self) -> bool {
        match self.generated_range {
            Some((lo, hi)) => lo >= self.primer_range.0 && hi <= self.primer_range.1,
            None => true,
        }
    }

    /// Multi-line human-readable report
    pub fn render(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}: {:?}", title, self.pitches);
        let _ = writeln!(
            out,
            "  Original intervals: {:?}...",
            preview(&self.primer_intervals)
        );
        let _ = writeln!(
            out,
            "  Generated intervals: {:?}...",
            preview(&self.generated_intervals)
        );
        let _ = writeln!(out, "  Original range: {:?}", self.primer_range);
        match self.generated_range {
            Some(range) => {
                let _ = writeln!(out, "  Generated range: {:?}", range);
            }
            None => {
                let _ = writeln!(out, "  Generated range: (no notes)");
            }
        }
        if self.continuation.len() > 10 {
            let _ = writeln!(out, "  Continuation: {:?}...", &self.continuation[..10]);
        } else {
            let _ = writeln!(out, "  Continuation: {:?}", self.continuation);
        }
        out
    }
}

fn preview(values: &[i16]) -> &[i16] {
    &values[..values.len().min(PREVIEW_INTERVALS)]
}
