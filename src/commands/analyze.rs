//! Statistics over generated MIDI files

use std::path::{Path, PathBuf};

use super::batch::BatchReport;
use super::config::Variation;
use crate::music::midi::read_pitches;
use crate::music::stats::MelodyStats;
use crate::music::PrimerMelody;

/// Read one generated file and compare it against `primer`
pub fn analyze_file(primer: &PrimerMelody, path: &Path) -> Result<MelodyStats, String> {
    let pitches = read_pitches(path)?;
    Ok(MelodyStats::compare(primer, &pitches))
}

/// Print a comparison for every file; unreadable files are reported and skipped
pub fn print_analysis(primer: &PrimerMelody, files: &[PathBuf]) -> usize {
    println!("Primer melody: {:?} ({})", primer.pitches(), primer.note_names().join(" "));

    let mut analyzed = 0;
    for (i, path) in files.iter().enumerate() {
        match analyze_file(primer, path) {
            Ok(stats) => {
                println!();
                print!("{}", stats.render(&format!("Generation #{} ({})", i + 1, path.display())));
                analyzed += 1;
            }
            Err(e) => {
                println!();
                println!("✗ {}: {}", path.display(), e);
                log::warn!("Could not analyze {}: {}", path.display(), e);
            }
        }
    }
    analyzed
}

/// Analyze every artifact a batch produced against its variation's primer
pub fn print_report_analysis(report: &BatchReport, variations: &[Variation]) {
    for (outcome, variation) in report.outcomes.iter().zip(variations) {
        let Ok(artifacts) = &outcome.result else {
            continue;
        };
        if artifacts.is_empty() {
            continue;
        }
        println!();
        println!("=== {} ===", variation.name);
        print_analysis(&variation.primer, artifacts);
    }
}
