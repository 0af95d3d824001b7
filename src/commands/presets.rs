//! Built-in batches
//!
//! Each preset is a plain [`BatchConfig`] handed to the driver like any file
//! config; `presets show NAME` prints it as JSON to start a custom one.

use std::path::PathBuf;

use super::config::{BatchConfig, VariationDefaults, VariationSpec};
use super::generator::GeneratorKind;
use crate::music::{ChordProgression, PrimerMelody, PrimerTiming};

/// D4 D5 A4 C4 C5 G4 A4 F5
pub const GOTYE_NOTES: [u8; 8] = [62, 74, 69, 60, 72, 67, 69, 77];

pub const GAME_PATTERNS: [(&str, [u8; 7]); 4] = [
    ("main_theme", [72, 72, 72, 68, 72, 76, 64]),
    ("underground", [60, 62, 60, 62, 60, 59, 60]),
    ("overworld", [76, 72, 76, 72, 74, 71, 69]),
    ("power_up", [64, 67, 71, 74, 67, 74, 79]),
];

/// Continuation length used by the game preset, in primer note slots
const CONTINUATION_NOTES: f64 = 32.0;

/// Steps generated after the gotye primer
const GOTYE_CONTINUATION_STEPS: u32 = 32;

pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub build: fn() -> Result<BatchConfig, String>,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "improv",
        description: "Five chord-conditioned variations over pop, minor and folk progressions",
        build: improv_variations,
    },
    Preset {
        name: "game",
        description: "Bouncy game-style primers continued by basic_rnn",
        build: game_patterns,
    },
    Preset {
        name: "comparison",
        description: "Gotye primer vs. game primer through the same model",
        build: comparison,
    },
    Preset {
        name: "gotye",
        description: "First four notes of the Gotye melody, three continuations",
        build: gotye,
    },
];

pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

fn primer(pitches: &[u8]) -> Result<PrimerMelody, String> {
    PrimerMelody::new(pitches.to_vec())
}

fn chords(text: &str) -> Result<ChordProgression, String> {
    ChordProgression::parse(text)
}

pub fn improv_variations() -> Result<BatchConfig, String> {
    let pop = chords("C G Am F C G Am F")?;
    let entries = [
        ("basic_pop", "basic_improv", pop.clone(), 60),
        ("attention_pop", "attention_improv", pop.clone(), 60),
        ("chord_pitches_pop", "chord_pitches_improv", pop, 60),
        // Start on A
        ("minor_melody", "attention_improv", chords("Am F C G Am F C G")?, 69),
        // Start on G
        ("folk_style", "attention_improv", chords("G D Em C G D Em C")?, 67),
    ];

    let variations = entries
        .into_iter()
        .map(|(name, model, progression, start)| {
            Ok(VariationSpec::new(name, model, primer(&[start])?).with_chords(progression))
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(BatchConfig {
        output_dir: PathBuf::from("./all_improv_variations"),
        variations,
        ..BatchConfig::empty()
    })
}

fn melody_defaults(num_outputs: u32, temperature: f32) -> VariationDefaults {
    VariationDefaults {
        generator: GeneratorKind::MelodyRnn,
        num_outputs,
        render_chords: false,
        temperature: Some(temperature),
        ..VariationDefaults::default()
    }
}

pub fn game_patterns() -> Result<BatchConfig, String> {
    let timing = PrimerTiming::bouncy();
    let variations = GAME_PATTERNS
        .iter()
        .map(|(name, notes)| {
            Ok(VariationSpec::new(&format!("game_style_{}", name), "basic_rnn", primer(notes)?))
        })
        .collect::<Result<Vec<_>, String>>()?;

    // Generate until 32 more note slots have passed after the primer
    let pattern_len = GAME_PATTERNS[0].1.len() as f64;
    let num_steps = timing.steps_for((pattern_len + CONTINUATION_NOTES) * timing.note_spacing_secs);

    Ok(BatchConfig {
        output_dir: PathBuf::from("./game_generated"),
        defaults: VariationDefaults {
            qpm: Some(timing.qpm as f32),
            primer_timing: Some(timing),
            num_steps: Some(num_steps),
            ..melody_defaults(3, 0.8)
        },
        variations,
        ..BatchConfig::empty()
    })
}

pub fn comparison() -> Result<BatchConfig, String> {
    let mut config = BatchConfig {
        output_dir: PathBuf::from("./comparison"),
        defaults: VariationDefaults {
            primer_timing: Some(PrimerTiming::default()),
            ..melody_defaults(1, 1.0)
        },
        ..BatchConfig::empty()
    };
    for (name, notes) in [
        ("comparison_gotye_style", &GOTYE_NOTES[..4]),
        ("comparison_game_style", &GAME_PATTERNS[0].1[..]),
    ] {
        let mut spec = VariationSpec::new(name, "basic_rnn", primer(notes)?);
        // Primer at 4 steps per note plus 16 notes' worth of continuation
        spec.num_steps = Some((notes.len() as u32 + 16) * 4);
        config.variations.push(spec);
    }
    Ok(config)
}

pub fn gotye() -> Result<BatchConfig, String> {
    let timing = PrimerTiming::default();
    let opening = primer(&GOTYE_NOTES)?.truncated(4);
    let primer_steps = timing.steps_for(opening.len() as f64 * timing.note_spacing_secs);

    let mut spec = VariationSpec::new("gotye_ai", "basic_rnn", opening);
    spec.num_steps = Some(primer_steps + GOTYE_CONTINUATION_STEPS);
    Ok(BatchConfig {
        output_dir: PathBuf::from("./gotye"),
        defaults: VariationDefaults {
            primer_timing: Some(timing),
            ..melody_defaults(3, 1.0)
        },
        variations: vec![spec],
        ..BatchConfig::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::generator::Invocation;
    use std::path::Path;

    #[test]
    fn test_every_preset_resolves() {
        for preset in PRESETS {
            let plan = (preset.build)()
                .and_then(|config| config.resolve())
                .unwrap_or_else(|e| panic!("{} failed: {}", preset.name, e));
            assert!(!plan.variations.is_empty(), "{}", preset.name);
        }
    }

    #[test]
    fn test_improv_preset_matches_known_set() {
        let plan = improv_variations().unwrap().resolve().unwrap();
        let names: Vec<&str> = plan.variations.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["basic_pop", "attention_pop", "chord_pitches_pop", "minor_melody", "folk_style"]
        );

        let basic = &plan.variations[0];
        assert_eq!(basic.model, "basic_improv");
        assert_eq!(basic.primer.literal(), "[60]");
        assert_eq!(basic.chords.as_ref().unwrap().literal(), "C G Am F C G Am F");
        assert_eq!(basic.num_outputs, 2);
        assert!(basic.render_chords);

        let folk = &plan.variations[4];
        assert_eq!(folk.primer.literal(), "[67]");
        assert_eq!(folk.chords.as_ref().unwrap().literal(), "G D Em C G D Em C");
    }

    #[test]
    fn test_game_preset_uses_primer_midi() {
        let plan = game_patterns().unwrap().resolve().unwrap();
        assert_eq!(plan.variations.len(), 4);
        for variation in &plan.variations {
            assert_eq!(variation.kind, GeneratorKind::MelodyRnn);
            assert_eq!(variation.primer_timing, Some(PrimerTiming::bouncy()));
            assert_eq!(variation.temperature, Some(0.8));
            assert_eq!(variation.num_outputs, 3);
            assert_eq!(variation.qpm, Some(140.0));
        }
        assert_eq!(plan.variations[0].name, "game_style_main_theme");
    }

    #[test]
    fn test_gotye_preset_truncates_primer() {
        let plan = gotye().unwrap().resolve().unwrap();
        assert_eq!(plan.variations[0].primer.pitches(), &[62, 74, 69, 60]);
        assert_eq!(plan.variations[0].num_outputs, 3);
    }

    #[test]
    fn test_gotye_preset_primes_with_midi_and_continues_32_steps() {
        let plan = gotye().unwrap().resolve().unwrap();
        let variation = &plan.variations[0];
        let timing = variation.primer_timing.expect("gotye primes with timed notes");

        let invocation = Invocation::for_request(&variation.request(Path::new("out")));
        assert!(invocation
            .args
            .contains(&"--primer_midi=out/.primers/gotye_ai.mid".to_string()));
        assert!(!invocation.args.iter().any(|a| a.starts_with("--primer_melody")));

        let primer_steps = timing
            .quantize(&variation.primer)
            .last()
            .map(|n| n.end_step)
            .unwrap();
        assert_eq!(primer_steps, 16);
        assert_eq!(variation.num_steps, Some(primer_steps + 32));
    }

    #[test]
    fn test_game_preset_generates_32_note_slots_after_primer() {
        let plan = game_patterns().unwrap().resolve().unwrap();
        // (7 + 32) notes * 0.3s at 140 qpm
        assert!(plan.variations.iter().all(|v| v.num_steps == Some(109)));
    }

    #[test]
    fn test_find_preset() {
        assert!(find_preset("improv").is_some());
        assert!(find_preset("missing").is_none());
    }
}
