//! Batch generation driver
//!
//! Runs every variation of a plan through a [`Generator`], strictly one after
//! another. A failing variation is recorded and reported; the batch always
//! moves on to the next one.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::config::Variation;
use super::generator::{GenerationError, Generator};
use super::logging::log_message;

/// Result of one variation
#[derive(Debug)]
pub struct VariationOutcome {
    pub name: String,
    pub result: Result<Vec<PathBuf>, GenerationError>,
}

impl VariationOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-variation results, in the order the variations were given
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<VariationOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// All artifacts written by successful variations
    pub fn artifacts(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .flatten()
    }
}

/// Run `variations` in order, writing progress lines to `out`.
///
/// Output lines are `Generating NAME...` followed by either
/// `✓ NAME completed` or `✗ NAME failed: ERROR`.
pub fn run_batch<W: Write>(
    variations: &[Variation],
    output_dir: &Path,
    generator: &dyn Generator,
    out: &mut W,
) -> BatchReport {
    let mut report = BatchReport::default();

    for variation in variations {
        let _ = writeln!(out, "Generating {}...", variation.name);

        let request = variation.request(output_dir);
        let result = generator.generate(&request);

        match &result {
            Ok(artifacts) => {
                let _ = writeln!(out, "✓ {} completed", variation.name);
                log_message(
                    "INFO",
                    "batch",
                    &format!("{} completed with {} file(s)", variation.name, artifacts.len()),
                );
            }
            Err(e) => {
                let _ = writeln!(out, "✗ {} failed: {}", variation.name, e);
                log_message("WARN", "batch", &format!("{} failed: {}", variation.name, e));
            }
        }

        report.outcomes.push(VariationOutcome {
            name: variation.name.clone(),
            result,
        });
    }

    report
}

/// One-line summary printed after a batch
pub fn summarize(report: &BatchReport) -> String {
    format!(
        "{} of {} variation(s) completed, {} failed, {} file(s) written",
        report.succeeded(),
        report.outcomes.len(),
        report.failed(),
        report.artifacts().count()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::config::BatchConfig;
    use crate::commands::generator::{GenerationRequest, Invocation};
    use crate::commands::presets::improv_variations;
    use std::cell::RefCell;

    /// Records each request; fails the names it is told to
    struct FakeGenerator {
        fail: Vec<&'static str>,
        seen: RefCell<Vec<GenerationRequest>>,
    }

    impl FakeGenerator {
        fn new(fail: Vec<&'static str>) -> Self {
            Self {
                fail,
                seen: RefCell::new(Vec::new()),
            }
        }

        fn seen_names(&self) -> Vec<String> {
            self.seen.borrow().iter().map(|r| r.label.clone()).collect()
        }
    }

    impl Generator for FakeGenerator {
        fn generate(&self, request: &GenerationRequest) -> Result<Vec<PathBuf>, GenerationError> {
            self.seen.borrow_mut().push(request.clone());
            if self.fail.contains(&request.label.as_str()) {
                return Err(GenerationError::Failed {
                    status: "exit status: 1".to_string(),
                    stderr: format!("could not load {}", request.bundle_file.display()),
                });
            }
            Ok((1..=request.num_outputs as usize)
                .map(|i| request.artifact_path(i))
                .collect())
        }
    }

    fn improv_plan() -> Vec<Variation> {
        improv_variations().unwrap().resolve().unwrap().variations
    }

    #[test]
    fn test_failure_does_not_stop_later_variations() {
        let generator = FakeGenerator::new(vec!["basic_pop", "minor_melody"]);
        let mut out = Vec::new();

        let report = run_batch(&improv_plan(), Path::new("out"), &generator, &mut out);

        assert_eq!(
            generator.seen_names(),
            vec!["basic_pop", "attention_pop", "chord_pitches_pop", "minor_melody", "folk_style"]
        );
        assert_eq!(report.outcomes.len(), 5);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.succeeded(), 3);
        assert!(!report.outcomes[0].succeeded());
        assert!(report.outcomes[4].succeeded());

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("✗ basic_pop failed: could not load ./basic_improv.mag"));
        assert!(text.contains("✓ folk_style completed"));
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let generator = FakeGenerator::new(Vec::new());
        let mut out = Vec::new();

        let report = run_batch(&[], Path::new("out"), &generator, &mut out);

        assert!(generator.seen_names().is_empty());
        assert!(report.outcomes.is_empty());
        assert!(out.is_empty());
        assert_eq!(summarize(&report), "0 of 0 variation(s) completed, 0 failed, 0 file(s) written");
    }

    #[test]
    fn test_basic_pop_invocation_and_message() {
        let json = r#"{
            "variations": [
                { "name": "basic_pop", "model": "basic_improv", "chords": "C G Am F C G Am F", "primer": [60] }
            ]
        }"#;
        let plan = BatchConfig::from_json(json).unwrap().resolve().unwrap();
        let generator = FakeGenerator::new(Vec::new());
        let mut out = Vec::new();

        let report = run_batch(&plan.variations, &plan.output_dir, &generator, &mut out);

        let request = generator.seen.borrow()[0].clone();
        let args = Invocation::for_request(&request).args;
        assert_eq!(
            args.iter().filter(|a| a.starts_with("--backing_chords=")).collect::<Vec<_>>(),
            vec!["--backing_chords=C G Am F C G Am F"]
        );
        assert_eq!(
            args.iter().filter(|a| a.starts_with("--primer_melody=")).collect::<Vec<_>>(),
            vec!["--primer_melody=[60]"]
        );

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Generating basic_pop...\n✓ basic_pop completed\n");
        assert_eq!(report.succeeded(), 1);
    }

    #[test]
    fn test_artifact_names_follow_label_and_index() {
        let generator = FakeGenerator::new(Vec::new());
        let mut out = Vec::new();
        let plan = improv_plan();

        let report = run_batch(&plan[..1], Path::new("out"), &generator, &mut out);

        let artifacts: Vec<&PathBuf> = report.artifacts().collect();
        assert_eq!(
            artifacts,
            vec![
                &PathBuf::from("out/basic_pop_1.mid"),
                &PathBuf::from("out/basic_pop_2.mid")
            ]
        );
    }

    #[test]
    fn test_duplicate_names_are_both_attempted() {
        let plan = improv_plan();
        let duplicated = vec![plan[0].clone(), plan[0].clone()];
        let generator = FakeGenerator::new(Vec::new());
        let mut out = Vec::new();

        let report = run_batch(&duplicated, Path::new("out"), &generator, &mut out);

        assert_eq!(generator.seen_names(), vec!["basic_pop", "basic_pop"]);
        assert_eq!(report.succeeded(), 2);
    }
}
