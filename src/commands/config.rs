//! Batch configuration files
//!
//! A batch is either an explicit list of variations, a sweep over
//! models × chord progressions × primers, or both. Everything is resolved up
//! front into immutable [`Variation`] records so the driver never touches
//! the raw config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::generator::{GenerationRequest, GeneratorKind};
use super::models::find_bundle;
use crate::music::{ChordProgression, PrimerMelody, PrimerTiming};

fn default_output_dir() -> PathBuf {
    PathBuf::from("./generated")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_num_outputs() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default)]
    pub defaults: VariationDefaults,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<VariationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepSpec>,
}

/// Settings applied to every variation unless it overrides them
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VariationDefaults {
    #[serde(default)]
    pub generator: GeneratorKind,
    #[serde(default = "default_num_outputs")]
    pub num_outputs: u32,
    #[serde(default = "default_true")]
    pub render_chords: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qpm: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primer_timing: Option<PrimerTiming>,
}

impl Default for VariationDefaults {
    fn default() -> Self {
        Self {
            generator: GeneratorKind::default(),
            num_outputs: default_num_outputs(),
            render_chords: true,
            temperature: None,
            num_steps: None,
            qpm: None,
            primer_timing: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VariationSpec {
    pub name: String,
    pub model: String,
    pub primer: PrimerMelody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chords: Option<ChordProgression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_outputs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_chords: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qpm: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primer_timing: Option<PrimerTiming>,
}

impl VariationSpec {
    /// A variation with every optional field left to the defaults
    pub fn new(name: &str, model: &str, primer: PrimerMelody) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            primer,
            chords: None,
            generator: None,
            bundle_file: None,
            num_outputs: None,
            render_chords: None,
            temperature: None,
            num_steps: None,
            qpm: None,
            primer_timing: None,
        }
    }

    pub fn with_chords(mut self, chords: ChordProgression) -> Self {
        self.chords = Some(chords);
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NamedProgression {
    pub name: String,
    pub chords: ChordProgression,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NamedPrimer {
    pub name: String,
    pub primer: PrimerMelody,
}

/// Cartesian product of models × progressions × primers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SweepSpec {
    pub models: Vec<String>,
    #[serde(default)]
    pub progressions: Vec<NamedProgression>,
    pub primers: Vec<NamedPrimer>,
}

impl SweepSpec {
    /// Expand into variations, model-major, then progression, then primer.
    ///
    /// Names join the parts with `_`. Without progressions (melody-only
    /// sweeps) the progression part is left out.
    pub fn expand(&self) -> Vec<VariationSpec> {
        let mut specs = Vec::new();
        for model in &self.models {
            if self.progressions.is_empty() {
                for primer in &self.primers {
                    let name = format!("{}_{}", model, primer.name);
                    specs.push(VariationSpec::new(&name, model, primer.primer.clone()));
                }
                continue;
            }
            for progression in &self.progressions {
                for primer in &self.primers {
                    let name = format!("{}_{}_{}", model, progression.name, primer.name);
                    specs.push(
                        VariationSpec::new(&name, model, primer.primer.clone())
                            .with_chords(progression.chords.clone()),
                    );
                }
            }
        }
        specs
    }
}

/// One fully-resolved configuration record
#[derive(Debug, Clone, PartialEq)]
pub struct Variation {
    pub name: String,
    pub kind: GeneratorKind,
    pub model: String,
    pub bundle_file: PathBuf,
    pub chords: Option<ChordProgression>,
    pub primer: PrimerMelody,
    pub primer_timing: Option<PrimerTiming>,
    pub num_outputs: u32,
    pub num_steps: Option<u32>,
    pub temperature: Option<f32>,
    pub qpm: Option<f32>,
    pub render_chords: bool,
}

impl Variation {
    /// Request for this variation writing into `output_dir`
    pub fn request(&self, output_dir: &Path) -> GenerationRequest {
        GenerationRequest {
            label: self.name.clone(),
            kind: self.kind,
            model: self.model.clone(),
            bundle_file: self.bundle_file.clone(),
            output_dir: output_dir.to_path_buf(),
            num_outputs: self.num_outputs,
            primer: self.primer.clone(),
            primer_timing: self.primer_timing,
            chords: self.chords.clone(),
            render_chords: self.render_chords,
            num_steps: self.num_steps,
            temperature: self.temperature,
            qpm: self.qpm,
        }
    }
}

/// A resolved batch, ready for the driver
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub output_dir: PathBuf,
    pub models_dir: PathBuf,
    pub variations: Vec<Variation>,
}

impl BatchConfig {
    /// An empty batch with default directories
    pub fn empty() -> Self {
        Self {
            output_dir: default_output_dir(),
            models_dir: default_models_dir(),
            defaults: VariationDefaults::default(),
            variations: Vec::new(),
            sweep: None,
        }
    }

    /// Load a batch config from a JSON file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_json(&content)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))
    }

    /// Resolve defaults, expand the sweep and validate every record
    pub fn resolve(&self) -> Result<BatchPlan, String> {
        let swept = self.sweep.as_ref().map(SweepSpec::expand).unwrap_or_default();

        let variations = self
            .variations
            .iter()
            .chain(swept.iter())
            .map(|spec| self.resolve_one(spec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BatchPlan {
            output_dir: self.output_dir.clone(),
            models_dir: self.models_dir.clone(),
            variations,
        })
    }

    fn resolve_one(&self, spec: &VariationSpec) -> Result<Variation, String> {
        validate_name(&spec.name)?;
        if spec.model.trim().is_empty() {
            return Err(format!("Variation '{}' has no model", spec.name));
        }

        let defaults = &self.defaults;
        let kind = spec
            .generator
            .or_else(|| find_bundle(&spec.model).map(|b| b.kind))
            .unwrap_or(defaults.generator);

        if kind.supports_chords() && spec.chords.is_none() {
            return Err(format!(
                "Variation '{}' uses {} but has no chord progression",
                spec.name,
                kind.display_name()
            ));
        }

        let num_outputs = spec.num_outputs.unwrap_or(defaults.num_outputs);
        if num_outputs == 0 {
            return Err(format!("Variation '{}' asks for zero outputs", spec.name));
        }

        let temperature = spec.temperature.or(defaults.temperature);
        if let Some(t) = temperature {
            if !(t.is_finite() && t > 0.0) {
                return Err(format!("Variation '{}' has invalid temperature {}", spec.name, t));
            }
        }

        let qpm = spec.qpm.or(defaults.qpm);
        if let Some(q) = qpm {
            if !(q.is_finite() && q > 0.0) {
                return Err(format!("Variation '{}' has invalid qpm {}", spec.name, q));
            }
        }

        let primer_timing = spec.primer_timing.or(defaults.primer_timing);
        if let Some(timing) = &primer_timing {
            timing.validate().map_err(|e| {
                format!("Variation '{}' has invalid primer timing: {}", spec.name, e)
            })?;
        }

        let bundle_file = spec
            .bundle_file
            .clone()
            .unwrap_or_else(|| self.models_dir.join(format!("{}.mag", spec.model)));

        Ok(Variation {
            name: spec.name.clone(),
            kind,
            model: spec.model.clone(),
            bundle_file,
            chords: spec.chords.clone(),
            primer: spec.primer.clone(),
            primer_timing,
            num_outputs,
            num_steps: spec.num_steps.or(defaults.num_steps),
            temperature,
            qpm,
            render_chords: spec.render_chords.unwrap_or(defaults.render_chords),
        })
    }
}

/// Names become file names, so keep them to `[A-Za-z0-9_-]`
fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Variation name is empty".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!(
            "Variation name '{}' may only contain letters, digits, '_' and '-'",
            name
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMPROV_JSON: &str = r#"{
        "output_dir": "./all_improv_variations",
        "variations": [
            { "name": "basic_pop", "model": "basic_improv", "chords": "C G Am F C G Am F", "primer": [60] },
            { "name": "minor_melody", "model": "attention_improv", "chords": "Am F C G Am F C G", "primer": [69] }
        ]
    }"#;

    #[test]
    fn test_load_explicit_variations_with_defaults() {
        let plan = BatchConfig::from_json(IMPROV_JSON).unwrap().resolve().unwrap();
        assert_eq!(plan.output_dir, PathBuf::from("./all_improv_variations"));
        assert_eq!(plan.variations.len(), 2);

        let basic = &plan.variations[0];
        assert_eq!(basic.name, "basic_pop");
        assert_eq!(basic.kind, GeneratorKind::ImprovRnn);
        assert_eq!(basic.bundle_file, PathBuf::from("./basic_improv.mag"));
        assert_eq!(basic.num_outputs, 2);
        assert!(basic.render_chords);
        assert_eq!(basic.primer.literal(), "[60]");
        assert_eq!(basic.chords.as_ref().unwrap().literal(), "C G Am F C G Am F");
    }

    #[test]
    fn test_kind_inferred_from_catalog() {
        let config = BatchConfig {
            variations: vec![VariationSpec::new(
                "gotye",
                "basic_rnn",
                PrimerMelody::new(vec![62, 74, 69, 60]).unwrap(),
            )],
            ..BatchConfig::empty()
        };
        let plan = config.resolve().unwrap();
        assert_eq!(plan.variations[0].kind, GeneratorKind::MelodyRnn);
    }

    #[test]
    fn test_improv_requires_chords() {
        let config = BatchConfig {
            variations: vec![VariationSpec::new(
                "no_chords",
                "basic_improv",
                PrimerMelody::new(vec![60]).unwrap(),
            )],
            ..BatchConfig::empty()
        };
        let err = config.resolve().unwrap_err();
        assert!(err.contains("no chord progression"), "{}", err);
    }

    #[test]
    fn test_rejects_unsafe_names_and_zero_outputs() {
        let mut spec = VariationSpec::new("../escape", "basic_rnn", PrimerMelody::new(vec![60]).unwrap());
        let config = BatchConfig {
            variations: vec![spec.clone()],
            ..BatchConfig::empty()
        };
        assert!(config.resolve().is_err());

        spec.name = "ok".to_string();
        spec.num_outputs = Some(0);
        let config = BatchConfig {
            variations: vec![spec],
            ..BatchConfig::empty()
        };
        assert!(config.resolve().unwrap_err().contains("zero outputs"));
    }

    #[test]
    fn test_rejects_bad_fields_at_parse_time() {
        assert!(BatchConfig::from_json(r#"{"variations": [{"name": "a", "model": "m", "primer": []}]}"#).is_err());
        assert!(BatchConfig::from_json(r#"{"variations": [{"name": "a", "model": "m", "primer": [60], "chords": "X"}]}"#).is_err());
        assert!(BatchConfig::from_json(r#"{"unknown_field": 1}"#).is_err());
    }

    #[test]
    fn test_rejects_invalid_primer_timing() {
        let json = r#"{
            "defaults": { "generator": "melody_rnn" },
            "variations": [
                { "name": "crawl", "model": "basic_rnn", "primer": [60, 62],
                  "primer_timing": { "qpm": 2.0, "note_spacing_secs": 0.5, "note_length_secs": 0.5, "velocity": 80 } }
            ]
        }"#;
        let err = BatchConfig::from_json(json).unwrap().resolve().unwrap_err();
        assert!(err.contains("Variation 'crawl' has invalid primer timing"), "{}", err);

        let json = r#"{
            "defaults": {
                "primer_timing": { "qpm": 120.0, "note_spacing_secs": 1e12, "note_length_secs": 0.5, "velocity": 80 }
            },
            "variations": [ { "name": "far", "model": "basic_rnn", "primer": [60, 62] } ]
        }"#;
        let err = BatchConfig::from_json(json).unwrap().resolve().unwrap_err();
        assert!(err.contains("invalid primer timing"), "{}", err);
    }

    #[test]
    fn test_empty_config_resolves_to_nothing() {
        let plan = BatchConfig::from_json("{}").unwrap().resolve().unwrap();
        assert!(plan.variations.is_empty());
        assert_eq!(plan.output_dir, PathBuf::from("./generated"));
    }

    #[test]
    fn test_sweep_expansion_order_and_names() {
        let json = r#"{
            "variations": [
                { "name": "first", "model": "basic_improv", "chords": "C G", "primer": [60] }
            ],
            "sweep": {
                "models": ["basic_improv", "attention_improv"],
                "progressions": [
                    { "name": "pop", "chords": "C G Am F" },
                    { "name": "folk", "chords": "G D Em C" }
                ],
                "primers": [
                    { "name": "c", "primer": [60] },
                    { "name": "g", "primer": [67] }
                ]
            }
        }"#;
        let plan = BatchConfig::from_json(json).unwrap().resolve().unwrap();
        let names: Vec<&str> = plan.variations.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "first",
                "basic_improv_pop_c",
                "basic_improv_pop_g",
                "basic_improv_folk_c",
                "basic_improv_folk_g",
                "attention_improv_pop_c",
                "attention_improv_pop_g",
                "attention_improv_folk_c",
                "attention_improv_folk_g",
            ]
        );
        assert_eq!(plan.variations[8].chords.as_ref().unwrap().literal(), "G D Em C");
        assert_eq!(plan.variations[8].primer.pitches(), &[67]);
    }

    #[test]
    fn test_melody_sweep_without_progressions() {
        let sweep = SweepSpec {
            models: vec!["basic_rnn".to_string()],
            progressions: Vec::new(),
            primers: vec![NamedPrimer {
                name: "main_theme".to_string(),
                primer: PrimerMelody::new(vec![72, 72, 72]).unwrap(),
            }],
        };
        let specs = sweep.expand();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "basic_rnn_main_theme");
        assert!(specs[0].chords.is_none());
    }

    #[test]
    fn test_variation_overrides_defaults() {
        let json = r#"{
            "models_dir": "models",
            "defaults": { "num_outputs": 3, "temperature": 0.8, "render_chords": false },
            "variations": [
                { "name": "hot", "model": "attention_improv", "chords": "C", "primer": [60], "temperature": 1.5 },
                { "name": "custom", "model": "attention_improv", "chords": "C", "primer": [60], "bundle_file": "/tmp/x.mag", "render_chords": true }
            ]
        }"#;
        let plan = BatchConfig::from_json(json).unwrap().resolve().unwrap();
        assert_eq!(plan.variations[0].temperature, Some(1.5));
        assert_eq!(plan.variations[0].num_outputs, 3);
        assert!(!plan.variations[0].render_chords);
        assert_eq!(plan.variations[0].bundle_file, PathBuf::from("models/attention_improv.mag"));
        assert_eq!(plan.variations[1].temperature, Some(0.8));
        assert_eq!(plan.variations[1].bundle_file, PathBuf::from("/tmp/x.mag"));
        assert!(plan.variations[1].render_chords);
    }

    #[test]
    fn test_request_carries_variation_fields() {
        let plan = BatchConfig::from_json(IMPROV_JSON).unwrap().resolve().unwrap();
        let request = plan.variations[1].request(Path::new("out"));
        assert_eq!(request.label, "minor_melody");
        assert_eq!(request.output_dir, PathBuf::from("out"));
        assert_eq!(request.model, "attention_improv");
        assert_eq!(request.primer.literal(), "[69]");
    }

    #[test]
    fn test_json_round_trip_of_config() {
        let config = BatchConfig::from_json(IMPROV_JSON).unwrap();
        let json = config.to_json().unwrap();
        assert_eq!(BatchConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_load_reports_path() {
        let err = BatchConfig::load(Path::new("/definitely/missing.json")).unwrap_err();
        assert!(err.contains("/definitely/missing.json"));
    }
}
