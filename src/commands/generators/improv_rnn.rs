//! `improv_rnn_generate` backend

use std::path::Path;

use super::super::generator::{GenerationRequest, GeneratorBackend, GeneratorKind};
use super::common_args;

/// Melody generation over a backing chord progression
pub struct ImprovRnnBackend;

impl GeneratorBackend for ImprovRnnBackend {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::ImprovRnn
    }

    fn build_args(
        &self,
        request: &GenerationRequest,
        output_dir: &Path,
        primer_midi: Option<&Path>,
    ) -> Vec<String> {
        let mut args = common_args(request, output_dir, primer_midi);

        if let Some(ref chords) = request.chords {
            args.push(format!("--backing_chords={}", chords.literal()));
        }

        // Render the chords audibly alongside the melody
        if request.render_chords {
            args.push("--render_chords".to_string());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::{ChordProgression, PrimerMelody};
    use std::path::PathBuf;

    fn request(name: &str, model: &str, chords: &str, primer: &str) -> GenerationRequest {
        GenerationRequest {
            label: name.to_string(),
            kind: GeneratorKind::ImprovRnn,
            model: model.to_string(),
            bundle_file: PathBuf::from(format!("{}.mag", model)),
            output_dir: PathBuf::from("./all_improv_variations"),
            num_outputs: 2,
            primer: PrimerMelody::parse(primer).unwrap(),
            primer_timing: None,
            chords: Some(ChordProgression::parse(chords).unwrap()),
            render_chords: true,
            num_steps: None,
            temperature: None,
            qpm: None,
        }
    }

    #[test]
    fn test_basic_pop_flags() {
        let req = request("basic_pop", "basic_improv", "C G Am F C G Am F", "[60]");
        let args = ImprovRnnBackend.build_args(&req, Path::new("./all_improv_variations"), None);
        assert_eq!(
            args,
            vec![
                "--config=basic_improv",
                "--bundle_file=basic_improv.mag",
                "--output_dir=./all_improv_variations",
                "--num_outputs=2",
                "--primer_melody=[60]",
                "--backing_chords=C G Am F C G Am F",
                "--render_chords",
            ]
        );
    }

    #[test]
    fn test_render_chords_is_optional() {
        let mut req = request("minor_melody", "attention_improv", "Am F C G Am F C G", "[69]");
        req.render_chords = false;
        req.temperature = Some(1.2);
        let args = ImprovRnnBackend.build_args(&req, Path::new("out"), None);
        assert!(!args.contains(&"--render_chords".to_string()));
        assert!(args.contains(&"--backing_chords=Am F C G Am F C G".to_string()));
        assert!(args.contains(&"--temperature=1.2".to_string()));
    }
}
