//! `melody_rnn_generate` backend

use std::path::Path;

use super::super::generator::{GenerationRequest, GeneratorBackend, GeneratorKind};
use super::common_args;

/// Unconditioned melody continuation
pub struct MelodyRnnBackend;

impl GeneratorBackend for MelodyRnnBackend {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::MelodyRnn
    }

    fn build_args(
        &self,
        request: &GenerationRequest,
        output_dir: &Path,
        primer_midi: Option<&Path>,
    ) -> Vec<String> {
        if request.chords.is_some() {
            log::debug!("{}: melody models ignore backing chords", request.label);
        }
        common_args(request, output_dir, primer_midi)
    }
}
