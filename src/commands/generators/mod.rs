//! Generator backend implementations
//!
//! Each backend module implements the GeneratorBackend trait for a specific CLI tool.

pub mod improv_rnn;
pub mod melody_rnn;

use super::generator::{GeneratorBackend, GeneratorKind};

/// Get the backend implementation for a given kind
pub fn get_backend(kind: GeneratorKind) -> Box<dyn GeneratorBackend> {
    match kind {
        GeneratorKind::MelodyRnn => Box::new(melody_rnn::MelodyRnnBackend),
        GeneratorKind::ImprovRnn => Box::new(improv_rnn::ImprovRnnBackend),
    }
}

/// Flags shared by every melody tool, in the order the tools document them
pub(crate) fn common_args(
    request: &super::generator::GenerationRequest,
    output_dir: &std::path::Path,
    primer_midi: Option<&std::path::Path>,
) -> Vec<String> {
    let mut args = vec![
        format!("--config={}", request.model),
        format!("--bundle_file={}", request.bundle_file.display()),
        format!("--output_dir={}", output_dir.display()),
        format!("--num_outputs={}", request.num_outputs),
    ];

    match primer_midi {
        Some(path) => args.push(format!("--primer_midi={}", path.display())),
        None => args.push(format!("--primer_melody={}", request.primer.literal())),
    }

    if let Some(steps) = request.num_steps {
        args.push(format!("--num_steps={}", steps));
    }
    if let Some(qpm) = request.qpm {
        args.push(format!("--qpm={}", qpm));
    }
    if let Some(temperature) = request.temperature {
        args.push(format!("--temperature={}", temperature));
    }

    args
}
