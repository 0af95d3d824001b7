//! Generator abstraction layer
//!
//! The batch driver decides *what* to generate; a [`Generator`] decides *how*.
//! The usual implementation shells out to the melody tool's command-line
//! generator, but tests and `--dry-run` plug in their own.

use serde::{Deserialize, Serialize};
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use walkdir::WalkDir;

use super::generators::get_backend;
use super::prerequisites::wait_with_timeout;
use crate::music::midi::write_primer_midi;
use crate::music::{ChordProgression, PrimerMelody, PrimerTiming};

/// Supported command-line generators
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    MelodyRnn,
    #[default]
    ImprovRnn,
}

impl GeneratorKind {
    /// Get the display name for this generator
    pub fn display_name(&self) -> &'static str {
        match self {
            GeneratorKind::MelodyRnn => "Melody RNN",
            GeneratorKind::ImprovRnn => "Improv RNN",
        }
    }

    /// Get the CLI binary name
    pub fn cli_binary(&self) -> &'static str {
        match self {
            GeneratorKind::MelodyRnn => "melody_rnn_generate",
            GeneratorKind::ImprovRnn => "improv_rnn_generate",
        }
    }

    /// Get install command for this generator
    pub fn install_command(&self) -> &'static str {
        "pip install magenta"
    }

    /// Whether the generator can follow a backing chord progression
    pub fn supports_chords(&self) -> bool {
        matches!(self, GeneratorKind::ImprovRnn)
    }
}

/// Everything needed to produce one variation's outputs
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Label used to name the artifacts
    pub label: String,
    pub kind: GeneratorKind,
    /// Model configuration name, e.g. `attention_improv`
    pub model: String,
    pub bundle_file: PathBuf,
    pub output_dir: PathBuf,
    pub num_outputs: u32,
    pub primer: PrimerMelody,
    /// When set, the primer is quantized and passed as a MIDI file
    pub primer_timing: Option<PrimerTiming>,
    pub chords: Option<ChordProgression>,
    pub render_chords: bool,
    pub num_steps: Option<u32>,
    pub temperature: Option<f32>,
    pub qpm: Option<f32>,
}

impl GenerationRequest {
    /// Scratch directory the external tool writes into
    pub fn staging_dir(&self) -> PathBuf {
        self.output_dir.join(".staging").join(&self.label)
    }

    /// Where the quantized primer goes, if this request uses one
    pub fn primer_midi_path(&self) -> Option<PathBuf> {
        self.primer_timing
            .map(|_| self.output_dir.join(".primers").join(format!("{}.mid", self.label)))
    }

    /// Final path of output number `index` (1-based)
    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(artifact_file_name(&self.label, index))
    }
}

/// Deterministic artifact name for output `index` of `label`
pub fn artifact_file_name(label: &str, index: usize) -> String {
    format!("{}_{}.mid", label, index)
}

/// Failure of a single generation request
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("could not launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{}", failure_text(.status, .stderr))]
    Failed { status: String, stderr: String },

    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("could not collect outputs from {}: {source}", .dir.display())]
    Artifacts {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not prepare primer: {0}")]
    Primer(String),
}

fn failure_text(status: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", status)
    } else {
        stderr.to_string()
    }
}

/// Something that can turn a request into MIDI files
pub trait Generator {
    /// Produce the request's outputs, returning the artifact paths
    fn generate(&self, request: &GenerationRequest) -> Result<Vec<PathBuf>, GenerationError>;
}

/// Per-tool flag construction
///
/// Each backend (melody, improv) implements this for its CLI.
pub trait GeneratorBackend: Send + Sync {
    /// Get the generator kind
    fn kind(&self) -> GeneratorKind;

    /// Build CLI arguments for the generator
    fn build_args(
        &self,
        request: &GenerationRequest,
        output_dir: &Path,
        primer_midi: Option<&Path>,
    ) -> Vec<String>;
}

/// A fully-resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Build the invocation for `request` using its kind's backend
    pub fn for_request(request: &GenerationRequest) -> Self {
        let backend = get_backend(request.kind);
        let primer_midi = request.primer_midi_path();
        Self {
            program: request.kind.cli_binary().to_string(),
            args: backend.build_args(request, &request.staging_dir(), primer_midi.as_deref()),
        }
    }

    /// Shell-style rendering for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=./:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Runs the external generator as a child process
pub struct CliGenerator {
    /// Kill the child after this long; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Replace the generator binary (custom installs, tests)
    pub program_override: Option<String>,
}

impl CliGenerator {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            program_override: None,
        }
    }

    fn run(&self, invocation: &Invocation) -> Result<(), GenerationError> {
        let program = self
            .program_override
            .clone()
            .unwrap_or_else(|| invocation.program.clone());

        log::debug!("Running: {}", invocation.command_line());

        let child = Command::new(&program)
            .args(&invocation.args)
            .env("PATH", super::get_extended_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GenerationError::Spawn {
                program: program.clone(),
                source,
            })?;

        let output = wait_with_timeout(child, self.timeout)
            .map_err(|source| GenerationError::Spawn {
                program: program.clone(),
                source,
            })?
            .ok_or_else(|| GenerationError::TimedOut {
                program: program.clone(),
                timeout: self.timeout.unwrap_or_default(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(GenerationError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

impl Default for CliGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Generator for CliGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<Vec<PathBuf>, GenerationError> {
        let staging = request.staging_dir();
        reset_dir(&staging).map_err(|source| GenerationError::Artifacts {
            dir: staging.clone(),
            source,
        })?;

        // Partial outputs of a failed run are discarded with the staging dir
        let result = self.generate_staged(request);
        if let Err(e) = std::fs::remove_dir_all(&staging) {
            log::debug!("Could not remove staging dir {}: {}", staging.display(), e);
        }
        result
    }
}

impl CliGenerator {
    fn generate_staged(&self, request: &GenerationRequest) -> Result<Vec<PathBuf>, GenerationError> {
        if let (Some(timing), Some(path)) = (request.primer_timing, request.primer_midi_path()) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| GenerationError::Primer(e.to_string()))?;
            }
            write_primer_midi(&request.primer, &timing, &path).map_err(GenerationError::Primer)?;
        }

        let invocation = Invocation::for_request(request);
        self.run(&invocation)?;

        let artifacts = collect_artifacts(request).map_err(|source| GenerationError::Artifacts {
            dir: request.staging_dir(),
            source,
        })?;

        if artifacts.is_empty() {
            log::warn!("{} exited cleanly but wrote no MIDI files", invocation.program);
        }
        Ok(artifacts)
    }
}

/// Writes the command it would run to a sink instead of running it
pub struct DryRunGenerator<W: Write = Stdout> {
    sink: Mutex<W>,
    commands: Mutex<Vec<String>>,
}

impl DryRunGenerator<Stdout> {
    pub fn new() -> Self {
        Self::with_sink(io::stdout())
    }
}

impl Default for DryRunGenerator<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> DryRunGenerator<W> {
    pub fn with_sink(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Command lines "run" so far
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Give back the sink, e.g. to inspect what was written
    pub fn into_sink(self) -> W {
        match self.sink.into_inner() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> Generator for DryRunGenerator<W> {
    fn generate(&self, request: &GenerationRequest) -> Result<Vec<PathBuf>, GenerationError> {
        let line = Invocation::for_request(request).command_line();
        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(sink, "  $ {}", line);
        }
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(line);
        }
        Ok((1..=request.num_outputs as usize)
            .map(|i| request.artifact_path(i))
            .collect())
    }
}

/// Recreate `dir` empty so only this run's files are picked up
fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)
}

/// Move staged `.mid` files to their deterministic names.
///
/// Files are taken in file-name order; an existing artifact with the same
/// name is replaced.
fn collect_artifacts(request: &GenerationRequest) -> io::Result<Vec<PathBuf>> {
    let mut staged = Vec::new();
    for entry in WalkDir::new(request.staging_dir()).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let is_midi = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_midi {
            staged.push(path.to_path_buf());
        }
    }
    staged.sort();

    let mut artifacts = Vec::with_capacity(staged.len());
    for (i, path) in staged.into_iter().enumerate() {
        let dest = request.artifact_path(i + 1);
        std::fs::rename(&path, &dest)?;
        artifacts.push(dest);
    }
    Ok(artifacts)
}
