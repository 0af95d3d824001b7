//! Pre-trained bundle catalog and downloads
//!
//! Bundles are fetched once into the models directory. A file already on
//! disk is trusted as-is: there is no checksum, and it is never re-fetched.

use std::path::{Path, PathBuf};

use super::generator::GeneratorKind;
use super::logging::log_message;

/// A downloadable pre-trained model bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelBundle {
    /// Config name passed via `--config`
    pub name: &'static str,
    pub kind: GeneratorKind,
    pub url: &'static str,
    pub description: &'static str,
}

impl ModelBundle {
    /// Fixed on-disk filename
    pub fn file_name(&self) -> String {
        format!("{}.mag", self.name)
    }

    pub fn local_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.file_name())
    }
}

pub const CATALOG: &[ModelBundle] = &[
    ModelBundle {
        name: "basic_rnn",
        kind: GeneratorKind::MelodyRnn,
        url: "https://storage.googleapis.com/download.magenta.tensorflow.org/models/melody_rnn/basic_rnn.mag",
        description: "One-hot melody model",
    },
    ModelBundle {
        name: "attention_rnn",
        kind: GeneratorKind::MelodyRnn,
        url: "https://storage.googleapis.com/download.magenta.tensorflow.org/models/melody_rnn/attention_rnn.mag",
        description: "Melody model with attention over recent steps",
    },
    ModelBundle {
        name: "lookback_rnn",
        kind: GeneratorKind::MelodyRnn,
        url: "https://storage.googleapis.com/download.magenta.tensorflow.org/models/melody_rnn/lookback_rnn.mag",
        description: "Melody model with repetition lookback features",
    },
    ModelBundle {
        name: "basic_improv",
        kind: GeneratorKind::ImprovRnn,
        url: "https://download.magenta.tensorflow.org/models/basic_improv.mag",
        description: "Chord-conditioned melody model",
    },
    ModelBundle {
        name: "attention_improv",
        kind: GeneratorKind::ImprovRnn,
        url: "https://download.magenta.tensorflow.org/models/attention_improv.mag",
        description: "Chord-conditioned melody model with attention",
    },
    ModelBundle {
        name: "chord_pitches_improv",
        kind: GeneratorKind::ImprovRnn,
        url: "https://download.magenta.tensorflow.org/models/chord_pitches_improv.mag",
        description: "Chord-conditioned model fed the chord's pitches",
    },
];

/// Look up a bundle by name
pub fn find_bundle(name: &str) -> Option<&'static ModelBundle> {
    CATALOG.iter().find(|b| b.name == name)
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("could not write file: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to one requested bundle
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Already on disk; nothing fetched
    Skipped { path: PathBuf, bytes: u64 },
    Downloaded { path: PathBuf, bytes: u64 },
    Failed { error: DownloadError },
}

/// Download each bundle that is not already present.
///
/// Runs one bundle at a time. A failure is recorded and the next bundle is
/// still attempted.
pub async fn download_models(
    client: &reqwest::Client,
    bundles: &[ModelBundle],
    models_dir: &Path,
) -> Vec<(ModelBundle, DownloadOutcome)> {
    let mut outcomes = Vec::with_capacity(bundles.len());

    for bundle in bundles {
        let path = bundle.local_path(models_dir);

        let outcome = if path.exists() {
            let bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            println!("✓ {} already exists, skipping...", bundle.file_name());
            DownloadOutcome::Skipped { path, bytes }
        } else {
            println!("Downloading {}...", bundle.file_name());
            match download_file(client, bundle.url, &path).await {
                Ok(bytes) => {
                    println!("✓ Downloaded {} ({})", bundle.file_name(), format_megabytes(bytes));
                    log_message("INFO", "models", &format!("Downloaded {} ({} bytes)", bundle.name, bytes));
                    DownloadOutcome::Downloaded { path, bytes }
                }
                Err(error) => {
                    println!("✗ Failed to download {}: {}", bundle.file_name(), error);
                    log_message("WARN", "models", &format!("Download of {} failed: {}", bundle.name, error));
                    DownloadOutcome::Failed { error }
                }
            }
        };

        outcomes.push((*bundle, outcome));
    }

    outcomes
}

/// Fetch `url` into `path` through a `.part` file, returning the byte count
async fn download_file(client: &reqwest::Client, url: &str, path: &Path) -> Result<u64, DownloadError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(DownloadError::Status(response.status()));
    }

    let bytes = response.bytes().await?;

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, &bytes).await?;
    tokio::fs::rename(&partial, path).await?;

    Ok(bytes.len() as u64)
}

/// Bundles present in `models_dir` with their sizes in bytes
pub fn list_available(models_dir: &Path) -> Vec<(&'static ModelBundle, u64)> {
    CATALOG
        .iter()
        .filter_map(|bundle| {
            let meta = std::fs::metadata(bundle.local_path(models_dir)).ok()?;
            meta.is_file().then_some((bundle, meta.len()))
        })
        .collect()
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}
