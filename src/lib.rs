pub mod cli;
pub mod commands;
pub mod music;

use anyhow::{anyhow, bail, Result};
use std::path::Path;
use std::time::Duration;

use cli::{Cli, Commands, LogCommands, ModelCommands, PresetCommands};
use commands::batch::{run_batch, summarize};
use commands::config::BatchConfig;
use commands::generator::{CliGenerator, DryRunGenerator, Generator};
use commands::models::{download_models, find_bundle, format_megabytes, list_available, ModelBundle, CATALOG};
use commands::presets::{find_preset, PRESETS};
use music::PrimerMelody;

pub async fn run(cli: Cli) -> Result<()> {
    // Initialize env_logger and the run log file
    commands::logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Models { action } => match action {
            ModelCommands::List { dir } => list_models(&dir),
            ModelCommands::Download { names, dir } => download(&names, &dir).await,
        },

        Commands::Batch {
            preset,
            config,
            output_dir,
            models_dir,
            dry_run,
            timeout_secs,
            analyze,
        } => {
            let mut batch = match (preset, config) {
                (Some(name), _) => {
                    let preset = find_preset(&name)
                        .ok_or_else(|| anyhow!("Unknown preset '{}'", name))?;
                    (preset.build)().map_err(|e| anyhow!(e))?
                }
                (None, Some(path)) => BatchConfig::load(&path).map_err(|e| anyhow!(e))?,
                (None, None) => bail!("Pass --preset or --config"),
            };
            if let Some(dir) = output_dir {
                batch.output_dir = dir;
            }
            if let Some(dir) = models_dir {
                batch.models_dir = dir;
            }

            let generator: Box<dyn Generator> = if dry_run {
                Box::new(DryRunGenerator::new())
            } else {
                Box::new(CliGenerator::new(timeout_secs.map(Duration::from_secs)))
            };
            run_batch_config(&batch, generator.as_ref(), analyze && !dry_run)
        }

        Commands::Presets { action } => match action {
            PresetCommands::List => {
                for preset in PRESETS {
                    println!("  {:<12} {}", preset.name, preset.description);
                }
                Ok(())
            }
            PresetCommands::Show { name } => {
                let preset = find_preset(&name)
                    .ok_or_else(|| anyhow!("Unknown preset '{}'", name))?;
                let config = (preset.build)().map_err(|e| anyhow!(e))?;
                println!("{}", config.to_json().map_err(|e| anyhow!(e))?);
                Ok(())
            }
        },

        Commands::Analyze { primer, files } => {
            let primer = PrimerMelody::parse(&primer).map_err(|e| anyhow!(e))?;
            let analyzed = commands::analyze::print_analysis(&primer, &files);
            if analyzed == 0 {
                bail!("None of the {} file(s) could be analyzed", files.len());
            }
            Ok(())
        }

        Commands::Doctor { models_dir } => {
            let status = commands::prerequisites::check_prerequisites(&models_dir);
            if !commands::prerequisites::print_prerequisites(&status) {
                println!();
                println!("No generator found on PATH; batches will fail until one is installed.");
            }
            Ok(())
        }

        Commands::Log { action } => match action {
            LogCommands::Path => {
                println!("{}", commands::logging::get_log_path().display());
                Ok(())
            }
            LogCommands::Show => {
                print!("{}", commands::logging::read_log_file().map_err(|e| anyhow!(e))?);
                Ok(())
            }
            LogCommands::Clear => {
                let size = commands::logging::get_log_file_size().map_err(|e| anyhow!(e))?;
                commands::logging::clear_log_file().map_err(|e| anyhow!(e))?;
                println!("Cleared {} bytes of log.", size);
                Ok(())
            }
        },
    }
}

/// Resolve and run a batch, printing progress and a summary
fn run_batch_config(batch: &BatchConfig, generator: &dyn Generator, analyze: bool) -> Result<()> {
    let plan = batch.resolve().map_err(|e| anyhow!(e))?;

    std::fs::create_dir_all(&plan.output_dir)
        .map_err(|e| anyhow!("Failed to create output directory {}: {}", plan.output_dir.display(), e))?;

    for variation in &plan.variations {
        if !variation.bundle_file.exists() {
            log::warn!(
                "{}: bundle {} not found (try `primerlab models download {}`)",
                variation.name,
                variation.bundle_file.display(),
                variation.model
            );
        }
    }

    println!("Running {} variation(s) into {}", plan.variations.len(), plan.output_dir.display());
    let mut stdout = std::io::stdout();
    let report = run_batch(&plan.variations, &plan.output_dir, generator, &mut stdout);

    println!();
    println!("{}", summarize(&report));

    if analyze {
        commands::analyze::print_report_analysis(&report, &plan.variations);
    }
    Ok(())
}

fn list_models(dir: &Path) -> Result<()> {
    let available = list_available(dir);

    println!();
    println!("{:<3}{:<24}{:<14}{}", "", "NAME", "GENERATOR", "DESCRIPTION");
    for bundle in CATALOG {
        let size = available
            .iter()
            .find(|(b, _)| b.name == bundle.name)
            .map(|(_, bytes)| *bytes);
        let mark = if size.is_some() { "✓" } else { " " };
        println!(
            "{:<3}{:<24}{:<14}{}{}",
            mark,
            bundle.name,
            bundle.kind.display_name(),
            bundle.description,
            size.map(|s| format!(" ({})", format_megabytes(s))).unwrap_or_default()
        );
    }
    println!();
    Ok(())
}

async fn download(names: &[String], dir: &Path) -> Result<()> {
    let bundles: Vec<ModelBundle> = if names.is_empty() {
        CATALOG.to_vec()
    } else {
        names
            .iter()
            .map(|name| find_bundle(name).copied().ok_or_else(|| anyhow!("Unknown bundle '{}'", name)))
            .collect::<Result<_>>()?
    };

    println!("Downloading pre-trained bundles...");
    println!("{}", "=".repeat(50));

    let client = reqwest::Client::new();
    let outcomes = download_models(&client, &bundles, dir).await;

    println!();
    println!("{}", "=".repeat(50));
    println!("Download complete!");

    println!("Available bundles:");
    for (bundle, bytes) in list_available(dir) {
        println!("- {} ({})", bundle.file_name(), format_megabytes(bytes));
    }

    let failed = outcomes
        .iter()
        .filter(|(_, o)| matches!(o, commands::models::DownloadOutcome::Failed { .. }))
        .count();
    if failed > 0 {
        log::warn!("{} bundle(s) failed to download", failed);
    }
    Ok(())
}
