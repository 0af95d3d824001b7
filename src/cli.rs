use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "primerlab")]
#[command(about = "Batch primer-conditioned melody generation", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Manage pre-trained bundles (list, download)
    Models {
        #[command(subcommand)]
        action: ModelCommands,
    },

    /// Run a batch of variations through the generator
    Batch {
        /// Built-in preset to run
        #[arg(short, long, conflicts_with = "config", required_unless_present = "config")]
        preset: Option<String>,

        /// JSON batch file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the batch's output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override the directory bundles are read from
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Kill a generator that runs longer than this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print melody statistics for every generated file
        #[arg(long)]
        analyze: bool,
    },

    /// Inspect built-in presets
    Presets {
        #[command(subcommand)]
        action: PresetCommands,
    },

    /// Compare generated MIDI files against their primer
    Analyze {
        /// Primer literal, e.g. "[62, 74, 69, 60]"
        #[arg(short, long)]
        primer: String,

        /// MIDI files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Check that generator tools and bundles are installed
    Doctor {
        /// Directory bundles are read from
        #[arg(long, default_value = ".")]
        models_dir: PathBuf,
    },

    /// Inspect or clear the run log
    Log {
        #[command(subcommand)]
        action: LogCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ModelCommands {
    /// List known bundles and which are downloaded
    List {
        /// Directory bundles live in
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Download bundles (all known bundles if none are named)
    Download {
        /// Bundle names, e.g. basic_rnn attention_improv
        names: Vec<String>,

        /// Directory bundles are written to
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum PresetCommands {
    /// List built-in presets
    List,

    /// Print a preset as an editable JSON batch file
    Show { name: String },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum LogCommands {
    /// Print the log file location
    Path,
    /// Print the log contents
    Show,
    /// Empty the log
    Clear,
}
