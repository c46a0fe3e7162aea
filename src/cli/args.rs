//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::Settings;
use crate::merge::{MissingMasterPolicy, SchemaPolicy};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch a directory and merge new CSV files into a master dataset
#[derive(Parser)]
#[command(
    name = "ingestor",
    version = env!("CARGO_PKG_VERSION"),
    about = "Merge new CSV files into a master dataset",
    long_about = "Watch a directory for new CSV files, append each one to a master dataset, and run an analysis step after every merge.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Master dataset overrides shared by `watch` and `merge`.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct MasterArgs {
    /// Master dataset path (overrides config)
    #[arg(short, long)]
    pub master: Option<PathBuf>,

    /// Schema mismatch policy (overrides config)
    #[arg(long, value_enum)]
    pub schema: Option<SchemaPolicy>,

    /// What to do when the master does not exist (overrides config)
    #[arg(long, value_enum)]
    pub missing: Option<MissingMasterPolicy>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .ingestor directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Watch a directory and merge new files until interrupted
    #[command(
        about = "Watch a directory and merge each new file",
        after_help = "Examples:\n  ingestor watch\n  ingestor watch --dir drops --master data/master.csv\n  ingestor watch --extension tsv --debounce-ms 1000"
    )]
    Watch {
        /// Directory to watch (overrides config)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Extension of incoming files, without the dot (overrides config)
        #[arg(short, long)]
        extension: Option<String>,

        /// Quiet period before a new file is merged (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,

        #[command(flatten)]
        master: MasterArgs,
    },

    /// Merge one file now
    #[command(about = "Merge a single file into the master dataset")]
    Merge {
        /// File to merge
        file: PathBuf,

        #[command(flatten)]
        master: MasterArgs,
    },
}

impl MasterArgs {
    /// Apply overrides onto loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.master {
            settings.master.path = path.clone();
        }
        if let Some(schema) = self.schema {
            settings.master.schema = schema;
        }
        if let Some(missing) = self.missing {
            settings.master.missing = missing;
        }
    }
}
