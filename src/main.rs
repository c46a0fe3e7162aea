use std::path::Path;

use anyhow::{anyhow, bail};
use clap::Parser;
use ingestor::cli::commands::{init, merge, watch};
use ingestor::cli::{Cli, Commands};
use ingestor::config::Settings;
use ingestor::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { force } => init::run_init(&std::env::current_dir()?, force),

        Commands::Config => init::run_config(&load_settings(cli.config.as_deref())?),

        Commands::Watch {
            dir,
            extension,
            debounce_ms,
            master,
        } => {
            let mut settings = load_settings(cli.config.as_deref())?;
            if let Some(dir) = dir {
                settings.watch.dir = dir;
            }
            if let Some(extension) = extension {
                settings.watch.extension = extension;
            }
            if let Some(ms) = debounce_ms {
                settings.watch.debounce_ms = ms;
            }
            master.apply(&mut settings);

            logging::init_with_config(&settings.logging);
            watch::run_watch(&settings).await
        }

        Commands::Merge { file, master } => {
            let mut settings = load_settings(cli.config.as_deref())?;
            master.apply(&mut settings);

            logging::init_with_config(&settings.logging);
            merge::run_merge(&settings, &file).map(|_| ())
        }
    }
}

/// Load settings from `--config` or the workspace settings file.
fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    let loaded = match config {
        Some(path) => {
            if !path.is_file() {
                bail!("configuration file not found: {}", path.display());
            }
            Settings::load_from(path)
        }
        None => Settings::load(),
    };
    loaded.map_err(|e| anyhow!("Configuration error: {e}"))
}
