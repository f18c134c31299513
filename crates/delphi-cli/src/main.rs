//! CLI entrypoint for Delphi panel experiments.

mod config;
mod output;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use delphi_runtime::{
    run_recursive_delphi, run_standard_delphi, LlmExpert, LlmFacilitator, ProtocolMode,
    ProviderRegistry,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{load_items, validate_items, ExperimentConfig};

/// Simulated Delphi panel experiments
#[derive(Parser, Debug)]
#[command(name = "delphi")]
#[command(author, version, about = "Run simulated Delphi consensus panels")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dataset operations
    Dataset {
        #[command(subcommand)]
        action: DatasetCommand,
    },
    /// Experiment operations
    Experiment {
        #[command(subcommand)]
        action: ExperimentCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DatasetCommand {
    /// Check the experiment config and its items file
    Validate {
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ExperimentCommand {
    /// Run the panel over every item and write the run directory
    Run {
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Dataset {
            action: DatasetCommand::Validate { config },
        } => {
            let count = validate_dataset(&config)?;
            println!("dataset config ok: {} ({} items)", config.display(), count);
        }
        Command::Experiment {
            action: ExperimentCommand::Run { config },
        } => {
            let run_dir = run_experiment(&config).await?;
            println!("experiment run complete: {}", run_dir.display());
        }
    }

    Ok(())
}

/// Load the config and its items; returns the item count.
fn validate_dataset(path: &Path) -> Result<usize> {
    let config = ExperimentConfig::load(path)?;
    config.panel.panel()?;
    ProviderRegistry::with_defaults()
        .validate(&config.backend.provider, &config.backend.provider_settings())?;
    let items = load_items(&config.dataset.items_path)?;
    validate_items(&items)?;
    Ok(items.len())
}

async fn run_experiment(path: &Path) -> Result<PathBuf> {
    let config = ExperimentConfig::load(path)?;
    let items = load_items(&config.dataset.items_path)?;
    validate_items(&items)?;

    let backend = &config.backend;
    let registry = ProviderRegistry::with_defaults();
    let provider = registry.create(&backend.provider, &backend.provider_settings())?;
    if !provider.health_check().await {
        bail!(
            "Backend '{}' is not reachable at {}",
            provider.name(),
            backend.host
        );
    }
    provider.ensure_model_available(&backend.model).await?;

    info!(
        items = items.len(),
        mode = ?config.mode,
        model = %backend.model,
        "Starting experiment"
    );

    let started_at = Utc::now();
    let completion = backend.completion_config();
    let expert = Arc::new(LlmExpert::new(Arc::clone(&provider), completion.clone()));
    let run = match config.mode {
        ProtocolMode::Standard => run_standard_delphi(&items, &config.panel, expert).await?,
        ProtocolMode::Recursive => {
            let facilitator = Arc::new(LlmFacilitator::new(provider, completion));
            run_recursive_delphi(&items, &config.panel, expert, facilitator).await?
        }
    };

    output::persist_run(&config.output.run_dir, &run, started_at)
}
