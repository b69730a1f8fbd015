//! bookscene - description extraction CLI
//!
//! Reads book text from a file (or stdin with `-`), runs the description
//! engine and prints the result as JSON.
//!
//! Runtime settings come from, in priority order:
//! 1. `--settings <file.toml>`
//! 2. `settings_database` in the bootstrap config
//! 3. `settings_file` in the bootstrap config
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::info;

use bookscene_common::config::{load_or_default, BootstrapConfig};
use bookscene_common::settings::{MemorySettingsStore, TomlSettingsStore};
use bookscene_common::SettingsStore;
use bookscene_engine::{DescriptionEngine, StrategyKind};

/// Command-line arguments for bookscene
#[derive(Parser, Debug)]
#[command(name = "bookscene")]
#[command(about = "Extract visual descriptions from book text")]
#[command(version)]
struct Args {
    /// Bootstrap config file
    #[arg(short, long, env = "BOOKSCENE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// TOML settings file (overrides the bootstrap config)
    #[arg(short, long, env = "BOOKSCENE_SETTINGS", global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract descriptions from a text file
    Process {
        /// Input file, `-` for stdin
        file: PathBuf,

        /// Strategy: single, parallel, sequential, ensemble, adaptive
        #[arg(short, long)]
        mode: Option<StrategyKind>,

        /// Drop per-processor raw candidates from the output
        #[arg(long)]
        compact: bool,
    },
    /// Show processor health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let bootstrap = load_or_default(args.config.as_deref()).context("Failed to load bootstrap config")?;
    bookscene_common::logging::init_tracing(&bootstrap.logging.level)
        .context("Failed to initialize logging")?;

    info!("Starting bookscene v{}", env!("CARGO_PKG_VERSION"));

    let store = open_settings_store(&bootstrap, args.settings.as_deref()).await?;
    let engine = DescriptionEngine::new(store)
        .await
        .context("Failed to initialize description engine")?;

    match args.command {
        Command::Process { file, mode, compact } => {
            let text = read_input(&file).await?;
            let mut result = engine
                .process(&text, mode)
                .await
                .with_context(|| format!("Failed to process {}", file.display()))?;
            if compact {
                result.processor_results.clear();
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Status => {
            let health = engine.health_check().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}

async fn open_settings_store(
    bootstrap: &BootstrapConfig,
    settings_override: Option<&Path>,
) -> Result<Arc<dyn SettingsStore>> {
    if let Some(path) = settings_override {
        info!("Settings file: {}", path.display());
        return Ok(Arc::new(TomlSettingsStore::new(path)));
    }
    if let Some(path) = &bootstrap.settings_database {
        info!("Settings database: {}", path.display());
        let store = bookscene_common::settings::SqliteSettingsStore::open(path)
            .await
            .with_context(|| format!("Failed to open settings database {}", path.display()))?;
        return Ok(Arc::new(store));
    }
    if let Some(path) = &bootstrap.settings_file {
        info!("Settings file: {}", path.display());
        return Ok(Arc::new(TomlSettingsStore::new(path)));
    }
    info!("No settings source configured, using defaults");
    Ok(Arc::new(MemorySettingsStore::new()))
}

async fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
