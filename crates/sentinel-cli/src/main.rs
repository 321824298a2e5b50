mod analyze;
mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentinel_analysis::{Analyzer, AnalyzerSettings, Collaborators, MemoryStore};
use sentinel_core::AppConfig;
use tracing_subscriber::EnvFilter;

/// Caller id the CLI analyzes as; registered in the process-local store.
pub(crate) const CLI_CALLER: &str = "cli";

#[derive(Debug, Parser)]
#[command(name = "sentinel-cli")]
#[command(about = "SEO Sentinel spam-score audits from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a single URL or domain
    Analyze {
        url: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze every domain listed in a .txt or .csv file
    Bulk {
        file: PathBuf,
        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the signal detectors over a local HTML file, without network access
    Signals {
        file: PathBuf,
        /// Print the signals as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = sentinel_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze { url, json } => {
            let analyzer = build_analyzer(&config).await?;
            analyze::run_analyze(&analyzer, &url, json).await
        }
        Commands::Bulk { file, json } => {
            let analyzer = build_analyzer(&config).await?;
            analyze::run_bulk(&analyzer, &file, json).await
        }
        Commands::Signals { file, json } => signals::run_signals(&file, json),
    }
}

/// Live HTTP collaborators over a fresh in-memory store.
async fn build_analyzer(config: &AppConfig) -> anyhow::Result<Analyzer> {
    let store = Arc::new(MemoryStore::new());
    store.register_caller(CLI_CALLER).await;

    let collaborators = Collaborators::live(config, store.clone(), store)?;
    Ok(Analyzer::new(collaborators, AnalyzerSettings::from_app_config(config)))
}
