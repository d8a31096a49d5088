use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use catalogue::cli::{commands, ConfigOverrides, DataSource, FilterArgs};
use catalogue::config::CatalogueConfig;

#[derive(Parser)]
#[command(name = "catalogue")]
#[command(
  about = "Catalogue - search the government AI register\nHybrid semantic and keyword ranking"
)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Cli {
  /// Show verbose progress output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Rank AI systems against a free-text query
  Search {
    #[command(flatten)]
    source: DataSource,
    #[command(flatten)]
    filters: FilterArgs,
    #[command(flatten)]
    overrides: ConfigOverrides,
    /// Print results as JSON
    #[arg(long)]
    json: bool,
    /// Search terms (space-separated); empty lists every record
    terms: Vec<String>,
  },
  /// Build the query encoder ahead of time and report how long it took
  Warm {
    #[command(flatten)]
    overrides: ConfigOverrides,
  },
  /// List distinct values for each filter field
  Facets {
    #[command(flatten)]
    source: DataSource,
    #[arg(long)]
    json: bool,
  },
  /// Show record and embedding counts
  Stats {
    #[command(flatten)]
    source: DataSource,
    #[arg(long)]
    json: bool,
  },
  /// Compute record embeddings and write them into the dataset
  Index {
    #[command(flatten)]
    source: DataSource,
    #[command(flatten)]
    overrides: ConfigOverrides,
    /// Recompute embeddings that already exist
    #[arg(short, long)]
    force: bool,
    /// Write to this file instead of overwriting the dataset
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
  },
}

async fn handle(command: Command, mut config: CatalogueConfig) -> Result<()> {
  match command {
    Command::Search { source, filters, overrides, json, terms } => {
      overrides.apply(&mut config);
      commands::search(&config, &source, &filters, &terms, json).await
    }
    Command::Warm { overrides } => {
      overrides.apply(&mut config);
      commands::warm(&config).await
    }
    Command::Facets { source, json } => commands::facets(&config, &source, json).await,
    Command::Stats { source, json } => commands::stats(&config, &source, json).await,
    Command::Index { source, overrides, force, output } => {
      overrides.apply(&mut config);
      commands::index(&config, &source, force, output).await
    }
  }
}

fn init_logging(verbose: bool) {
  bentley::init_from_env("CATALOGUE_VERBOSE");
  if verbose {
    bentley::set_verbose(true);
  }

  let filter =
    EnvFilter::try_from_env("CATALOGUE_LOG").unwrap_or_else(|_| EnvFilter::new("catalogue=warn"));
  let layer = fmt::layer().with_writer(std::io::stderr);
  tracing_subscriber::registry().with(layer).with(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = CatalogueConfig::load()?;
  bentley::verbose!("Config: {config:?}");

  handle(cli.command, config).await
}
