use anyhow::{anyhow, Result};
use colored::*;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::display::{display_facets, display_results, display_stats, to_json};
use crate::cli::{DataSource, FilterArgs};
use crate::config::CatalogueConfig;
use crate::models::facets as collect_facets;
use crate::services::embeddings::EmbeddingProvider;
use crate::services::search::{HybridRanker, SearchResults};

fn print_json(value: &serde_json::Value) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Rank the (filtered) dataset against the query terms
pub async fn search(
  config: &CatalogueConfig,
  source: &DataSource,
  filters: &FilterArgs,
  terms: &[String],
  json: bool,
) -> Result<()> {
  let dataset = source.load(config)?;
  let filter = filters.to_filter();
  let candidates = filter.apply(&dataset.records);
  if !filter.is_empty() {
    bentley::verbose!("{} of {} records pass filters", candidates.len(), dataset.records.len());
  }

  let query = terms.join(" ");
  let ranker = HybridRanker::new(EmbeddingProvider::global(config), config.policy());
  let results = ranker.search(&query, &candidates).await;

  if json {
    let items = match &results {
      SearchResults::Ranked(scored) => to_json(scored)?,
      other => to_json(&other.records())?,
    };
    return print_json(&json!({
      "query": query,
      "fallback": results.is_fallback(),
      "count": results.len(),
      "results": items,
    }));
  }

  display_results(&results, terms);
  Ok(())
}

/// Build the encoder now so the first search does not pay for it
pub async fn warm(config: &CatalogueConfig) -> Result<()> {
  let provider = EmbeddingProvider::global(config);
  let elapsed = provider.warm_up().await?;

  println!("{} Encoder ready in {}", "✓".green(), bentley::format_elapsed(elapsed).cyan());
  Ok(())
}

pub async fn facets(config: &CatalogueConfig, source: &DataSource, json: bool) -> Result<()> {
  let dataset = source.load(config)?;
  let facets = collect_facets(&dataset.records);

  if json {
    return print_json(&to_json(&facets)?);
  }

  display_facets(&facets);
  Ok(())
}

pub async fn stats(config: &CatalogueConfig, source: &DataSource, json: bool) -> Result<()> {
  let dataset = source.load(config)?;
  let stats = dataset.stats();

  if json {
    return print_json(&to_json(&stats)?);
  }

  println!("{} {}", "Dataset:".bold(), dataset.source.display());
  display_stats(&stats);
  Ok(())
}

/// Compute embeddings for records and write the dataset back
pub async fn index(
  config: &CatalogueConfig,
  source: &DataSource,
  force: bool,
  output: Option<PathBuf>,
) -> Result<()> {
  let mut dataset = source.load(config)?;
  let provider = EmbeddingProvider::from_config(config);
  let encoder = provider.get_encoder().await?;

  let total = dataset.records.len();
  println!("{} Indexing {total} records with {}...", "🔄".cyan(), encoder.name());

  let mut computed = 0usize;
  let mut skipped = 0usize;
  for record in dataset.records.iter_mut() {
    if record.has_embedding() && !force {
      skipped += 1;
      continue;
    }

    let embedding = provider
      .encode(&record.search_text())
      .await
      .map_err(|e| anyhow!("Failed to embed record {}: {e}", record.id))?;
    record.embedding = Some(embedding);
    computed += 1;
    bentley::verbose!("Embedded {}", record.id);
  }

  let target = output.unwrap_or_else(|| dataset.source.clone());
  dataset.save(&target)?;

  println!(
    "{} Embedded {} records ({} already present) -> {}",
    "✓".green(),
    computed.to_string().cyan(),
    skipped,
    target.display()
  );
  Ok(())
}
