//! Command-line front end: argument groups shared by subcommands, command
//! handlers and terminal formatting

pub mod commands;
pub mod display;

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::{CatalogueConfig, EncoderKind, SelectionMode};
use crate::models::{Dataset, Locale, RecordFilter, StatusFilter};

/// Where to read records from
#[derive(Args, Debug, Clone, Default)]
pub struct DataSource {
  /// Dataset file to load; overrides --locale and --data-dir
  #[arg(long, value_name = "PATH")]
  pub data: Option<PathBuf>,
  /// Dataset locale, read as data_<locale>.json from the data directory
  #[arg(short, long, value_enum, default_value_t = Locale::En)]
  pub locale: Locale,
  /// Directory holding the locale datasets
  #[arg(long, value_name = "DIR")]
  pub data_dir: Option<PathBuf>,
}

impl DataSource {
  pub fn path(&self, config: &CatalogueConfig) -> PathBuf {
    match &self.data {
      Some(path) => path.clone(),
      None => self.data_dir.as_ref().unwrap_or(&config.data_dir).join(self.locale.file_name()),
    }
  }

  pub fn load(&self, config: &CatalogueConfig) -> Result<Dataset> {
    let path = self.path(config);
    bentley::verbose!("Loading records from {}", path.display());
    Ok(Dataset::load(&path)?)
  }
}

/// Exact-match category filters
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
  #[arg(long)]
  pub department: Option<String>,
  #[arg(long, conflicts_with = "blank_status")]
  pub status: Option<String>,
  /// Only records with no status
  #[arg(long)]
  pub blank_status: bool,
  #[arg(long)]
  pub users: Option<String>,
  #[arg(long)]
  pub developed_by: Option<String>,
  #[arg(long)]
  pub pii: Option<String>,
  #[arg(long)]
  pub notification_ai: Option<String>,
}

impl FilterArgs {
  pub fn to_filter(&self) -> RecordFilter {
    let status = if self.blank_status {
      Some(StatusFilter::Blank)
    } else {
      self.status.clone().map(StatusFilter::Exact)
    };

    RecordFilter {
      department: self.department.clone(),
      status,
      users: self.users.clone(),
      developed_by: self.developed_by.clone(),
      pii: self.pii.clone(),
      notification_ai: self.notification_ai.clone(),
    }
  }
}

/// Flags that override configuration for one invocation
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
  /// Result selection policy
  #[arg(long, value_enum)]
  pub mode: Option<SelectionMode>,
  /// Result count in top-k mode
  #[arg(long, value_name = "K")]
  pub limit: Option<usize>,
  /// Encoder used for queries
  #[arg(long, value_enum)]
  pub encoder: Option<EncoderKind>,
}

impl ConfigOverrides {
  pub fn apply(&self, config: &mut CatalogueConfig) {
    if let Some(mode) = self.mode {
      config.selection = mode;
    }
    if let Some(limit) = self.limit {
      config.top_k = limit;
    }
    if let Some(encoder) = self.encoder {
      config.encoder = encoder;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::search::SelectionPolicy;

  #[test]
  fn test_data_source_path_resolution() {
    let config = CatalogueConfig::default();

    let source = DataSource { locale: Locale::Fr, ..DataSource::default() };
    assert_eq!(source.path(&config), PathBuf::from("public/data_fr.json"));

    let source = DataSource { data_dir: Some("/srv".into()), ..DataSource::default() };
    assert_eq!(source.path(&config), PathBuf::from("/srv/data_en.json"));

    let source = DataSource { data: Some("custom.json".into()), ..source };
    assert_eq!(source.path(&config), PathBuf::from("custom.json"));
  }

  #[test]
  fn test_blank_status_flag() {
    let args = FilterArgs { blank_status: true, ..FilterArgs::default() };
    assert_eq!(args.to_filter().status, Some(StatusFilter::Blank));

    let args = FilterArgs { status: Some("Retired".into()), ..FilterArgs::default() };
    assert_eq!(args.to_filter().status, Some(StatusFilter::Exact("Retired".into())));
    assert!(FilterArgs::default().to_filter().is_empty());
  }

  #[test]
  fn test_overrides_win_over_config() {
    let mut config = CatalogueConfig::default();
    ConfigOverrides { mode: Some(SelectionMode::TopK), limit: Some(4), encoder: None }
      .apply(&mut config);

    assert_eq!(config.policy(), SelectionPolicy::TopK(4));
  }
}
