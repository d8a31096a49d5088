//! Runtime configuration
//!
//! Resolution order, later wins: built-in defaults, `config.yaml` under the
//! catalogue home, `CATALOGUE_*` environment variables, command-line flags.

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::services::embeddings::histogram::DEFAULT_DIMENSION;
use crate::services::search::{SelectionPolicy, DEFAULT_TOP_K};

pub const HOME_VAR: &str = "CATALOGUE_HOME";
pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

const SELECTION_VAR: &str = "CATALOGUE_SELECTION";
const TOP_K_VAR: &str = "CATALOGUE_TOP_K";
const ENCODER_VAR: &str = "CATALOGUE_ENCODER";
const MODEL_VAR: &str = "CATALOGUE_MODEL";
const DATA_DIR_VAR: &str = "CATALOGUE_DATA_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
  #[default]
  Threshold,
  TopK,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EncoderKind {
  /// Sentence-transformer model via ONNX Runtime
  Onnx,
  /// Character histogram; offline and deterministic
  Histogram,
}

impl Default for EncoderKind {
  fn default() -> Self {
    if cfg!(feature = "ml-features") {
      EncoderKind::Onnx
    } else {
      EncoderKind::Histogram
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogueConfig {
  pub selection: SelectionMode,
  pub top_k: usize,
  pub encoder: EncoderKind,
  pub model: String,
  pub histogram_dimension: usize,
  pub data_dir: PathBuf,
}

impl Default for CatalogueConfig {
  fn default() -> Self {
    Self {
      selection: SelectionMode::default(),
      top_k: DEFAULT_TOP_K,
      encoder: EncoderKind::default(),
      model: DEFAULT_MODEL.to_string(),
      histogram_dimension: DEFAULT_DIMENSION,
      data_dir: PathBuf::from("public"),
    }
  }
}

impl CatalogueConfig {
  /// Defaults, then the config file if present, then the environment
  pub fn load() -> Result<Self, ConfigError> {
    let mut config = match config_path() {
      Some(path) if path.exists() => Self::from_file(&path)?,
      _ => Self::default(),
    };
    config.apply_env(|var| std::env::var(var).ok())?;
    Ok(config)
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path)
      .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

    // An empty file is a valid, all-default config
    if content.trim().is_empty() {
      return Ok(Self::default());
    }

    serde_yaml::from_str(&content)
      .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// Apply `CATALOGUE_*` overrides; `lookup` returns a variable's value if set
  pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(value) = lookup(SELECTION_VAR) {
      self.selection = parse_enum(SELECTION_VAR, &value)?;
    }
    if let Some(value) = lookup(TOP_K_VAR) {
      self.top_k = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var: TOP_K_VAR.to_string(), value })?;
    }
    if let Some(value) = lookup(ENCODER_VAR) {
      self.encoder = parse_enum(ENCODER_VAR, &value)?;
    }
    if let Some(value) = lookup(MODEL_VAR).filter(|v| !v.trim().is_empty()) {
      self.model = value;
    }
    if let Some(value) = lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
      self.data_dir = PathBuf::from(value);
    }
    Ok(())
  }

  pub fn policy(&self) -> SelectionPolicy {
    match self.selection {
      SelectionMode::Threshold => SelectionPolicy::Threshold,
      SelectionMode::TopK => SelectionPolicy::TopK(self.top_k),
    }
  }
}

/// `$CATALOGUE_HOME`, falling back to `~/.catalogue`
pub fn catalogue_home() -> Option<PathBuf> {
  if let Ok(custom) = std::env::var(HOME_VAR) {
    return Some(PathBuf::from(custom));
  }
  home_dir().map(|home| home.join(".catalogue"))
}

pub fn config_path() -> Option<PathBuf> {
  catalogue_home().map(|home| home.join(CONFIG_FILE))
}

fn parse_enum<T: clap::ValueEnum>(var: &str, value: &str) -> Result<T, ConfigError> {
  T::from_str(value.trim(), true)
    .map_err(|_| ConfigError::InvalidValue { var: var.to_string(), value: value.to_string() })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::collections::HashMap;
  use tempfile::TempDir;

  fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> =
      vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| vars.get(name).cloned()
  }

  #[test]
  fn test_defaults() {
    let config = CatalogueConfig::default();
    assert_eq!(config.selection, SelectionMode::Threshold);
    assert_eq!(config.top_k, 20);
    assert_eq!(config.model, DEFAULT_MODEL);
    assert_eq!(config.data_dir, PathBuf::from("public"));
    assert_eq!(config.policy(), SelectionPolicy::Threshold);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "selection: top-k\ntop_k: 5\nencoder: histogram\n").unwrap();

    let config = CatalogueConfig::from_file(&path).unwrap();
    assert_eq!(config.policy(), SelectionPolicy::TopK(5));
    assert_eq!(config.encoder, EncoderKind::Histogram);
    assert_eq!(config.model, DEFAULT_MODEL);
  }

  #[test]
  fn test_empty_file_is_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "\n").unwrap();

    assert_eq!(CatalogueConfig::from_file(&path).unwrap(), CatalogueConfig::default());
  }

  #[test]
  fn test_unknown_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "treshold: 0.5\n").unwrap();

    assert!(matches!(CatalogueConfig::from_file(&path), Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn test_env_overrides() {
    let mut config = CatalogueConfig::default();
    config
      .apply_env(lookup(&[
        ("CATALOGUE_SELECTION", "TOP-K"),
        ("CATALOGUE_TOP_K", " 3 "),
        ("CATALOGUE_ENCODER", "histogram"),
        ("CATALOGUE_DATA_DIR", "/srv/register"),
      ]))
      .unwrap();

    assert_eq!(config.policy(), SelectionPolicy::TopK(3));
    assert_eq!(config.encoder, EncoderKind::Histogram);
    assert_eq!(config.data_dir, PathBuf::from("/srv/register"));
  }

  #[test]
  fn test_invalid_env_values_name_the_variable() {
    let mut config = CatalogueConfig::default();
    let err = config.apply_env(lookup(&[("CATALOGUE_TOP_K", "many")])).unwrap_err();
    assert!(err.to_string().contains("CATALOGUE_TOP_K"));

    let err = config.apply_env(lookup(&[("CATALOGUE_ENCODER", "word2vec")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
  }

  #[test]
  #[serial]
  fn test_load_reads_catalogue_home() {
    let dir = TempDir::new().unwrap();
    let yaml = "encoder: histogram\nhistogram_dimension: 64\n";
    fs::write(dir.path().join(CONFIG_FILE), yaml).unwrap();
    std::env::set_var(HOME_VAR, dir.path());
    std::env::set_var(TOP_K_VAR, "7");

    let config = CatalogueConfig::load();

    std::env::remove_var(HOME_VAR);
    std::env::remove_var(TOP_K_VAR);

    let config = config.unwrap();
    assert_eq!(config.encoder, EncoderKind::Histogram);
    assert_eq!(config.histogram_dimension, 64);
    assert_eq!(config.top_k, 7);
  }

  #[test]
  #[serial]
  fn test_load_without_config_file() {
    let dir = TempDir::new().unwrap();
    std::env::set_var(HOME_VAR, dir.path());

    let config = CatalogueConfig::load();
    std::env::remove_var(HOME_VAR);

    assert_eq!(config.unwrap().selection, SelectionMode::Threshold);
  }
}
