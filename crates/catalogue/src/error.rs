use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building an encoder or turning text into a vector.
///
/// `Clone` because a single initialization outcome is handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
  /// The encoder could not be constructed (missing assets, runtime failure)
  #[error("failed to initialize embedding model: {0}")]
  Initialization(String),

  /// A specific text could not be encoded, or the vector was unusable
  #[error("failed to encode text: {0}")]
  Encoding(String),
}

/// Errors raised while reading or writing a record dataset
#[derive(Debug, Error)]
pub enum DatasetError {
  #[error("failed to read dataset {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse dataset {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize dataset {}: {source}", path.display())]
  Serialize {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Errors raised while resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid value {value:?} for {var}")]
  InvalidValue { var: String, value: String },
}
