use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::DatasetError;

/// One catalogued AI system
///
/// Text fields tolerate `null`, numbers and omission in the source JSON; all of
/// them come out as plain strings, empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
  #[serde(default, deserialize_with = "lenient_text")]
  pub id: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub name: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub department: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub description: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub users: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub developed_by: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub vendor: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub status: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub status_date: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub capabilities: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub data_sources: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub pii: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub pii_banks: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub notification_ai: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub results: String,
  /// Precomputed offline; absent when it was never computed
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub embedding: Option<Vec<f32>>,
}

impl Record {
  /// The free-text fields searched by keyword matching, in haystack order
  pub fn searchable_fields(&self) -> [&str; 8] {
    [
      &self.name,
      &self.description,
      &self.capabilities,
      &self.users,
      &self.vendor,
      &self.developed_by,
      &self.department,
      &self.results,
    ]
  }

  /// Text the offline index embeds for this record
  pub fn search_text(&self) -> String {
    [
      &self.name,
      &self.department,
      &self.description,
      &self.capabilities,
      &self.users,
      &self.developed_by,
      &self.vendor,
      &self.status,
      &self.pii_banks,
      &self.results,
    ]
    .iter()
    .map(|field| field.as_str())
    .collect::<Vec<_>>()
    .join(" ")
  }

  pub fn has_embedding(&self) -> bool {
    self.embedding.as_ref().is_some_and(|e| !e.is_empty())
  }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    None | Some(serde_json::Value::Null) => String::new(),
    Some(serde_json::Value::String(s)) => s,
    Some(other) => other.to_string(),
  })
}

/// Each locale ships as its own independent dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
  #[default]
  En,
  Fr,
}

impl Locale {
  pub fn code(self) -> &'static str {
    match self {
      Locale::En => "en",
      Locale::Fr => "fr",
    }
  }

  pub fn file_name(self) -> String {
    format!("data_{}.json", self.code())
  }
}

impl fmt::Display for Locale {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

/// A loaded record set and where it came from
#[derive(Debug, Clone)]
pub struct Dataset {
  pub source: PathBuf,
  pub records: Vec<Record>,
}

/// Summary counts for a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
  pub total: usize,
  pub embedded: usize,
  /// Embedding length -> number of records with that length
  pub dimensions: BTreeMap<usize, usize>,
}

impl Dataset {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|source| DatasetError::Io { path: path.to_path_buf(), source })?;
    let records = serde_json::from_str(&content)
      .map_err(|source| DatasetError::Parse { path: path.to_path_buf(), source })?;

    Ok(Self { source: path.to_path_buf(), records })
  }

  /// Write records back as a JSON array
  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let content = serde_json::to_string(&self.records)
      .map_err(|source| DatasetError::Serialize { path: path.to_path_buf(), source })?;
    std::fs::write(path, content)
      .map_err(|source| DatasetError::Io { path: path.to_path_buf(), source })
  }

  pub fn load_locale(dir: impl AsRef<Path>, locale: Locale) -> Result<Self, DatasetError> {
    Self::load(dir.as_ref().join(locale.file_name()))
  }

  pub fn stats(&self) -> DatasetStats {
    let mut dimensions = BTreeMap::new();
    for embedding in self.records.iter().filter_map(|r| r.embedding.as_ref()) {
      *dimensions.entry(embedding.len()).or_insert(0) += 1;
    }

    DatasetStats {
      total: self.records.len(),
      embedded: self.records.iter().filter(|r| r.has_embedding()).count(),
      dimensions,
    }
  }
}
