//! Exact-match category filters applied before ranking
//!
//! The filtered order becomes the "original order" the ranker preserves
//! between equal scores.

use serde::Serialize;
use std::collections::BTreeSet;

use super::record::Record;

/// Status matching has one extra case: records with no status at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter {
  Exact(String),
  Blank,
}

impl StatusFilter {
  fn matches(&self, status: &str) -> bool {
    match self {
      StatusFilter::Exact(expected) => status == expected,
      StatusFilter::Blank => status.is_empty(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
  pub department: Option<String>,
  pub status: Option<StatusFilter>,
  pub users: Option<String>,
  pub developed_by: Option<String>,
  pub pii: Option<String>,
  pub notification_ai: Option<String>,
}

fn matches_exact(expected: &Option<String>, actual: &str) -> bool {
  expected.as_deref().map_or(true, |expected| expected == actual)
}

impl RecordFilter {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  pub fn matches(&self, record: &Record) -> bool {
    matches_exact(&self.department, &record.department)
      && self.status.as_ref().map_or(true, |status| status.matches(&record.status))
      && matches_exact(&self.users, &record.users)
      && matches_exact(&self.developed_by, &record.developed_by)
      && matches_exact(&self.pii, &record.pii)
      && matches_exact(&self.notification_ai, &record.notification_ai)
  }

  /// Keep matching records, preserving input order
  pub fn apply(&self, records: &[Record]) -> Vec<Record> {
    records.iter().filter(|record| self.matches(record)).cloned().collect()
  }
}

/// Distinct non-empty values per filterable field, sorted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
  pub department: Vec<String>,
  pub status: Vec<String>,
  pub users: Vec<String>,
  pub developed_by: Vec<String>,
  pub pii: Vec<String>,
  pub notification_ai: Vec<String>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
  values.filter(|v| !v.is_empty()).collect::<BTreeSet<_>>().into_iter().map(String::from).collect()
}

pub fn facets(records: &[Record]) -> Facets {
  Facets {
    department: distinct(records.iter().map(|r| r.department.as_str())),
    status: distinct(records.iter().map(|r| r.status.as_str())),
    users: distinct(records.iter().map(|r| r.users.as_str())),
    developed_by: distinct(records.iter().map(|r| r.developed_by.as_str())),
    pii: distinct(records.iter().map(|r| r.pii.as_str())),
    notification_ai: distinct(records.iter().map(|r| r.notification_ai.as_str())),
  }
}
