//! Hybrid ranking: semantic similarity plus a bounded keyword bonus
//!
//! Every record gets a combined score, the list is stably sorted by it, and a
//! selection policy decides what is surfaced. Any failure on the embedding
//! path degrades to [`fallback_match`] so callers always get a result list.

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::EmbeddingError;
use crate::models::Record;
use crate::services::embeddings::EmbeddingProvider;
use crate::services::fallback::fallback_match;
use crate::services::lexical::keyword_bonus;
use crate::services::similarity::cosine_similarity;

/// Score for records that cannot be compared; below any real combined score
pub const SENTINEL_SCORE: f32 = -1.0;
/// Combined score a keyword-matching record must beat in threshold mode
pub const COMBINED_THRESHOLD: f32 = 0.5;
/// Semantic score that qualifies a record on its own in threshold mode
pub const SEMANTIC_THRESHOLD: f32 = 0.6;
pub const DEFAULT_TOP_K: usize = 20;

/// A record with its relevance scores for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord<'a> {
  #[serde(flatten)]
  pub record: &'a Record,
  pub score: f32,
  #[serde(rename = "semanticScore")]
  pub semantic_score: f32,
  #[serde(rename = "keywordBonus")]
  pub keyword_bonus: f32,
}

impl<'a> ScoredRecord<'a> {
  fn sentinel(record: &'a Record) -> Self {
    Self { record, score: SENTINEL_SCORE, semantic_score: 0.0, keyword_bonus: 0.0 }
  }
}

/// Threshold-mode acceptance test: keyword evidence with a convincing
/// combined score, or a strong semantic match on its own
pub fn is_relevant(scored: &ScoredRecord<'_>) -> bool {
  let combined = scored.keyword_bonus > 0.0 && scored.score > COMBINED_THRESHOLD;
  combined || scored.semantic_score > SEMANTIC_THRESHOLD
}

/// Which scored records to surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
  /// Keep only convincing matches; an empty result beats an irrelevant one
  #[default]
  Threshold,
  /// Keep the best `k` regardless of absolute score
  TopK(usize),
}

impl SelectionPolicy {
  pub fn select<'a>(&self, mut ranked: Vec<ScoredRecord<'a>>) -> Vec<ScoredRecord<'a>> {
    match *self {
      SelectionPolicy::Threshold => ranked.into_iter().filter(is_relevant).collect(),
      SelectionPolicy::TopK(k) => {
        ranked.truncate(k);
        ranked
      }
    }
  }
}

/// Outcome of a search; never an error
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResults<'a> {
  /// Blank query: the input, untouched
  Unfiltered(Vec<&'a Record>),
  /// Scored, sorted and selected
  Ranked(Vec<ScoredRecord<'a>>),
  /// Embedding path failed; substring matches in input order
  Fallback(Vec<&'a Record>),
}

impl<'a> SearchResults<'a> {
  pub fn records(&self) -> Vec<&'a Record> {
    match self {
      SearchResults::Unfiltered(records) | SearchResults::Fallback(records) => records.clone(),
      SearchResults::Ranked(scored) => scored.iter().map(|s| s.record).collect(),
    }
  }

  pub fn scored(&self) -> Option<&[ScoredRecord<'a>]> {
    match self {
      SearchResults::Ranked(scored) => Some(scored),
      _ => None,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      SearchResults::Unfiltered(records) | SearchResults::Fallback(records) => records.len(),
      SearchResults::Ranked(scored) => scored.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_fallback(&self) -> bool {
    matches!(self, SearchResults::Fallback(_))
  }
}

pub struct HybridRanker {
  provider: Arc<EmbeddingProvider>,
  policy: SelectionPolicy,
}

impl HybridRanker {
  pub fn new(provider: Arc<EmbeddingProvider>, policy: SelectionPolicy) -> Self {
    Self { provider, policy }
  }

  pub fn policy(&self) -> SelectionPolicy {
    self.policy
  }

  pub fn provider(&self) -> &Arc<EmbeddingProvider> {
    &self.provider
  }

  /// Rank `records` against `query`, falling back to substring matching on failure
  pub async fn search<'a>(&self, query: &str, records: &'a [Record]) -> SearchResults<'a> {
    if query.trim().is_empty() {
      return SearchResults::Unfiltered(records.iter().collect());
    }

    match self.rank(query, records).await {
      Ok(ranked) => SearchResults::Ranked(self.policy.select(ranked)),
      Err(e) => {
        bentley::warn!("Semantic search unavailable, using keyword fallback: {e}");
        SearchResults::Fallback(fallback_match(query, records))
      }
    }
  }

  /// Score and sort every record without applying the selection policy
  pub async fn rank<'a>(
    &self,
    query: &str,
    records: &'a [Record],
  ) -> Result<Vec<ScoredRecord<'a>>, EmbeddingError> {
    let query_vector = self.provider.encode(query).await?;
    Ok(rank_records(query, &query_vector, records))
  }
}

pub fn score_record<'a>(query: &str, query_vector: &[f32], record: &'a Record) -> ScoredRecord<'a> {
  let Some(embedding) = record.embedding.as_deref() else {
    return ScoredRecord::sentinel(record);
  };

  if embedding.is_empty() || embedding.len() != query_vector.len() {
    tracing::debug!(
      id = %record.id,
      expected = query_vector.len(),
      actual = embedding.len(),
      "embedding dimension mismatch, treating as missing"
    );
    return ScoredRecord::sentinel(record);
  }

  let semantic_score = cosine_similarity(query_vector, embedding);
  let keyword_bonus = keyword_bonus(query, record);
  let score = semantic_score + keyword_bonus;

  if !score.is_finite() {
    tracing::debug!(id = %record.id, "non-finite score, treating as missing");
    return ScoredRecord::sentinel(record);
  }

  ScoredRecord { record, score, semantic_score, keyword_bonus }
}

/// Score every record and stably sort by descending score
pub fn rank_records<'a>(
  query: &str,
  query_vector: &[f32],
  records: &'a [Record],
) -> Vec<ScoredRecord<'a>> {
  let mut scored: Vec<ScoredRecord<'a>> =
    records.iter().map(|record| score_record(query, query_vector, record)).collect();

  scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
  scored
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(id: &str, name: &str, embedding: Option<Vec<f32>>) -> Record {
    Record { id: id.to_string(), name: name.to_string(), embedding, ..Record::default() }
  }

  fn scored(record: &Record, semantic_score: f32, keyword_bonus: f32) -> ScoredRecord<'_> {
    ScoredRecord { record, score: semantic_score + keyword_bonus, semantic_score, keyword_bonus }
  }

  fn ids<'a>(scored: &[ScoredRecord<'a>]) -> Vec<&'a str> {
    scored.iter().map(|s| s.record.id.as_str()).collect()
  }

  #[test]
  fn test_threshold_semantic_boundary_is_strict() {
    let r = Record::default();
    assert!(!is_relevant(&scored(&r, 0.6, 0.0)));
    assert!(is_relevant(&scored(&r, 0.61, 0.0)));
  }

  #[test]
  fn test_threshold_requires_keyword_for_combined_rule() {
    let r = Record::default();
    // combined 0.55 with keyword evidence qualifies
    assert!(is_relevant(&scored(&r, 0.45, 0.1)));
    // same combined score without keyword evidence does not
    assert!(!is_relevant(&scored(&r, 0.55, 0.0)));
    // keyword evidence but combined score not above 0.5
    assert!(!is_relevant(&scored(&r, 0.3, 0.2)));
  }

  #[test]
  fn test_sentinel_never_passes_threshold() {
    let r = Record::default();
    assert!(!is_relevant(&ScoredRecord::sentinel(&r)));
  }

  #[test]
  fn test_top_k_truncates() {
    let records: Vec<Record> = (0..5).map(|i| record(&i.to_string(), "", None)).collect();
    let ranked: Vec<_> = records.iter().map(|r| scored(r, 0.1, 0.0)).collect();

    assert_eq!(ids(&SelectionPolicy::TopK(2).select(ranked.clone())), vec!["0", "1"]);
    assert_eq!(SelectionPolicy::TopK(10).select(ranked.clone()).len(), 5);
    assert!(SelectionPolicy::TopK(0).select(ranked).is_empty());
  }

  #[test]
  fn test_missing_and_mismatched_embeddings_get_sentinel() {
    let missing = record("missing", "", None);
    let short = record("short", "", Some(vec![1.0]));
    let empty = record("empty", "", Some(vec![]));
    let query_vector = [1.0, 0.0];

    for r in [&missing, &short, &empty] {
      let s = score_record("anything", &query_vector, r);
      assert_eq!(s.score, SENTINEL_SCORE);
      assert_eq!(s.semantic_score, 0.0);
      assert_eq!(s.keyword_bonus, 0.0);
    }
  }

  #[test]
  fn test_score_combines_semantic_and_keyword() {
    let r = record("1", "Fraud Detection Bot", Some(vec![1.0, 0.0]));
    let s = score_record("fraud", &[1.0, 0.0], &r);

    assert!((s.semantic_score - 1.0).abs() < 1e-6);
    assert!((s.keyword_bonus - 0.6).abs() < 1e-6);
    assert!((s.score - 1.6).abs() < 1e-6);
  }

  #[test]
  fn test_non_finite_embedding_is_treated_as_missing() {
    let r = record("nan", "", Some(vec![f32::NAN, 1.0]));
    assert_eq!(score_record("q", &[1.0, 0.0], &r).score, SENTINEL_SCORE);
  }

  #[test]
  fn test_rank_is_stable_for_ties() {
    let records = vec![
      record("a", "", Some(vec![1.0, 0.0])),
      record("b", "", None),
      record("c", "", Some(vec![1.0, 0.0])),
      record("d", "", Some(vec![0.0, 1.0])),
      record("e", "", None),
    ];

    let ranked = rank_records("zz", &[1.0, 0.0], &records);
    assert_eq!(ids(&ranked), vec!["a", "c", "d", "b", "e"]);
  }

  #[test]
  fn test_bonus_never_exceeds_cap_over_semantic() {
    let text = "automated fraud detection for benefit claims";
    let records: Vec<Record> = (0..4)
      .map(|i| Record {
        id: i.to_string(),
        name: text.to_string(),
        description: text.to_string(),
        embedding: Some(vec![1.0, i as f32]),
        ..Record::default()
      })
      .collect();

    for s in rank_records(text, &[1.0, 0.5], &records) {
      assert!(s.score <= s.semantic_score + 0.7 + 1e-6);
    }
  }

  #[test]
  fn test_search_results_accessors() {
    let a = record("a", "", None);
    let b = record("b", "", None);

    let unfiltered = SearchResults::Unfiltered(vec![&a, &b]);
    assert_eq!(unfiltered.len(), 2);
    assert!(unfiltered.scored().is_none());
    assert!(!unfiltered.is_fallback());

    let ranked = SearchResults::Ranked(vec![scored(&b, 0.9, 0.0)]);
    assert_eq!(ranked.records()[0].id, "b");
    assert_eq!(ranked.scored().map(|s| s.len()), Some(1));

    let fallback = SearchResults::Fallback(vec![]);
    assert!(fallback.is_empty());
    assert!(fallback.is_fallback());
  }

  #[test]
  fn test_scored_record_serializes_flat() {
    let r = record("x1", "Chatbot", None);
    let value = serde_json::to_value(scored(&r, 0.5, 0.1)).unwrap();

    assert_eq!(value["id"], "x1");
    assert_eq!(value["name"], "Chatbot");
    assert!(value["semanticScore"].as_f64().unwrap() > 0.49);
    assert!(value["keywordBonus"].as_f64().unwrap() > 0.09);
    assert!(value.get("embedding").is_none());
  }
}
