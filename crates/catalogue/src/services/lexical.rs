//! Keyword-overlap bonus added on top of semantic similarity

use std::collections::HashSet;

use crate::models::Record;

/// Added when the whole query appears verbatim in the record text
pub const PHRASE_BONUS: f32 = 0.5;
/// Added per distinct query term found in the record text
pub const TERM_BONUS: f32 = 0.1;
/// Lexical evidence alone never exceeds this
pub const MAX_BONUS: f32 = 0.7;
/// Terms this short or shorter carry no signal
const MIN_TERM_CHARS: usize = 3;

/// Lowercased concatenation of a record's searchable fields
pub fn haystack(record: &Record) -> String {
  record.searchable_fields().join(" ").to_lowercase()
}

/// Distinct lowercase query terms long enough to count, in query order
pub fn query_terms(query_lower: &str) -> Vec<&str> {
  let mut seen = HashSet::new();
  query_lower
    .split_whitespace()
    .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
    .filter(|term| seen.insert(*term))
    .collect()
}

pub fn keyword_bonus(query: &str, record: &Record) -> f32 {
  let query_lower = query.to_lowercase();
  let haystack = haystack(record);

  let mut bonus = 0.0f32;
  if haystack.contains(&query_lower) {
    bonus += PHRASE_BONUS;
  }

  for term in query_terms(&query_lower) {
    if haystack.contains(term) {
      bonus += TERM_BONUS;
    }
  }

  bonus.min(MAX_BONUS)
}
