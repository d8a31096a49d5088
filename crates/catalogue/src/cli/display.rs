//! Display formatting utilities for CLI output

use colored::*;
use serde::Serialize;
use serde_json::Value;
use std::ops::Range;

use crate::models::{DatasetStats, Facets, Record};
use crate::services::search::{ScoredRecord, SearchResults};

const WRAP_WIDTH: usize = 80;

/// Lowercase a char only when it stays a single char, so positions in the
/// folded text line up one to one with the original
fn fold(c: char) -> char {
  let mut lower = c.to_lowercase();
  match (lower.next(), lower.next()) {
    (Some(single), None) => single,
    _ => c,
  }
}

/// Byte ranges of `text` matching any term, case-insensitively. Longest term
/// wins at each position and ranges never overlap.
pub fn keyword_spans(text: &str, terms: &[String]) -> Vec<Range<usize>> {
  let mut needles: Vec<Vec<char>> = terms
    .iter()
    .map(|term| term.chars().map(fold).collect::<Vec<_>>())
    .filter(|needle| !needle.is_empty())
    .collect();
  needles.sort_by_key(|n| std::cmp::Reverse(n.len()));

  let chars: Vec<(usize, char)> = text.char_indices().map(|(i, c)| (i, fold(c))).collect();
  let byte_at = |index: usize| chars.get(index).map_or(text.len(), |(offset, _)| *offset);

  let mut spans = Vec::new();
  let mut i = 0;
  while i < chars.len() {
    let hit = needles.iter().find(|needle| {
      chars.len() - i >= needle.len()
        && chars[i..i + needle.len()].iter().zip(needle.iter()).all(|((_, c), n)| c == n)
    });

    match hit {
      Some(needle) => {
        spans.push(byte_at(i)..byte_at(i + needle.len()));
        i += needle.len();
      }
      None => i += 1,
    }
  }

  spans
}

/// Paint every search term occurrence in `text`
pub fn highlight_keywords(text: &str, terms: &[String]) -> String {
  let mut out = String::with_capacity(text.len());
  let mut cursor = 0;

  for span in keyword_spans(text, terms) {
    out.push_str(&text[cursor..span.start]);
    out.push_str(&text[span.clone()].yellow().bold().to_string());
    cursor = span.end;
  }

  out.push_str(&text[cursor..]);
  out
}

/// Greedy word wrap on character count. Blank input lines are kept.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  text.split('\n').flat_map(|paragraph| wrap_paragraph(paragraph, width)).collect()
}

fn wrap_paragraph(paragraph: &str, width: usize) -> Vec<String> {
  let mut lines: Vec<String> = Vec::new();
  let mut line_width = 0;

  for word in paragraph.split_whitespace() {
    let word_width = word.chars().count();
    match lines.last_mut() {
      Some(line) if line_width + 1 + word_width <= width => {
        line.push(' ');
        line.push_str(word);
        line_width += 1 + word_width;
      }
      _ => {
        lines.push(word.to_string());
        line_width = word_width;
      }
    }
  }

  if lines.is_empty() {
    lines.push(String::new());
  }
  lines
}

/// Serialize for `--json` output, dropping bulky embedding vectors
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<Value> {
  let mut json = serde_json::to_value(value)?;
  strip_embeddings(&mut json);
  Ok(json)
}

fn strip_embeddings(value: &mut Value) {
  match value {
    Value::Object(map) => {
      map.remove("embedding");
      map.values_mut().for_each(strip_embeddings);
    }
    Value::Array(items) => items.iter_mut().for_each(strip_embeddings),
    _ => {}
  }
}

/// Display a single record with keyword highlighting
pub fn display_record(record: &Record, scores: Option<&ScoredRecord<'_>>, terms: &[String]) {
  let header = format!("=== {} ===", highlight_keywords(&record.name, terms).bold());
  println!("{header}");

  let mut meta = vec![record.department.blue().to_string()];
  if !record.status.is_empty() {
    meta.push(record.status.green().to_string());
  }
  if !record.id.is_empty() {
    meta.push(format!("#{}", record.id).dimmed().to_string());
  }
  println!("{}", meta.join(" | "));

  // Wrap before painting so escape codes do not count toward the width
  for line in wrap_text(&record.description, WRAP_WIDTH) {
    println!("{}", highlight_keywords(&line, terms));
  }

  if let Some(scored) = scores {
    let line = format!(
      "score {:.3} (semantic {:.3}, keyword +{:.1})",
      scored.score, scored.semantic_score, scored.keyword_bonus
    );
    println!("{}", line.dimmed());
  }
  println!();
}

pub fn display_results(results: &SearchResults<'_>, terms: &[String]) {
  if results.is_fallback() {
    println!("{}", "Semantic ranking unavailable; showing keyword matches".yellow());
  }

  if results.is_empty() {
    println!("No matching AI systems found.");
    return;
  }

  match results {
    SearchResults::Ranked(scored) => {
      for entry in scored {
        display_record(entry.record, Some(entry), terms);
      }
    }
    SearchResults::Unfiltered(records) | SearchResults::Fallback(records) => {
      for record in records {
        display_record(record, None, terms);
      }
    }
  }

  println!("{} {}", results.len().to_string().cyan().bold(), "result(s)".cyan());
}

fn display_facet(label: &str, values: &[String]) {
  println!("{} ({})", label.blue().bold(), values.len());
  for value in values {
    println!("  {value}");
  }
}

pub fn display_facets(facets: &Facets) {
  display_facet("department", &facets.department);
  display_facet("status", &facets.status);
  display_facet("users", &facets.users);
  display_facet("developed_by", &facets.developed_by);
  display_facet("pii", &facets.pii);
  display_facet("notification_ai", &facets.notification_ai);
}

pub fn display_stats(stats: &DatasetStats) {
  println!("{} {}", "Records:".bold(), stats.total);
  println!("{} {}", "With embeddings:".bold(), stats.embedded);
  for (dimension, count) in &stats.dimensions {
    println!("  {dimension} dimensions: {count}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn terms(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
  }

  #[test]
  fn test_spans_are_case_insensitive() {
    let text = "Fraud and fraud";
    let spans = keyword_spans(text, &terms(&["fraud"]));
    assert_eq!(spans, vec![0..5, 10..15]);
  }

  #[test]
  fn test_longest_term_wins() {
    let spans = keyword_spans("claims review", &terms(&["claim", "claims", ""]));
    assert_eq!(spans, vec![0..6]);
  }

  #[test]
  #[serial_test::serial]
  fn test_highlight_paints_matches_only() {
    colored::control::set_override(false);
    assert_eq!(highlight_keywords("Fraud and fraud", &terms(&["fraud"])), "Fraud and fraud");

    colored::control::set_override(true);
    let highlighted = highlight_keywords("Fraud and fraud", &terms(&["fraud"]));
    assert!(highlighted.matches("\u{1b}[").count() >= 2);
    assert!(highlighted.contains(" and "));
    colored::control::unset_override();
  }

  #[test]
  fn test_multi_char_lowercase_is_compared_as_is() {
    // 'İ' lowercases to two chars, so it is never folded onto 'i'
    assert!(keyword_spans("İstanbul", &terms(&["i"])).is_empty());
    assert_eq!(keyword_spans("İstanbul", &terms(&["İst"])), vec![0..4]);
  }

  #[test]
  #[serial_test::serial]
  fn test_highlight_handles_mixed_width_letters() {
    let text = "İẞ";
    // 'ẞ' folds to 'ß' but is encoded with a different byte length
    assert_eq!(keyword_spans(text, &terms(&["ß"])), vec![2..5]);

    colored::control::set_override(false);
    assert_eq!(highlight_keywords(text, &terms(&["ß"])), "İẞ");
    colored::control::unset_override();
  }

  #[test]
  fn test_wrap_text_respects_width() {
    let lines = wrap_text("one two three four five", 9);
    assert_eq!(lines, vec!["one two", "three", "four five"]);
  }

  #[test]
  fn test_wrap_text_keeps_blank_paragraphs() {
    assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
  }

  #[test]
  fn test_wrap_text_keeps_overlong_word_whole() {
    assert_eq!(wrap_text("a abcdefghij b", 4), vec!["a", "abcdefghij", "b"]);
  }

  #[test]
  fn test_to_json_drops_embeddings() {
    let records = vec![Record {
      id: "1".into(),
      embedding: Some(vec![0.1, 0.2]),
      ..Record::default()
    }];

    let json = to_json(&records).unwrap();
    assert_eq!(json[0]["id"], "1");
    assert!(json[0].get("embedding").is_none());
  }
}
