//! Plain substring matching for when the embedding path is unavailable

use crate::models::Record;

/// Keep records whose name, description or department contains the query
/// (case-insensitive). Input order is preserved; nothing is scored.
pub fn fallback_match<'a>(query: &str, records: &'a [Record]) -> Vec<&'a Record> {
  let query_lower = query.to_lowercase();
  records
    .iter()
    .filter(|record| {
      [&record.name, &record.description, &record.department]
        .iter()
        .any(|field| field.to_lowercase().contains(&query_lower))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(id: &str, name: &str, description: &str, department: &str) -> Record {
    Record {
      id: id.to_string(),
      name: name.to_string(),
      description: description.to_string(),
      department: department.to_string(),
      ..Record::default()
    }
  }

  #[test]
  fn test_matches_department_case_insensitively() {
    let records = vec![
      record("1", "Chatbot", "Answers questions", "Service Canada"),
      record("2", "Triage", "Sorts inbound mail", "Health Canada"),
      record("3", "Translator", "Translates documents", "Translation Bureau"),
    ];

    let matched = fallback_match("health", &records);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, "2");
  }

  #[test]
  fn test_preserves_input_order() {
    let records = vec![
      record("b", "Permit bot", "", ""),
      record("a", "", "permit review", ""),
      record("c", "", "", "Permits Office"),
    ];

    let ids: Vec<_> = fallback_match("PERMIT", &records).iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
  }

  #[test]
  fn test_other_fields_are_not_searched() {
    let records = vec![Record { vendor: "Health Analytics Inc".to_string(), ..Record::default() }];
    assert!(fallback_match("health", &records).is_empty());
  }

  #[test]
  fn test_empty_fields_never_fail() {
    let records = vec![Record::default()];
    assert!(fallback_match("anything", &records).is_empty());
  }
}
