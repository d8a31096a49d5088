//! Deterministic character-histogram encoder
//!
//! Needs no model files, so it works offline and gives tests a stable encoder.
//! Texts sharing many characters land close together; that is all it knows
//! about meaning.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Encoder, EncoderLoader};
use crate::error::EmbeddingError;
use crate::services::similarity;

pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone)]
pub struct HistogramEncoder {
  dimension: usize,
}

impl HistogramEncoder {
  pub fn new(dimension: usize) -> Self {
    Self { dimension: dimension.max(1) }
  }

  /// Count lowercase non-whitespace character codes into `dimension` buckets
  pub fn histogram(&self, text: &str) -> Vec<f32> {
    let mut buckets = vec![0.0f32; self.dimension];
    for c in text.chars().flat_map(char::to_lowercase).filter(|c| !c.is_whitespace()) {
      buckets[c as usize % self.dimension] += 1.0;
    }
    buckets
  }
}

impl Default for HistogramEncoder {
  fn default() -> Self {
    Self::new(DEFAULT_DIMENSION)
  }
}

#[async_trait]
impl Encoder for HistogramEncoder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    Ok(similarity::normalize(self.histogram(text)))
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  fn name(&self) -> &str {
    "char-histogram"
  }
}

pub struct HistogramLoader {
  dimension: usize,
}

impl HistogramLoader {
  pub fn new(dimension: usize) -> Self {
    Self { dimension }
  }
}

#[async_trait]
impl EncoderLoader for HistogramLoader {
  async fn load(&self) -> Result<Arc<dyn Encoder>, EmbeddingError> {
    Ok(Arc::new(HistogramEncoder::new(self.dimension)))
  }

  fn describe(&self) -> String {
    format!("char-histogram, {} buckets", self.dimension)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::similarity::{cosine_similarity, l2_norm};

  #[test]
  fn test_histogram_counts_characters_case_insensitively() {
    let encoder = HistogramEncoder::new(128);
    let counts = encoder.histogram("Aa b");

    assert_eq!(counts['a' as usize], 2.0);
    assert_eq!(counts['b' as usize], 1.0);
    assert_eq!(counts[' ' as usize], 0.0);
    assert_eq!(counts.iter().sum::<f32>(), 3.0);
  }

  #[test]
  fn test_zero_dimension_is_clamped() {
    assert_eq!(HistogramEncoder::new(0).dimension(), 1);
  }

  #[tokio::test]
  async fn test_embed_is_deterministic_and_unit_length() {
    let encoder = HistogramEncoder::default();
    let a = encoder.embed("fraud detection").await.unwrap();
    let b = encoder.embed("fraud detection").await.unwrap();

    assert_eq!(a, b);
    assert_eq!(a.len(), DEFAULT_DIMENSION);
    assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
  }

  #[tokio::test]
  async fn test_similar_text_scores_higher() {
    let encoder = HistogramEncoder::default();
    let query = encoder.embed("fraud").await.unwrap();
    let close = encoder.embed("Fraud detection").await.unwrap();
    let far = encoder.embed("xyz").await.unwrap();

    assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
  }

  #[tokio::test]
  async fn test_loader_builds_requested_dimension() {
    let encoder = HistogramLoader::new(32).load().await.unwrap();
    assert_eq!(encoder.dimension(), 32);
    assert_eq!(encoder.embed("abc").await.unwrap().len(), 32);
  }
}
