//! Vector math shared by the encoders and the ranker

/// Calculate cosine similarity between two embedding vectors
///
/// Returns a value between -1 and 1, where:
/// - 1 = identical direction (high similarity)
/// - 0 = orthogonal (no similarity)
/// - -1 = opposite direction (negative similarity)
///
/// Empty inputs, mismatched lengths and zero-magnitude vectors all yield 0.
/// A mismatch means the embedding is missing or invalid, not dissimilar.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.is_empty() || a.len() != b.len() {
    return 0.0;
  }

  let mut dot_product = 0.0f32;
  let mut norm_a = 0.0f32;
  let mut norm_b = 0.0f32;
  for (x, y) in a.iter().zip(b.iter()) {
    dot_product += x * y;
    norm_a += x * x;
    norm_b += y * y;
  }

  // Avoid division by zero
  if norm_a == 0.0 || norm_b == 0.0 {
    return 0.0;
  }

  dot_product / (norm_a.sqrt() * norm_b.sqrt())
}

/// Euclidean (L2) norm
pub fn l2_norm(vector: &[f32]) -> f32 {
  vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize to unit length; zero-magnitude vectors are returned unchanged
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
  let magnitude = l2_norm(&vector);
  if magnitude < f32::EPSILON {
    return vector;
  }

  for value in vector.iter_mut() {
    *value /= magnitude;
  }
  vector
}
