use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::rating::StarRating;

/// Confidence used when the model's probabilities cannot be read
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Ceiling of the length heuristic
pub const HEURISTIC_BASE_RATE: f64 = 0.7;

/// Review length, in characters, at which the heuristic saturates
pub const HEURISTIC_FULL_LENGTH: f64 = 50.0;

/// How the analyzer derives a confidence score. Picked once per deployed model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceStrategy {
  /// Longer reviews are trusted more, up to the base rate
  #[default]
  Heuristic,
  /// Probability the model assigns to the predicted star class
  Probabilistic,
}

pub fn heuristic_confidence(text: &str) -> f64 {
  let length: f64 = text.chars().count() as f64;
  (HEURISTIC_BASE_RATE * (length / HEURISTIC_FULL_LENGTH).min(1.0)).clamp(0.0, 1.0)
}

/// Reads the probability of the rating's whole-star class (1 star at index 0).
/// Falls back to the largest probability when that class does not exist.
/// Returns `None` for an empty or non-finite distribution.
pub fn probabilistic_confidence(probabilities: ArrayView1<'_, f64>, rating: StarRating) -> Option<f64> {
  let index: usize = rating.whole_stars().saturating_sub(1);
  let picked: f64 = match probabilities.get(index) {
    Some(&p) => p,
    None => probabilities.iter().cloned().fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))))?,
  };
  if !picked.is_finite() {
    return None;
  }
  Some(((picked * 100.0).round() / 100.0).clamp(0.0, 1.0))
}
