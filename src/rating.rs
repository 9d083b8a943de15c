use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use std::fmt;
use std::sync::Arc;

use crate::error::InferenceError;
use crate::model::ScoreModel;
use crate::preprocessing::Vectorizer;

/// Star rating in half-star steps between 1 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct StarRating(f64);

impl StarRating {
  pub const MIN: StarRating = StarRating(1.0);
  pub const MAX: StarRating = StarRating(5.0);
  /// Returned when the model cannot produce a score
  pub const NEUTRAL: StarRating = StarRating(3.0);

  /// Rounds a raw model score to the nearest half star, then clamps to [1, 5].
  /// Exact quarter-star scores round half to even, so 4.25 gives 4.0.
  pub fn from_raw_score(raw_score: f64) -> Self {
    let rounded: f64 = (raw_score * 2.0).round_ties_even() / 2.0;
    StarRating(rounded.clamp(Self::MIN.0, Self::MAX.0))
  }

  pub fn value(self) -> f64 {
    self.0
  }

  /// Whole stars, as used to index per-class probabilities
  pub fn whole_stars(self) -> usize {
    self.0.trunc() as usize
  }

  /// Five-glyph rendering, e.g. `★★★½☆` for 3.5
  pub fn stars(self) -> String {
    let full: usize = self.whole_stars();
    let half: bool = self.0 - full as f64 >= 0.5;
    let empty: usize = 5 - full - usize::from(half);
    let mut out: String = "★".repeat(full);
    if half {
      out.push('½');
    }
    out.push_str(&"☆".repeat(empty));
    out
  }
}

impl fmt::Display for StarRating {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.1}", self.0)
  }
}

impl From<StarRating> for f64 {
  fn from(rating: StarRating) -> f64 {
    rating.0
  }
}

impl TryFrom<f64> for StarRating {
  type Error = String;

  fn try_from(value: f64) -> Result<Self, Self::Error> {
    if !(1.0..=5.0).contains(&value) || (value * 2.0).fract() != 0.0 {
      return Err(format!("{} is not a half-star rating between 1 and 5", value));
    }
    Ok(StarRating(value))
  }
}

/// Rating Predictor
/// Vectorizes a review, scores it and quantizes the score to a star rating
#[derive(Clone)]
pub struct RatingPredictor {
  vectorizer: Arc<dyn Vectorizer>,
  model: Arc<dyn ScoreModel>,
}

impl RatingPredictor {
  pub fn new(vectorizer: Arc<dyn Vectorizer>, model: Arc<dyn ScoreModel>) -> Self {
    Self { vectorizer, model }
  }

  pub fn model(&self) -> &dyn ScoreModel {
    self.model.as_ref()
  }

  /// Feature row for a single review
  pub fn features(&self, text: &str) -> Result<Array2<f64>, InferenceError> {
    self.vectorizer.transform(&[text])
  }

  pub fn rating_from_features(&self, features: &Array2<f64>) -> Result<StarRating, InferenceError> {
    let scores: Vec<f64> = self.model.predict(features)?;
    let raw_score: f64 = scores.first().copied().ok_or(InferenceError::EmptyOutput)?;
    if !raw_score.is_finite() {
      return Err(InferenceError::NonFiniteScore(raw_score));
    }
    Ok(StarRating::from_raw_score(raw_score))
  }

  /// Like `predict_rating`, without masking inference failures
  pub fn try_predict_rating(&self, text: &str) -> Result<StarRating, InferenceError> {
    let features: Array2<f64> = self.features(text)?;
    self.rating_from_features(&features)
  }

  /// Predict Rating
  /// Falls back to a neutral 3 stars when the vectorizer or model fails
  pub fn predict_rating(&self, text: &str) -> StarRating {
    match self.try_predict_rating(text) {
      Ok(rating) => rating,
      Err(e) => {
        warn!("Rating prediction failed, using neutral rating: {}", e);
        StarRating::NEUTRAL
      }
    }
  }
}
