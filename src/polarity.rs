use ndarray::Array2;
use tracing::debug;

use std::path::Path;
use std::sync::Arc;

use crate::error::{ConfigError, Error, InferenceError};
use crate::model::{load_artifact_pair, ScoreModel, StarModel};
use crate::preprocessing::{TfidfVectorizer, Vectorizer};
use crate::sentiment::SentimentLabel;

/// Class emitted by the binary model for a positive review
pub const POSITIVE_CLASS: f64 = 1.0;

/// Polarity Predictor
/// Binary positive/negative labels from a separately trained model
#[derive(Clone)]
pub struct PolarityPredictor {
  vectorizer: Arc<dyn Vectorizer>,
  model: Arc<dyn ScoreModel>,
}

impl PolarityPredictor {
  pub fn new(vectorizer: Arc<dyn Vectorizer>, model: Arc<dyn ScoreModel>) -> Self {
    Self { vectorizer, model }
  }

  /// Loads the binary model and the vectorizer it was fitted with.
  pub fn from_paths(model_path: &Path, vectorizer_path: &Path) -> Result<Self, ConfigError> {
    let (model, vectorizer): (StarModel, TfidfVectorizer) = load_artifact_pair(model_path, vectorizer_path)?;
    Ok(Self::new(Arc::new(vectorizer), Arc::new(model)))
  }

  pub fn try_predict(&self, text: &str) -> Result<SentimentLabel, InferenceError> {
    let features: Array2<f64> = self.vectorizer.transform(&[text])?;
    let class: f64 = self.model.predict(&features)?.first().copied().ok_or(InferenceError::EmptyOutput)?;
    if !class.is_finite() {
      return Err(InferenceError::NonFiniteScore(class));
    }
    // anything but the positive class reads as negative
    if class == POSITIVE_CLASS { Ok(SentimentLabel::Positive) } else { Ok(SentimentLabel::Negative) }
  }

  /// Predict Polarity
  /// Positive or negative, never neutral. Unlike the star analyzer, inference
  /// failures are returned to the caller.
  pub fn predict_polarity(&self, text: &str) -> Result<SentimentLabel, Error> {
    if text.trim().is_empty() {
      return Err(Error::EmptyInput);
    }
    let label: SentimentLabel = self.try_predict(text)?;
    debug!("Polarity: {}", label);
    Ok(label)
  }
}
