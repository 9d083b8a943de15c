//! Test doubles for the vectorizer and model seams.

use ndarray::{Array1, Array2};

use std::collections::HashMap;

use crate::error::InferenceError;
use crate::model::ScoreModel;
use crate::preprocessing::Vectorizer;

/// Emits a single feature looked up per text. Unknown texts fail to
/// vectorize unless a default value is set.
#[derive(Default)]
pub struct LookupVectorizer {
  values: HashMap<String, f64>,
  default: Option<f64>,
}

impl LookupVectorizer {
  pub fn accepting_anything() -> Self {
    Self { values: HashMap::new(), default: Some(0.0) }
  }

  pub fn with(mut self, text: &str, value: f64) -> Self {
    self.values.insert(text.to_string(), value);
    self
  }
}

impl Vectorizer for LookupVectorizer {
  fn transform(&self, texts: &[&str]) -> Result<Array2<f64>, InferenceError> {
    let column: Vec<f64> = texts
      .iter()
      .map(|text| {
        self.values.get(*text).copied().or(self.default).ok_or_else(|| InferenceError::Tokenization(format!("unknown review {:?}", text)))
      })
      .collect::<Result<_, _>>()?;
    Ok(Array1::from(column).insert_axis(ndarray::Axis(1)))
  }

  fn n_features(&self) -> usize {
    1
  }
}

/// Returns the same raw score for every row
pub struct FixedScoreModel(pub f64);

impl ScoreModel for FixedScoreModel {
  fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>, InferenceError> {
    Ok(vec![self.0; features.nrows()])
  }
}

/// Uses the first feature as the raw score. Optionally exposes fixed
/// probabilities, or a probability call that always fails.
#[derive(Default)]
pub struct IdentityModel {
  pub probabilities: Option<Vec<f64>>,
  pub failing_probabilities: bool,
}

impl ScoreModel for IdentityModel {
  fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>, InferenceError> {
    Ok(features.column(0).to_vec())
  }

  fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, InferenceError> {
    match (&self.probabilities, self.failing_probabilities) {
      (_, true) => Err(InferenceError::EmptyOutput),
      (Some(p), false) => {
        let row: Array1<f64> = Array1::from(p.clone());
        Ok(Array2::from_shape_fn((features.nrows(), p.len()), |(_, j)| row[j]))
      }
      (None, false) => Err(InferenceError::ProbabilitiesUnsupported),
    }
  }

  fn supports_probabilities(&self) -> bool {
    self.probabilities.is_some() || self.failing_probabilities
  }
}

pub struct FailingModel;

impl ScoreModel for FailingModel {
  fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>, InferenceError> {
    Err(InferenceError::DimensionMismatch { expected: 5000, found: features.ncols() })
  }
}
