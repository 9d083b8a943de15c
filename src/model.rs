use ndarray::{Array1, Array2, Axis};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{ConfigError, InferenceError};
use crate::preprocessing::{TfidfVectorizer, Vectorizer};

/// Pre-fitted predictive model, consumed as an opaque scoring function.
pub trait ScoreModel: Send + Sync {
  /// One raw score per feature row
  fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>, InferenceError>;

  /// One class probability row per feature row. Column `i` is the
  /// probability of the `i`-th class (1 star first for star models).
  fn predict_proba(&self, _features: &Array2<f64>) -> Result<Array2<f64>, InferenceError> {
    Err(InferenceError::ProbabilitiesUnsupported)
  }

  fn supports_probabilities(&self) -> bool {
    false
  }
}

/// Star Model
/// Serialized star-rating model: either a linear regressor or a softmax classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StarModel {
  Regressor {
    coefficients: Array1<f64>,
    intercept: f64,
  },
  Classifier {
    /// Label predicted for each class row, e.g. `[1.0, 2.0, 3.0, 4.0, 5.0]`
    classes: Vec<f64>,
    /// `n_classes x n_features`
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
  },
}

impl StarModel {
  pub fn n_features(&self) -> usize {
    match self {
      StarModel::Regressor { coefficients, .. } => coefficients.len(),
      StarModel::Classifier { coefficients, .. } => coefficients.ncols(),
    }
  }

  fn check_features(&self, features: &Array2<f64>) -> Result<(), InferenceError> {
    if features.ncols() != self.n_features() {
      return Err(InferenceError::DimensionMismatch { expected: self.n_features(), found: features.ncols() });
    }
    Ok(())
  }

  fn logits(coefficients: &Array2<f64>, intercepts: &Array1<f64>, features: &Array2<f64>) -> Array2<f64> {
    features.dot(&coefficients.t()) + intercepts
  }
}

/// Row-wise softmax, shifted by the row max for stability
fn softmax(mut logits: Array2<f64>) -> Array2<f64> {
  for mut row in logits.axis_iter_mut(Axis(0)) {
    let max: f64 = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    row.mapv_inplace(|v| (v - max).exp());
    let total: f64 = row.sum();
    if total > 0.0 {
      row.mapv_inplace(|v| v / total);
    }
  }
  logits
}

fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
  let mut best: Option<(usize, f64)> = None;
  for (i, v) in values.enumerate() {
    match best {
      Some((_, b)) if v <= b => {}
      _ => best = Some((i, v)),
    }
  }
  best.map(|(i, _)| i)
}

impl ScoreModel for StarModel {
  fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>, InferenceError> {
    self.check_features(features)?;
    match self {
      StarModel::Regressor { coefficients, intercept } => {
        let scores: Array1<f64> = features.dot(coefficients) + *intercept;
        Ok(scores.to_vec())
      }
      StarModel::Classifier { classes, coefficients, intercepts } => {
        let logits: Array2<f64> = Self::logits(coefficients, intercepts, features);
        logits
          .axis_iter(Axis(0))
          .map(|row| {
            argmax(row.iter().cloned())
              .and_then(|i| classes.get(i).copied())
              .ok_or(InferenceError::EmptyOutput)
          })
          .collect()
      }
    }
  }

  fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, InferenceError> {
    self.check_features(features)?;
    match self {
      StarModel::Regressor { .. } => Err(InferenceError::ProbabilitiesUnsupported),
      StarModel::Classifier { coefficients, intercepts, .. } => {
        Ok(softmax(Self::logits(coefficients, intercepts, features)))
      }
    }
  }

  fn supports_probabilities(&self) -> bool {
    matches!(self, StarModel::Classifier { .. })
  }
}

/// Load Artifact
/// Reads a bincode-serialized model or vectorizer from disk
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
  let file: File = File::open(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
  let artifact: T = bincode::deserialize_from(BufReader::new(file))
    .map_err(|source| ConfigError::Artifact { path: path.to_path_buf(), source })?;
  info!("Loaded artifact {:?}", path);
  Ok(artifact)
}

/// Save Artifact
/// Writes a model or vectorizer in the format read by `load_artifact`
pub fn save_artifact<T: Serialize>(artifact: &T, path: &Path) -> Result<(), ConfigError> {
  let file: File = File::create(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
  bincode::serialize_into(BufWriter::new(file), artifact)
    .map_err(|source| ConfigError::Artifact { path: path.to_path_buf(), source })
}

/// Load Artifact Pair
/// Reads a model and the vectorizer it was fitted with, rejecting a pair whose
/// feature widths disagree
pub fn load_artifact_pair(model_path: &Path, vectorizer_path: &Path) -> Result<(StarModel, TfidfVectorizer), ConfigError> {
  let model: StarModel = load_artifact(model_path)?;
  let vectorizer: TfidfVectorizer = load_artifact(vectorizer_path)?;
  if vectorizer.n_features() != model.n_features() {
    return Err(ConfigError::FeatureMismatch { vectorizer: vectorizer.n_features(), model: model.n_features() });
  }
  Ok((model, vectorizer))
}
