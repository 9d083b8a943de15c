use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building an analyzer. These are fatal: the analyzer is
/// never constructed when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path:?}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to decode model artifact {path:?}: {source}")]
  Artifact {
    path: PathBuf,
    #[source]
    source: bincode::Error,
  },

  #[error("failed to parse config file {path:?}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("{0} must be given on the command line or in the config file")]
  MissingPath(&'static str),

  #[error("invalid thresholds: positive_at ({positive_at}) must be greater than neutral_at ({neutral_at})")]
  InvalidThresholds { positive_at: f64, neutral_at: f64 },

  #[error("vectorizer produces {vectorizer} features but the model expects {model}")]
  FeatureMismatch { vectorizer: usize, model: usize },

  #[error("probabilistic confidence requires a model that exposes class probabilities")]
  ProbabilitiesUnavailable,
}

/// Failures of a single vectorizer or model call. The star analyzer absorbs
/// these and falls back to neutral defaults; the polarity predictor returns them.
#[derive(Debug, Error)]
pub enum InferenceError {
  #[error("tokenization failed: {0}")]
  Tokenization(String),

  #[error("feature dimension mismatch: model expects {expected}, got {found}")]
  DimensionMismatch { expected: usize, found: usize },

  #[error("model returned no prediction")]
  EmptyOutput,

  #[error("model returned a non-finite score: {0}")]
  NonFiniteScore(f64),

  #[error("model does not expose class probabilities")]
  ProbabilitiesUnsupported,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("review text is empty")]
  EmptyInput,

  #[error(transparent)]
  Inference(#[from] InferenceError),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("column {column:?} not found in {path:?}")]
  MissingColumn { column: String, path: PathBuf },

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("CSV array error: {0}")]
  CsvArray(#[from] ndarray_csv::ReadError),
}
