use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tokenizers::normalizers::Lowercase;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

use std::collections::HashMap;

use crate::error::InferenceError;

/// Text to feature matrix transform, fitted ahead of time.
/// One row per input text, one column per feature.
pub trait Vectorizer: Send + Sync {
  fn transform(&self, texts: &[&str]) -> Result<Array2<f64>, InferenceError>;

  /// Number of columns produced by `transform`
  fn n_features(&self) -> usize;
}

/// Splits a review into lower-cased word tokens.
/// Punctuation-only pieces are dropped.
pub fn tokenize(text: &str) -> Result<Vec<String>, InferenceError> {
  let mut normalized: NormalizedString = NormalizedString::from(text);
  Lowercase.normalize(&mut normalized).map_err(|e| InferenceError::Tokenization(e.to_string()))?;

  let mut pretokenized: PreTokenizedString = PreTokenizedString::from(normalized);
  Whitespace::default()
    .pre_tokenize(&mut pretokenized)
    .map_err(|e| InferenceError::Tokenization(e.to_string()))?;

  let tokens: Vec<String> = pretokenized
    .get_splits(OffsetReferential::Normalized, OffsetType::Char)
    .into_iter()
    .map(|(piece, _, _)| piece)
    .filter(|piece| piece.chars().any(char::is_alphanumeric))
    .map(str::to_string)
    .collect();
  Ok(tokens)
}

/// TF-IDF Vectorizer
/// Fixed vocabulary with per-term IDF weights, rows L2 normalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
  vocabulary: HashMap<String, usize>,
  idf: Array1<f64>,
  sublinear_tf: bool,
  normalize: bool,
}

impl TfidfVectorizer {
  /// `vocabulary` maps each term to its column; `idf` is indexed by that column.
  pub fn new(vocabulary: HashMap<String, usize>, idf: Array1<f64>) -> Self {
    Self { vocabulary, idf, sublinear_tf: false, normalize: true }
  }

  /// Use `1 + ln(count)` instead of the raw term count
  pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
    self.sublinear_tf = sublinear_tf;
    self
  }

  pub fn with_normalization(mut self, normalize: bool) -> Self {
    self.normalize = normalize;
    self
  }

  fn term_frequency(&self, count: usize) -> f64 {
    if self.sublinear_tf { 1.0 + (count as f64).ln() } else { count as f64 }
  }

  fn weight_row(&self, text: &str) -> Result<Array1<f64>, InferenceError> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for token in tokenize(text)? {
      if let Some(&column) = self.vocabulary.get(&token) {
        *counts.entry(column).or_insert(0) += 1;
      }
    }

    let mut row: Array1<f64> = Array1::zeros(self.n_features());
    for (column, count) in counts {
      let idf: f64 = self.idf.get(column).copied().ok_or(InferenceError::DimensionMismatch {
        expected: self.idf.len(),
        found: column + 1,
      })?;
      row[column] = self.term_frequency(count) * idf;
    }

    if self.normalize {
      let norm: f64 = row.dot(&row).sqrt();
      if norm > 0.0 {
        row.mapv_inplace(|v| v / norm);
      }
    }
    Ok(row)
  }
}

impl Vectorizer for TfidfVectorizer {
  fn transform(&self, texts: &[&str]) -> Result<Array2<f64>, InferenceError> {
    let mut features: Array2<f64> = Array2::zeros((texts.len(), self.n_features()));
    for (i, text) in texts.iter().enumerate() {
      let row: Array1<f64> = self.weight_row(text)?;
      features.row_mut(i).assign(&row);
    }
    Ok(features)
  }

  fn n_features(&self) -> usize {
    self.idf.len()
  }
}
