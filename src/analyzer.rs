use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::sync::Arc;

use crate::config::AnalyzerConfig;
use crate::confidence::{heuristic_confidence, probabilistic_confidence, ConfidenceStrategy, DEFAULT_CONFIDENCE};
use crate::error::{ConfigError, Error, InferenceError};
use crate::model::{load_artifact_pair, ScoreModel, StarModel};
use crate::preprocessing::{TfidfVectorizer, Vectorizer};
use crate::rating::{RatingPredictor, StarRating};
use crate::sentiment::{classify_sentiment, SentimentLabel, ThresholdConfig};

pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Which part of an analysis fell back to a default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Degradation {
  /// Vectorizer or model failed: neutral rating and default confidence
  Rating,
  /// Rating is genuine, class probabilities were unavailable
  Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub rating: StarRating,
  pub sentiment: SentimentLabel,
  pub confidence: f64,
  /// Full review as submitted
  pub text: String,
  /// Display-only truncation of `text`
  pub text_preview: String,
  pub degraded: Option<Degradation>,
}

impl AnalysisResult {
  pub fn is_degraded(&self) -> bool {
    self.degraded.is_some()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSettings {
  pub thresholds: ThresholdConfig,
  pub confidence: ConfidenceStrategy,
  pub preview_chars: usize,
}

impl Default for AnalyzerSettings {
  fn default() -> Self {
    Self {
      thresholds: ThresholdConfig::default(),
      confidence: ConfidenceStrategy::default(),
      preview_chars: DEFAULT_PREVIEW_CHARS,
    }
  }
}

/// First `max_chars` characters, with `...` appended only when text was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
    None => text.to_string(),
  }
}

/// Sentiment Analyzer
/// Star rating, sentiment band and confidence for French bank reviews
#[derive(Clone)]
pub struct SentimentAnalyzer {
  predictor: RatingPredictor,
  settings: AnalyzerSettings,
}

impl SentimentAnalyzer {
  pub fn new(
    vectorizer: Arc<dyn Vectorizer>,
    model: Arc<dyn ScoreModel>,
    settings: AnalyzerSettings,
  ) -> Result<Self, ConfigError> {
    settings.thresholds.validated()?;
    if settings.confidence == ConfidenceStrategy::Probabilistic && !model.supports_probabilities() {
      return Err(ConfigError::ProbabilitiesUnavailable);
    }
    Ok(Self { predictor: RatingPredictor::new(vectorizer, model), settings })
  }

  /// Loads the model and vectorizer artifacts named by `config`.
  pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
    let (model, vectorizer): (StarModel, TfidfVectorizer) =
      load_artifact_pair(&config.model_path, &config.vectorizer_path)?;
    Self::new(Arc::new(vectorizer), Arc::new(model), config.settings)
  }

  /// Estimate Confidence
  /// Standalone confidence for an already-rated review
  pub fn estimate_confidence(&self, text: &str, rating: StarRating) -> f64 {
    match self.settings.confidence {
      ConfidenceStrategy::Heuristic => heuristic_confidence(text),
      ConfidenceStrategy::Probabilistic => {
        let features = self.predictor.features(text);
        self.confidence_from_features(features.as_ref().ok(), rating).0
      }
    }
  }

  fn confidence_from_features(&self, features: Option<&Array2<f64>>, rating: StarRating) -> (f64, bool) {
    let probabilities: Result<Array2<f64>, InferenceError> = match features {
      Some(features) => self.predictor.model().predict_proba(features),
      None => Err(InferenceError::EmptyOutput),
    };
    let confidence: Option<f64> = probabilities
      .as_ref()
      .ok()
      .and_then(|proba| proba.outer_iter().next().and_then(|row| probabilistic_confidence(row, rating)));
    match confidence {
      Some(confidence) => (confidence, false),
      None => {
        match probabilities {
          Err(e) => warn!("Class probabilities unavailable, using default confidence: {}", e),
          Ok(_) => warn!("Class probabilities were empty, using default confidence"),
        }
        (DEFAULT_CONFIDENCE, true)
      }
    }
  }

  /// Analyze
  /// Rates a single review. Rejects blank text; inference failures come
  /// back as a neutral result flagged `degraded`.
  pub fn analyze(&self, text: &str) -> Result<AnalysisResult, Error> {
    if text.trim().is_empty() {
      return Err(Error::EmptyInput);
    }

    let scored: Result<(Array2<f64>, StarRating), InferenceError> = self
      .predictor
      .features(text)
      .and_then(|features| self.predictor.rating_from_features(&features).map(|rating| (features, rating)));

    let (rating, confidence, degraded) = match scored {
      Ok((features, rating)) => match self.settings.confidence {
        ConfidenceStrategy::Heuristic => (rating, heuristic_confidence(text), None),
        ConfidenceStrategy::Probabilistic => {
          let (confidence, fell_back) = self.confidence_from_features(Some(&features), rating);
          (rating, confidence, fell_back.then_some(Degradation::Confidence))
        }
      },
      Err(e) => {
        warn!("Analysis degraded to neutral defaults: {}", e);
        (StarRating::NEUTRAL, DEFAULT_CONFIDENCE, Some(Degradation::Rating))
      }
    };

    let sentiment: SentimentLabel = classify_sentiment(rating, &self.settings.thresholds);
    debug!("Analyzed review: {} stars, {}, confidence {:.2}", rating, sentiment, confidence);

    Ok(AnalysisResult {
      rating,
      sentiment,
      confidence,
      text: text.to_string(),
      text_preview: preview(text, self.settings.preview_chars),
      degraded,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::save_artifact;
  use crate::testing::{FailingModel, FixedScoreModel, IdentityModel, LookupVectorizer};
  use ndarray::{array, Array1};
  use std::collections::HashMap;
  use tempfile::tempdir;

  fn analyzer(model: impl ScoreModel + 'static, settings: AnalyzerSettings) -> SentimentAnalyzer {
    SentimentAnalyzer::new(Arc::new(LookupVectorizer::accepting_anything()), Arc::new(model), settings).unwrap()
  }

  #[test]
  fn it_analyzes_a_review() {
    let analyzer = analyzer(FixedScoreModel(4.2), AnalyzerSettings::default());
    let result: AnalysisResult = analyzer.analyze("Conseillers très gentils et disponibles").unwrap();
    assert_eq!(result.rating.value(), 4.0);
    assert_eq!(result.sentiment, SentimentLabel::Positive);
    assert!((result.confidence - 0.7 * 39.0 / 50.0).abs() < 1e-12);
    assert_eq!(result.text_preview, "Conseillers très gentils et disponibles");
    assert!(!result.is_degraded());
  }

  #[test]
  fn it_rejects_blank_reviews() {
    let analyzer = analyzer(FixedScoreModel(4.0), AnalyzerSettings::default());
    assert!(matches!(analyzer.analyze(""), Err(Error::EmptyInput)));
    assert!(matches!(analyzer.analyze("  \n\t "), Err(Error::EmptyInput)));
  }

  #[test]
  fn it_truncates_the_preview_but_keeps_the_text() {
    let analyzer = analyzer(FixedScoreModel(2.0), AnalyzerSettings::default());
    let long_review: String = "é".repeat(120);
    let result: AnalysisResult = analyzer.analyze(&long_review).unwrap();
    assert_eq!(result.text, long_review);
    assert_eq!(result.text_preview, format!("{}...", "é".repeat(100)));
    assert_eq!(preview("exactement", 10), "exactement");
    assert_eq!(preview("exactement", 3), "exa...");
  }

  #[test]
  fn it_masks_inference_failures_with_a_degraded_neutral_result() {
    let analyzer = analyzer(FailingModel, AnalyzerSettings::default());
    let result: AnalysisResult = analyzer.analyze("Agence fermée sans prévenir").unwrap();
    assert_eq!(result.rating, StarRating::NEUTRAL);
    assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    assert_eq!(result.sentiment, SentimentLabel::Neutral);
    assert_eq!(result.degraded, Some(Degradation::Rating));
  }

  #[test]
  fn it_uses_class_probabilities_when_configured() {
    let settings = AnalyzerSettings { confidence: ConfidenceStrategy::Probabilistic, ..Default::default() };
    let model = IdentityModel { probabilities: Some(vec![0.1, 0.1, 0.2, 0.5, 0.1]), ..Default::default() };
    let vectorizer = LookupVectorizer::default().with("bon accueil", 4.4);
    let analyzer = SentimentAnalyzer::new(Arc::new(vectorizer), Arc::new(model), settings).unwrap();

    let result: AnalysisResult = analyzer.analyze("bon accueil").unwrap();
    assert_eq!(result.rating.value(), 4.5);
    assert_eq!(result.confidence, 0.5);
    assert_eq!(result.degraded, None);
    assert_eq!(analyzer.estimate_confidence("bon accueil", result.rating), 0.5);
  }

  #[test]
  fn it_defaults_confidence_when_probabilities_fail() {
    let settings = AnalyzerSettings { confidence: ConfidenceStrategy::Probabilistic, ..Default::default() };
    let model = IdentityModel { failing_probabilities: true, ..Default::default() };
    let vectorizer = LookupVectorizer::default().with("temps d'attente", 1.8);
    let analyzer = SentimentAnalyzer::new(Arc::new(vectorizer), Arc::new(model), settings).unwrap();

    let result: AnalysisResult = analyzer.analyze("temps d'attente").unwrap();
    assert_eq!(result.rating.value(), 2.0);
    assert_eq!(result.sentiment, SentimentLabel::Negative);
    assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    assert_eq!(result.degraded, Some(Degradation::Confidence));
  }

  #[test]
  fn it_refuses_probabilistic_confidence_without_probabilities() {
    let settings = AnalyzerSettings { confidence: ConfidenceStrategy::Probabilistic, ..Default::default() };
    let err = SentimentAnalyzer::new(
      Arc::new(LookupVectorizer::accepting_anything()),
      Arc::new(FixedScoreModel(3.0)),
      settings,
    )
    .err()
    .unwrap();
    assert!(matches!(err, ConfigError::ProbabilitiesUnavailable));
  }

  #[test]
  fn it_refuses_invalid_thresholds() {
    let settings = AnalyzerSettings {
      thresholds: ThresholdConfig { positive_at: 2.0, neutral_at: 4.0 },
      ..Default::default()
    };
    let err = SentimentAnalyzer::new(Arc::new(LookupVectorizer::accepting_anything()), Arc::new(FixedScoreModel(3.0)), settings)
      .err()
      .unwrap();
    assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
  }

  #[test]
  fn it_applies_the_configured_thresholds() {
    let lenient = AnalyzerSettings { thresholds: ThresholdConfig::LENIENT, ..Default::default() };
    assert_eq!(analyzer(FixedScoreModel(3.4), lenient).analyze("correct").unwrap().sentiment, SentimentLabel::Positive);
    assert_eq!(
      analyzer(FixedScoreModel(3.4), AnalyzerSettings::default()).analyze("correct").unwrap().sentiment,
      SentimentLabel::Neutral
    );
  }

  #[test]
  fn it_loads_artifacts_from_disk() {
    let dir = tempdir().unwrap();
    let model_path = dir.path().join("model_star.bin");
    let vectorizer_path = dir.path().join("vectorizer.bin");

    let vocabulary: HashMap<String, usize> =
      [("gentils".to_string(), 0), ("mediocre".to_string(), 1)].into_iter().collect();
    save_artifact(&TfidfVectorizer::new(vocabulary, Array1::from(vec![1.0, 1.0])), &vectorizer_path).unwrap();
    save_artifact(&StarModel::Regressor { coefficients: array![1.5, -2.0], intercept: 3.0 }, &model_path).unwrap();

    let config = AnalyzerConfig { model_path, vectorizer_path, settings: AnalyzerSettings::default() };
    let analyzer = SentimentAnalyzer::from_config(&config).unwrap();

    assert_eq!(analyzer.analyze("Très gentils").unwrap().rating.value(), 4.5);
    assert_eq!(analyzer.analyze("Service mediocre").unwrap().rating.value(), 1.0);
    assert_eq!(analyzer.analyze("Rien à signaler").unwrap().rating, StarRating::NEUTRAL);
  }

  #[test]
  fn it_fails_construction_when_an_artifact_is_missing() {
    let dir = tempdir().unwrap();
    let config = AnalyzerConfig {
      model_path: dir.path().join("missing_model.bin"),
      vectorizer_path: dir.path().join("missing_vectorizer.bin"),
      settings: AnalyzerSettings::default(),
    };
    assert!(matches!(SentimentAnalyzer::from_config(&config), Err(ConfigError::Io { .. })));
  }

  #[test]
  fn it_fails_construction_when_artifacts_disagree_on_width() {
    let dir = tempdir().unwrap();
    let model_path = dir.path().join("model_star.bin");
    let vectorizer_path = dir.path().join("vectorizer.bin");
    let vocabulary: HashMap<String, usize> = [("gentils".to_string(), 0)].into_iter().collect();
    save_artifact(&TfidfVectorizer::new(vocabulary, Array1::from(vec![1.0])), &vectorizer_path).unwrap();
    save_artifact(&StarModel::Regressor { coefficients: array![1.0, 0.5, -1.0], intercept: 3.0 }, &model_path).unwrap();

    let config = AnalyzerConfig { model_path, vectorizer_path, settings: AnalyzerSettings::default() };
    assert!(matches!(
      SentimentAnalyzer::from_config(&config),
      Err(ConfigError::FeatureMismatch { vectorizer: 1, model: 3 })
    ));
  }
}
