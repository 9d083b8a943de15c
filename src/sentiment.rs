use serde::{Deserialize, Serialize};

use std::fmt;

use crate::error::ConfigError;
use crate::rating::StarRating;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
  Negative,
  Neutral,
  Positive,
}

impl SentimentLabel {
  pub fn as_str(&self) -> &'static str {
    match self {
      SentimentLabel::Negative => "negative",
      SentimentLabel::Neutral => "neutral",
      SentimentLabel::Positive => "positive",
    }
  }
}

impl fmt::Display for SentimentLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Cut-points between sentiment bands. A rating at a cut-point belongs to
/// the higher band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
  pub positive_at: f64,
  pub neutral_at: f64,
}

impl ThresholdConfig {
  pub const STANDARD: ThresholdConfig = ThresholdConfig { positive_at: 4.0, neutral_at: 3.0 };
  pub const LENIENT: ThresholdConfig = ThresholdConfig { positive_at: 3.5, neutral_at: 2.5 };

  pub fn new(positive_at: f64, neutral_at: f64) -> Result<Self, ConfigError> {
    ThresholdConfig { positive_at, neutral_at }.validated()
  }

  pub fn validated(self) -> Result<Self, ConfigError> {
    let finite: bool = self.positive_at.is_finite() && self.neutral_at.is_finite();
    if !finite || self.positive_at <= self.neutral_at {
      return Err(ConfigError::InvalidThresholds { positive_at: self.positive_at, neutral_at: self.neutral_at });
    }
    Ok(self)
  }
}

impl Default for ThresholdConfig {
  fn default() -> Self {
    Self::STANDARD
  }
}

/// Classify Sentiment
/// Maps a star rating to its sentiment band
pub fn classify_sentiment(rating: StarRating, thresholds: &ThresholdConfig) -> SentimentLabel {
  let value: f64 = rating.value();
  if value >= thresholds.positive_at {
    SentimentLabel::Positive
  } else if value >= thresholds.neutral_at {
    SentimentLabel::Neutral
  } else {
    SentimentLabel::Negative
  }
}
