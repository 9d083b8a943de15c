use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::{AnalysisResult, Degradation, SentimentAnalyzer};
use crate::sentiment::SentimentLabel;

/// Aggregate over the reviews of one batch that were analyzed successfully.
/// Percentages are meaningless when `total_reviews == 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
  pub avg_rating: f64,
  pub positive_pct: f64,
  pub neutral_pct: f64,
  pub negative_pct: f64,
  /// Successfully analyzed reviews; the denominator of every percentage
  pub total_reviews: usize,
  /// Reviews left out: blank, or rating masked by an inference failure
  pub skipped_reviews: usize,
}

impl BatchStatistics {
  /// Folds already-built results. Failure-masked ratings are counted as skipped.
  pub fn from_results(results: &[AnalysisResult]) -> Self {
    let mut stats = BatchStatistics::default();
    let mut rating_sum: f64 = 0.0;
    let (mut positive, mut neutral, mut negative) = (0usize, 0usize, 0usize);

    for result in results {
      if result.degraded == Some(Degradation::Rating) {
        stats.skipped_reviews += 1;
        continue;
      }
      rating_sum += result.rating.value();
      match result.sentiment {
        SentimentLabel::Positive => positive += 1,
        SentimentLabel::Neutral => neutral += 1,
        SentimentLabel::Negative => negative += 1,
      }
      stats.total_reviews += 1;
    }

    if stats.total_reviews > 0 {
      let n: f64 = stats.total_reviews as f64;
      stats.avg_rating = rating_sum / n;
      stats.positive_pct = 100.0 * positive as f64 / n;
      stats.neutral_pct = 100.0 * neutral as f64 / n;
      stats.negative_pct = 100.0 * negative as f64 / n;
    }
    stats
  }

  /// Strictly most frequent of positive/negative, otherwise neutral.
  pub fn dominant_sentiment(&self) -> Option<SentimentLabel> {
    if self.total_reviews == 0 {
      return None;
    }
    let (pos, neu, neg) = (self.positive_pct, self.neutral_pct, self.negative_pct);
    if pos > neg && pos > neu {
      Some(SentimentLabel::Positive)
    } else if neg > pos && neg > neu {
      Some(SentimentLabel::Negative)
    } else {
      Some(SentimentLabel::Neutral)
    }
  }
}

/// Per-review results of a batch alongside their statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
  /// Every review that produced a result, degraded ones included
  pub results: Vec<AnalysisResult>,
  pub statistics: BatchStatistics,
}

impl BatchReport {
  pub fn counted_results(&self) -> impl Iterator<Item = &AnalysisResult> {
    self.results.iter().filter(|r| r.degraded != Some(Degradation::Rating))
  }
}

impl SentimentAnalyzer {
  /// Analyzes reviews one after another. A review that fails never aborts
  /// the batch; it is logged and left out of the statistics.
  pub fn analyze_batch<S: AsRef<str>>(&self, reviews: &[S]) -> BatchReport {
    let mut results: Vec<AnalysisResult> = Vec::with_capacity(reviews.len());
    let mut rejected: usize = 0;

    for (i, review) in reviews.iter().enumerate() {
      match self.analyze(review.as_ref()) {
        Ok(result) => {
          if result.degraded == Some(Degradation::Rating) {
            warn!("Skipping review #{} in batch statistics: rating could not be predicted", i);
          }
          results.push(result);
        }
        Err(e) => {
          warn!("Skipping review #{}: {}", i, e);
          rejected += 1;
        }
      }
    }

    let mut statistics: BatchStatistics = BatchStatistics::from_results(&results);
    statistics.skipped_reviews += rejected;
    info!(
      "Batch analyzed: {} counted, {} skipped, average {:.2} stars",
      statistics.total_reviews, statistics.skipped_reviews, statistics.avg_rating
    );

    BatchReport { results, statistics }
  }

  /// Aggregate
  /// Batch statistics without the per-review results
  pub fn aggregate<S: AsRef<str>>(&self, reviews: &[S]) -> BatchStatistics {
    self.analyze_batch(reviews).statistics
  }
}
