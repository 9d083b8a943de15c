pub mod analyzer;
pub mod batch;
pub mod confidence;
pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod polarity;
pub mod preprocessing;
pub mod rating;
pub mod sentiment;

#[cfg(test)]
mod testing;

pub use analyzer::{AnalysisResult, AnalyzerSettings, Degradation, SentimentAnalyzer};
pub use batch::{BatchReport, BatchStatistics};
pub use confidence::ConfidenceStrategy;
pub use config::{AnalyzerConfig, CliConfig, FileConfig};
pub use error::{ConfigError, Error, InferenceError};
pub use model::{ScoreModel, StarModel};
pub use polarity::PolarityPredictor;
pub use preprocessing::{TfidfVectorizer, Vectorizer};
pub use rating::{RatingPredictor, StarRating};
pub use sentiment::{classify_sentiment, SentimentLabel, ThresholdConfig};

/// Star Prediction
/// Loads the artifacts named by `config` and rates a single review
pub fn star_prediction(config: &AnalyzerConfig, review: &str) -> Result<AnalysisResult, Error> {
    let analyzer: SentimentAnalyzer = SentimentAnalyzer::from_config(config)?;
    analyzer.analyze(review)
}
