use chrono::{DateTime, Local};
use csv::{Reader, Writer};
use ndarray::Array2;
use ndarray_csv::Array2Reader;
use serde::Serialize;
use tracing::info;

use std::fs::File;
use std::path::Path;

use crate::analyzer::{AnalysisResult, Degradation};
use crate::error::Error;

/// Review column of the scraped bank-review datasets
pub const DEFAULT_REVIEW_COLUMN: &str = "Review Text";

/// One exported line of analysis history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
  pub timestamp: String,
  pub rating: f64,
  pub sentiment: String,
  pub confidence: f64,
  pub text: String,
  /// Empty for a clean analysis
  pub degraded: Option<Degradation>,
}

impl HistoryRecord {
  pub fn new(result: &AnalysisResult, at: DateTime<Local>) -> Self {
    Self {
      timestamp: at.format("%Y-%m-%d %H:%M:%S").to_string(),
      rating: result.rating.value(),
      sentiment: result.sentiment.to_string(),
      confidence: result.confidence,
      text: result.text_preview.clone(),
      degraded: result.degraded,
    }
  }
}

fn clean(reviews: impl IntoIterator<Item = String>) -> Vec<String> {
  reviews
    .into_iter()
    .map(|review| review.trim().to_string())
    .filter(|review| !review.is_empty())
    .collect()
}

/// Reads reviews from a CSV file, picking `column` by header name. Without a
/// name, the `Review Text` column is used if present, else the first one.
pub fn load_csv_reviews(path: &Path, column: Option<&str>) -> Result<Vec<String>, Error> {
  let file: File = File::open(path)?;
  let mut reader: Reader<File> = Reader::from_reader(file);
  let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

  let index: usize = match column {
    Some(name) => headers
      .iter()
      .position(|h| h == name)
      .ok_or_else(|| Error::MissingColumn { column: name.to_string(), path: path.to_path_buf() })?,
    None => headers.iter().position(|h| h == DEFAULT_REVIEW_COLUMN).unwrap_or(0),
  };

  let data: Array2<String> = reader.deserialize_array2_dynamic()?;
  if data.ncols() == 0 {
    return Ok(Vec::new());
  }
  Ok(clean(data.column(index).to_vec()))
}

/// Reads one review per line
pub fn load_text_reviews(path: &Path) -> Result<Vec<String>, Error> {
  let content: String = std::fs::read_to_string(path)?;
  Ok(clean(content.lines().map(str::to_string)))
}

/// Load Reviews
/// `.csv` files are read by column, anything else line by line
pub fn load_reviews(path: &Path, column: Option<&str>) -> Result<Vec<String>, Error> {
  let is_csv: bool = path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
  let reviews: Vec<String> = if is_csv { load_csv_reviews(path, column)? } else { load_text_reviews(path)? };
  info!("Loaded {} reviews from {:?}", reviews.len(), path);
  Ok(reviews)
}

/// Export Results
/// Writes analysis history as CSV, one row per result
pub fn export_results(path: &Path, results: &[AnalysisResult]) -> Result<usize, Error> {
  let now: DateTime<Local> = Local::now();
  let mut writer: Writer<File> = Writer::from_path(path)?;
  for result in results {
    writer.serialize(HistoryRecord::new(result, now))?;
  }
  writer.flush()?;
  info!("Exported {} records to {:?}", results.len(), path);
  Ok(results.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analyzer::preview;
  use crate::rating::StarRating;
  use crate::sentiment::SentimentLabel;
  use tempfile::tempdir;

  fn result(text: &str, raw: f64, sentiment: SentimentLabel) -> AnalysisResult {
    AnalysisResult {
      rating: StarRating::from_raw_score(raw),
      sentiment,
      confidence: 0.42,
      text: text.to_string(),
      text_preview: preview(text, 100),
      degraded: None,
    }
  }

  #[test]
  fn it_reads_the_review_column_of_a_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reviews.csv");
    std::fs::write(
      &path,
      "Stars,Review Text\n5,\"Accueil chaleureux, merci\"\n1,Injoignable au téléphone\n3,  \n",
    )
    .unwrap();

    let reviews: Vec<String> = load_reviews(&path, None).unwrap();
    assert_eq!(reviews, vec!["Accueil chaleureux, merci", "Injoignable au téléphone"]);

    let stars: Vec<String> = load_reviews(&path, Some("Stars")).unwrap();
    assert_eq!(stars, vec!["5", "1", "3"]);

    assert!(matches!(load_reviews(&path, Some("Commentaire")), Err(Error::MissingColumn { .. })));
  }

  #[test]
  fn it_reads_one_review_per_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reviews.txt");
    std::fs::write(&path, "Très bonne banque\n\n   \nFrais trop élevés  \n").unwrap();
    assert_eq!(load_reviews(&path, None).unwrap(), vec!["Très bonne banque", "Frais trop élevés"]);
  }

  #[test]
  fn it_exports_history_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");
    let mut masked: AnalysisResult = result("Agence fermée sans prévenir", 3.0, SentimentLabel::Neutral);
    masked.degraded = Some(Degradation::Rating);
    let results = vec![
      result("Service impeccable", 4.9, SentimentLabel::Positive),
      result("Attente interminable, conseiller absent", 1.4, SentimentLabel::Negative),
      masked,
    ];
    assert_eq!(export_results(&path, &results).unwrap(), 3);

    let mut reader: Reader<File> = Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, vec!["timestamp", "rating", "sentiment", "confidence", "text", "degraded"]);

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][5], "");
    assert_eq!(&rows[2][5], "rating");
    assert_eq!(&rows[0][1], "5.0");
    assert_eq!(&rows[1][2], "negative");
    assert_eq!(&rows[1][4], "Attente interminable, conseiller absent");
    assert_eq!(rows[0][0].len(), "2024-01-01 00:00:00".len());
  }
}
