use serde::Deserialize;

use std::path::{Path, PathBuf};

use crate::analyzer::{AnalyzerSettings, DEFAULT_PREVIEW_CHARS};
use crate::confidence::ConfidenceStrategy;
use crate::error::ConfigError;
use crate::sentiment::ThresholdConfig;

/// Optional JSON override file. Every field may be omitted.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FileConfig {
  pub model_path: Option<PathBuf>,
  pub vectorizer_path: Option<PathBuf>,
  pub thresholds: Option<ThresholdConfig>,
  pub confidence: Option<ConfidenceStrategy>,
  pub preview_chars: Option<usize>,
}

impl FileConfig {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content: String =
      std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }
}

/// Values supplied by the caller before the config file is consulted.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
  pub model_path: Option<PathBuf>,
  pub vectorizer_path: Option<PathBuf>,
  pub thresholds: Option<ThresholdConfig>,
  pub confidence: Option<ConfidenceStrategy>,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
  pub model_path: PathBuf,
  pub vectorizer_path: PathBuf,
  pub settings: AnalyzerSettings,
}

impl AnalyzerConfig {
  /// Resolve configuration from CLI values and an optional config file.
  /// File values override CLI values where present.
  pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self, ConfigError> {
    let file: FileConfig = file_config.unwrap_or_default();

    let model_path: PathBuf = file
      .model_path
      .or_else(|| cli.model_path.clone())
      .ok_or(ConfigError::MissingPath("model_path"))?;
    let vectorizer_path: PathBuf = file
      .vectorizer_path
      .or_else(|| cli.vectorizer_path.clone())
      .ok_or(ConfigError::MissingPath("vectorizer_path"))?;

    let thresholds: ThresholdConfig = file.thresholds.or(cli.thresholds).unwrap_or_default().validated()?;

    let settings = AnalyzerSettings {
      thresholds,
      confidence: file.confidence.or(cli.confidence).unwrap_or_default(),
      preview_chars: file.preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS),
    };

    Ok(Self { model_path, vectorizer_path, settings })
  }
}
