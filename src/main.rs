use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::path::PathBuf;

use lib_review_stars::dataset::{export_results, load_reviews};
use lib_review_stars::{
    AnalysisResult, AnalyzerConfig, BatchReport, CliConfig, ConfidenceStrategy, FileConfig, PolarityPredictor,
    SentimentAnalyzer, SentimentLabel, ThresholdConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThresholdPreset {
    /// positive from 4 stars, neutral from 3
    Standard,
    /// positive from 3.5 stars, neutral from 2.5
    Lenient,
}

impl From<ThresholdPreset> for ThresholdConfig {
    fn from(preset: ThresholdPreset) -> Self {
        match preset {
            ThresholdPreset::Standard => ThresholdConfig::STANDARD,
            ThresholdPreset::Lenient => ThresholdConfig::LENIENT,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfidenceArg {
    Heuristic,
    Probabilistic,
}

impl From<ConfidenceArg> for ConfidenceStrategy {
    fn from(arg: ConfidenceArg) -> Self {
        match arg {
            ConfidenceArg::Heuristic => ConfidenceStrategy::Heuristic,
            ConfidenceArg::Probabilistic => ConfidenceStrategy::Probabilistic,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(about = "Star rating and sentiment for French bank reviews")]
struct CliArgs {
    /// Optional JSON config file. Its values override the flags below.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Path to the serialized star model.
    #[clap(long)]
    pub model: Option<PathBuf>,

    /// Path to the serialized TF-IDF vectorizer.
    #[clap(long)]
    pub vectorizer: Option<PathBuf>,

    /// Sentiment cut-points.
    #[clap(long, value_enum)]
    pub thresholds: Option<ThresholdPreset>,

    /// How confidence scores are computed.
    #[clap(long, value_enum)]
    pub confidence: Option<ConfidenceArg>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rate a single review.
    Analyze {
        /// Review text; several words are joined with spaces.
        #[clap(required = true)]
        text: Vec<String>,
    },
    /// Rate every review of a text file (one per line) or CSV file.
    Batch {
        file: PathBuf,

        /// CSV column holding the reviews.
        #[clap(long)]
        column: Option<String>,

        /// Write the per-review results to this CSV file.
        #[clap(long)]
        export: Option<PathBuf>,

        /// Number of per-review lines to print.
        #[clap(long, default_value_t = 50)]
        list: usize,
    },
    /// Label a single review positive or negative with the binary model.
    Polarity {
        /// Path to the serialized binary sentiment model.
        #[clap(long)]
        sentiment_model: PathBuf,

        #[clap(required = true)]
        text: Vec<String>,
    },
}

fn print_result(result: &AnalysisResult) {
    println!("Rating: \t{} ({})", result.rating.stars(), result.rating);
    println!("Sentiment: \t{}", result.sentiment);
    println!("Confidence: \t{:.1}%", result.confidence * 100.0);
    if let Some(degradation) = result.degraded {
        println!("Degraded: \t{:?}", degradation);
    }
}

fn print_report(report: &BatchReport, list: usize) {
    let stats = &report.statistics;
    println!("Reviews: \t{} ({} skipped)", stats.total_reviews, stats.skipped_reviews);
    if stats.total_reviews == 0 {
        return;
    }
    println!("Average: \t{:.2} ★", stats.avg_rating);
    println!("Positive: \t{:.1}%", stats.positive_pct);
    println!("Neutral: \t{:.1}%", stats.neutral_pct);
    println!("Negative: \t{:.1}%", stats.negative_pct);

    for result in report.counted_results().take(list) {
        let short: String = lib_review_stars::analyzer::preview(&result.text, 50);
        println!("{:.1}★ - {} - {}", result.rating.value(), result.sentiment, short);
    }
}

fn review_text(words: &[String]) -> Result<String> {
    let review: String = words.join(" ");
    if review.trim().is_empty() {
        bail!("Please enter some text to analyze");
    }
    Ok(review)
}

fn load_analyzer(cli_config: &CliConfig, file_config: Option<FileConfig>) -> Result<SentimentAnalyzer> {
    let config: AnalyzerConfig = AnalyzerConfig::resolve(cli_config, file_config)?;
    SentimentAnalyzer::from_config(&config).context("Failed to load models")
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config: Option<FileConfig> = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        model_path: cli_args.model.clone(),
        vectorizer_path: cli_args.vectorizer.clone(),
        thresholds: cli_args.thresholds.map(Into::into),
        confidence: cli_args.confidence.map(Into::into),
    };

    match cli_args.command {
        Command::Analyze { text } => {
            let review: String = review_text(&text)?;
            let analyzer: SentimentAnalyzer = load_analyzer(&cli_config, file_config)?;
            let result: AnalysisResult = analyzer.analyze(&review)?;
            print_result(&result);
        }
        Command::Batch { file, column, export, list } => {
            let reviews: Vec<String> = load_reviews(&file, column.as_deref())
                .with_context(|| format!("Failed to load reviews from {:?}", file))?;
            if reviews.is_empty() {
                bail!("No reviews found in {:?}", file);
            }
            let analyzer: SentimentAnalyzer = load_analyzer(&cli_config, file_config)?;
            let report: BatchReport = analyzer.analyze_batch(&reviews);
            print_report(&report, list);

            if let Some(path) = export {
                let written: usize = export_results(&path, &report.results)
                    .with_context(|| format!("Export failed: {:?}", path))?;
                println!("Exported {} records to {:?}", written, path);
            }
        }
        Command::Polarity { sentiment_model, text } => {
            let review: String = review_text(&text)?;
            let vectorizer_path: PathBuf = file_config
                .and_then(|file| file.vectorizer_path)
                .or(cli_config.vectorizer_path)
                .context("vectorizer_path must be given on the command line or in the config file")?;
            let polarity: PolarityPredictor = PolarityPredictor::from_paths(&sentiment_model, &vectorizer_path)
                .context("Failed to load the sentiment model")?;
            let label: SentimentLabel = polarity.predict_polarity(&review)?;
            println!("Sentiment: \t{}", label);
        }
    }

    Ok(())
}
