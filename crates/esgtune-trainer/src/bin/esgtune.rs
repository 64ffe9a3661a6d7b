//! esgtune command-line interface.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use esgtune_trainer::pipeline;
use esgtune_trainer::{ExperimentTracker, JsonlTracker, PipelineConfig, TracingTracker};

#[derive(Parser)]
#[command(name = "esgtune")]
#[command(about = "ESG report classification pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline configuration file
    #[arg(short, long, env = "ESGTUNE_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Append params and metrics to this JSONL file instead of the log
    #[arg(short, long, env = "ESGTUNE_TRACKING_FILE")]
    tracking_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the label CSV, clean report text and merge labels
    Convert,
    /// Split the labelled reports into train and validation
    Dataset,
    /// Chunk both splits with the configured tokenizer
    Tokenize,
    /// Compute class weights of the training chunks
    Weights,
    /// Train the classifier and save it
    Train,
    /// Tune thresholds and report metrics for stored predictions
    Evaluate {
        /// JSONL file of {"labels": [...], "logits": [...]} rows
        #[arg(short, long)]
        predictions: PathBuf,
    },
    /// Run convert, dataset, tokenize and train in order
    Run,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("esgtune=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_file(&cli.config)?;
    let mut tracker: Box<dyn ExperimentTracker> = match &cli.tracking_file {
        Some(path) => Box::new(JsonlTracker::open(path)?),
        None => Box::new(TracingTracker),
    };

    match cli.command {
        Commands::Convert => {
            let stats = pipeline::convert(&config)?;
            info!(matched = stats.matched, unmatched = stats.unmatched, "conversion done");
        }
        Commands::Dataset => {
            pipeline::dataset(&config)?;
        }
        Commands::Tokenize => {
            pipeline::tokenize(&config)?;
        }
        Commands::Weights => {
            let weights = pipeline::weights(&config, tracker.as_mut())?;
            println!("{}", serde_json::to_string(&weights)?);
        }
        Commands::Train => {
            pipeline::train(&config, tracker.as_mut())?;
        }
        Commands::Evaluate { predictions } => {
            let evaluation = pipeline::evaluate_predictions(&predictions, &config)?;
            tracker.log_report(&evaluation.report, None)?;
            println!("{}", serde_json::to_string_pretty(&evaluation.report)?);
        }
        Commands::Run => {
            info!("running full pipeline");
            pipeline::convert(&config)?;
            pipeline::dataset(&config)?;
            pipeline::tokenize(&config)?;
            pipeline::train(&config, tracker.as_mut())?;
        }
    }

    Ok(())
}
