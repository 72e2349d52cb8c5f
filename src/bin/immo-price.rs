//! immo-price CLI
//!
//! # Usage
//!
//! ```bash
//! # Train with defaults (data_final.csv -> price_model.bin)
//! immo-price train
//!
//! # Train from a config file, overriding some values
//! immo-price train --config train.json --data listings.csv --seed 7 --catalog static/data.js
//!
//! # Predict one listing; the request is read from stdin without --request
//! echo '{"surface": 100, ...}' | immo-price predict --model price_model.bin
//! ```

use clap::{Args, Parser, Subcommand};
use immo_price::{ServingContext, TrainingConfig, TrainingPipeline};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "immo-price", version, about = "Real-estate price estimation")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model bundle from a listings file
    Train(TrainArgs),
    /// Predict the price of one listing
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// JSON training configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listings file (overrides the config)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Output bundle path (overrides the config)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Catalog export path, `.js` or `.json`
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Split and mini-batch seed
    #[arg(long)]
    seed: Option<u64>,

    /// Share of rows held out for evaluation
    #[arg(long)]
    test_ratio: Option<f64>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Model bundle written by `train`
    #[arg(short, long, default_value = "price_model.bin")]
    model: PathBuf,

    /// JSON request file; stdin when absent
    #[arg(short, long)]
    request: Option<PathBuf>,
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "immo_price=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_train(args: TrainArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => TrainingConfig::from_file(path).map_err(|e| e.to_string())?,
        None => TrainingConfig::default(),
    };
    if let Some(data) = args.data {
        config.data.dataset = data;
    }
    if let Some(out) = args.out {
        config.data.artifact = out;
    }
    if let Some(catalog) = args.catalog {
        config.data.catalog = Some(catalog);
    }
    if let Some(seed) = args.seed {
        config.split.seed = seed;
    }
    if let Some(ratio) = args.test_ratio {
        config.split.test_ratio = ratio;
    }

    let pipeline = TrainingPipeline::new(config).map_err(|e| e.to_string())?;
    let outcome = pipeline.run_and_save().map_err(|e| e.to_string())?;
    println!("{}", outcome.report);
    println!("Model saved to {}", pipeline.config().data.artifact.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<(), String> {
    let context = ServingContext::load(&args.model).map_err(|e| e.to_string())?;
    let body = match &args.request {
        Some(path) => std::fs::read_to_string(path).map_err(|e| e.to_string())?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| e.to_string())?;
            buf
        }
    };

    match context.respond(&body) {
        Ok(response) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?
            );
            Ok(())
        }
        Err(rejected) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&rejected).map_err(|e| e.to_string())?
            );
            Err(rejected.to_string())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Command::Train(args) => run_train(args),
        Command::Predict(args) => run_predict(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
