//! Command-line front end of the negotiation engine.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use negotiation_engine::comparator::AlgorithmComparator;
use negotiation_engine::config::ComparatorConfig;
use negotiation_engine::fitness::{
    weighted_penalty, EvaluationObserver, FitnessModel, JsonLinesRecorder, LogObserver, PenaltyWeights,
};
use negotiation_engine::offer::{Offer, Quality};
use negotiation_engine::profile::NegotiationRequest;
use negotiation_engine::result::Algorithm;
use negotiation_engine::utils::{format_duration, save_json};
use serde::Serialize;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "negotiation-engine", version, about = "Bilateral offer negotiation with MPSO, ABC and GA")]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run MPSO, ABC and GA for every seller and compare them
    Compare(RunArgs),
    /// Run a single optimizer for every seller
    Run {
        #[arg(short, long, value_parser = clap::value_parser!(Algorithm))]
        algorithm: Algorithm,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Rank every seller's MPSO offer and recommend the best one
    Negotiate(RunArgs),
    /// Score one offer against every seller of a request
    Score {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        delivery: u32,
        /// Quality label (Economy, Standard, Premium) or value in [0.3, 1.0]
        #[arg(long)]
        quality: String,
        /// Also print the legacy weighted-penalty score (lower is better)
        #[arg(long)]
        penalty: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Request JSON with buyer, sellers and optional weights
    #[arg(short, long)]
    input: PathBuf,
    /// Comparator configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Master seed, overriding the configuration
    #[arg(short, long)]
    seed: Option<u64>,
    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Append evaluation and run records as JSON lines
    #[arg(short, long)]
    trace: Option<PathBuf>,
}

impl RunArgs {
    fn load(&self) -> Result<(NegotiationRequest, AlgorithmComparator)> {
        let request = NegotiationRequest::from_file(&self.input)
            .with_context(|| format!("failed to load request {}", self.input.display()))?;
        let mut config = match &self.config {
            Some(path) => ComparatorConfig::from_file(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?,
            None => ComparatorConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok((request, AlgorithmComparator::new(config)?))
    }

    fn observer(&self) -> Result<Box<dyn EvaluationObserver>> {
        Ok(match &self.trace {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("failed to open trace file {}", path.display()))?;
                Box::new(JsonLinesRecorder::new(BufWriter::new(file)))
            }
            None => Box::new(LogObserver),
        })
    }

    fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        match &self.output {
            Some(path) => {
                save_json(value, path)?;
                info!("Result written to {}", path.display());
            }
            None => println!("{}", serde_json::to_string_pretty(value)?),
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let start_time = Instant::now();

    match &cli.command {
        Command::Compare(args) => {
            let (request, comparator) = args.load()?;
            let mut observer = args.observer()?;
            let report = comparator.compare(&request, observer.as_mut())?;
            args.emit(&report)?;
        }
        Command::Run { algorithm, args } => {
            let (request, comparator) = args.load()?;
            let mut observer = args.observer()?;
            let results = comparator.run_single(*algorithm, &request, observer.as_mut())?;
            let results: Vec<_> = results
                .into_iter()
                .map(|(manufacturer_id, result)| json!({ "manufacturerId": manufacturer_id, "result": result }))
                .collect();
            args.emit(&results)?;
        }
        Command::Negotiate(args) => {
            let (request, comparator) = args.load()?;
            let mut observer = args.observer()?;
            let outcome = comparator.negotiate(&request, observer.as_mut())?;
            args.emit(&outcome)?;
        }
        Command::Score {
            input,
            price,
            delivery,
            quality,
            penalty,
        } => {
            let request = NegotiationRequest::from_file(input)
                .with_context(|| format!("failed to load request {}", input.display()))?;
            request.validate()?;
            let quality = match quality.parse::<f64>() {
                Ok(value) => Quality::from_value(value),
                Err(_) => serde_json::from_value(json!(quality))?,
            };
            let offer = Offer::new(*price, *delivery, quality);

            let mut scores = Vec::with_capacity(request.sellers.len());
            for seller in &request.sellers {
                let model = FitnessModel::new(&request.buyer, seller, request.weights)?;
                scores.push(json!({ "sellerId": seller.id, "evaluation": model.evaluate(&offer) }));
            }
            let mut output = json!({ "offer": offer, "scores": scores });
            if *penalty {
                output["weightedPenalty"] = json!(weighted_penalty(
                    offer.price,
                    offer.delivery as f64,
                    offer.quality.percent(),
                    &PenaltyWeights::default(),
                ));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    info!("Done in {}", format_duration(start_time.elapsed()));
    Ok(())
}
