/*
polinews - single-shot CLI
Fetches political news for a query from every configured provider, scores the
result set for bias and credibility, and prints the digest as JSON on stdout.
Logs go to stderr.
*/

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use polinews::aggregator::{AggregateRequest, Aggregator, AggregatorSettings, DEFAULT_HOURS};
use polinews::analysis::BiasEngine;
use polinews::digest::Digest;
use polinews::providers::active_providers;
use polinews::reference::ReferenceData;
use polinews::report::DEFAULT_TOP_K;
use polinews::AggregateError;

#[derive(Parser, Debug)]
#[command(name = "polinews", about = "Political news aggregation and bias scoring")]
struct Args {
    /// Search query, e.g. `senate budget vote`
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Freshness window in hours (default from config, else 24)
    #[arg(long)]
    hours: Option<u32>,

    /// Distinct sources we want represented; a shortfall is only reported
    #[arg(long)]
    min_sources: Option<usize>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logs on stderr so stdout stays pure JSON
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(AggregateError::AggregationFailed { failures }) = e.downcast_ref::<AggregateError>() {
                eprintln!("No news sources available: all {} providers failed", failures.len());
                for failure in failures {
                    eprintln!("  - {}", failure);
                }
            } else {
                error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    // API keys usually live in a local .env file
    if dotenv::dotenv().is_ok() {
        info!(".env loaded");
    }

    let config = load_config(args.config).await?;

    let reference = match config.scoring.reference_path.as_deref() {
        Some(path) => ReferenceData::from_file(path)
            .await
            .with_context(|| format!("failed to load reference data from {}", path))?,
        None => ReferenceData::builtin(),
    };
    info!(version = %reference.version, "reference data loaded");

    let providers = active_providers(&config.providers, |key| std::env::var(key).ok())?;
    if providers.is_empty() {
        warn!("no provider has an API key configured; the digest will be empty");
    }
    let aggregator = Aggregator::new(providers, AggregatorSettings::from_config(&config.aggregation));

    let query = args.query.join(" ");
    let hours = args
        .hours
        .or(config.aggregation.default_hours)
        .unwrap_or(DEFAULT_HOURS);
    let mut request = AggregateRequest::new(query.clone(), hours);
    if let Some(min_sources) = args.min_sources {
        request = request.with_min_sources(min_sources);
    }

    let outcome = aggregator.aggregate(&request).await?;

    let engine = BiasEngine::with_top_k(reference, config.scoring.report_top_k.unwrap_or(DEFAULT_TOP_K));
    let (report, analyses) = engine.analyze(&outcome.articles);

    let digest = Digest::new(query, hours, outcome, report, analyses);
    let json = digest.to_json(!args.compact).context("failed to serialize digest")?;
    println!("{}", json);
    Ok(())
}

async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    info!(default = ?default_path, override_file = ?override_path, "configuration loaded");
    Ok(config)
}
