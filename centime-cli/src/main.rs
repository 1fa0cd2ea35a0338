use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use centime_core::config::EngineConfig;
use centime_core::result::CategorizationStatus;
use centime_engine::{
    BatchCancellation, CategorizationEngine, CircuitBreaker, ConcurrentProcessor,
    InMemorySharedTier, PatternCache, WorkerPool,
};

mod csv_input;
mod pattern_file;

#[derive(Parser, Debug)]
#[command(name = "centime", version, about = "Pattern-based spending categorization")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Categorize a CSV of transactions against a pattern file
    Categorize {
        /// Pattern definition file (JSON)
        #[arg(long)]
        patterns: PathBuf,

        /// Transaction CSV (id,timestamp,merchant,description,amount,currency)
        #[arg(long)]
        transactions: PathBuf,

        /// Shared backend pool size; the worker pool uses one less
        #[arg(long, default_value_t = 5)]
        pool_size: usize,

        /// Optional per-batch concurrency override (clamped to the pool)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Emit results as JSON lines instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check a pattern file for values that can never match
    Validate {
        /// Pattern definition file (JSON)
        #[arg(long)]
        patterns: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Categorize {
            patterns,
            transactions,
            pool_size,
            concurrency,
            json,
        } => categorize(patterns, transactions, pool_size, concurrency, json).await,
        Command::Validate { patterns } => validate(patterns),
    }
}

async fn categorize(
    patterns: PathBuf,
    transactions: PathBuf,
    pool_size: usize,
    concurrency: Option<usize>,
    json: bool,
) -> Result<()> {
    let (store, pattern_count) = pattern_file::load_into_store(&patterns)?;
    let store = Arc::new(store);
    let txns = csv_input::parse_transactions_csv(&transactions)?;
    eprintln!(
        "{} patterns loaded, {} transactions to categorize",
        pattern_count,
        txns.len()
    );

    let config = EngineConfig::default();
    let breaker = Arc::new(CircuitBreaker::new(
        config.breaker_failure_threshold,
        config.breaker_cooldown,
    ));
    let cache = Arc::new(PatternCache::new(
        Arc::new(InMemorySharedTier::new()),
        store.clone(),
        breaker,
    ));
    let engine = Arc::new(CategorizationEngine::new(cache, config)?);
    let pool = Arc::new(WorkerPool::new(pool_size).context("sizing worker pool")?);
    let processor = ConcurrentProcessor::new(engine.clone(), pool);

    let results = processor
        .categorize_batch_with(txns, concurrency, &BatchCancellation::new())
        .await;

    for result in &results {
        if json {
            println!("{}", serde_json::to_string(result)?);
            continue;
        }
        let category = result
            .category_id
            .and_then(|id| store.category(id))
            .map(|c| c.name)
            .unwrap_or_else(|| "-".to_string());
        let status = match result.status {
            CategorizationStatus::Matched => "matched",
            CategorizationStatus::NoMatch => "no_match",
            CategorizationStatus::Timeout => "timeout",
            CategorizationStatus::Error => "error",
        };
        println!(
            "{:<20} {:<10} {:<20} {:>5.2}  {}",
            result.transaction_id,
            status,
            category,
            result.confidence,
            result.reason.as_deref().unwrap_or("")
        );
    }

    let stats = engine.stats();
    eprintln!(
        "processed={} matched={} no_match={} timeouts={} errors={} cache_degraded={}",
        stats.processed, stats.matched, stats.no_match, stats.timeouts, stats.errors,
        stats.cache_degraded
    );
    Ok(())
}

fn validate(patterns: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&patterns)
        .with_context(|| format!("reading {}", patterns.display()))?;
    let file: pattern_file::PatternFile =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", patterns.display()))?;
    let problems = pattern_file::validate(&file);
    if problems.is_empty() {
        println!("all pattern values parse cleanly");
        return Ok(());
    }
    for problem in &problems {
        println!("never matches: {problem}");
    }
    anyhow::bail!("{} pattern value(s) can never match", problems.len())
}
