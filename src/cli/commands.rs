//! Implementation of the fibcache CLI commands.

use std::path::PathBuf;

use futures::future;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::driver::{parse_index, FibonacciDriver};
use crate::types::config::Config;
use crate::types::errors::ComputeError;
use crate::FibcacheResult;

/// Outcome of one requested index.
#[derive(Debug, Serialize)]
pub struct IndexOutcome {
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a `compute` run.
#[derive(Debug, Serialize)]
pub struct ComputeReport {
    pub results: Vec<IndexOutcome>,
    pub evaluations: u64,
    pub cache: CacheStats,
}

impl ComputeReport {
    fn new(
        indices: &[u64],
        outcomes: &[Result<u128, ComputeError>],
        driver: &FibonacciDriver,
    ) -> Self {
        let results = indices
            .iter()
            .zip(outcomes)
            .map(|(&index, outcome)| IndexOutcome {
                index,
                value: outcome.as_ref().ok().copied(),
                error: outcome.as_ref().err().map(ToString::to_string),
            })
            .collect();

        Self {
            results,
            evaluations: driver.evaluations(),
            cache: driver.cache().stats(),
        }
    }
}

/// Computes all requested indices concurrently on one shared driver.
pub async fn compute(indices: &[String], json: bool, config: &Config) -> FibcacheResult<()> {
    // Every index is validated before any computation starts.
    let indices = indices
        .iter()
        .map(|raw| parse_index(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let driver = FibonacciDriver::from_config(&config.driver);
    tracing::info!("Computing {} indices concurrently", indices.len());

    let outcomes =
        future::join_all(indices.iter().map(|&index| driver.compute_index(index))).await;
    let report = ComputeReport::new(&indices, &outcomes, &driver);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match outcomes.into_iter().find_map(Result::err) {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn print_report(report: &ComputeReport) {
    for outcome in &report.results {
        match (&outcome.value, &outcome.error) {
            (Some(value), _) => println!("fib({}) = {}", outcome.index, value),
            (None, Some(error)) => println!("fib({}) failed: {}", outcome.index, error),
            (None, None) => {}
        }
    }

    let stats = &report.cache;
    println!();
    println!("Recurrence evaluations: {}", report.evaluations);
    println!(
        "Cache: {} resolved, {} hits, {} coalesced, {} computed, {} failed",
        stats.resolved, stats.hits, stats.coalesced, stats.misses, stats.failures
    );
}

/// Prints the sequence from 0 up to the given index.
pub async fn sequence(upto: &str, config: &Config) -> FibcacheResult<()> {
    let upto = parse_index(upto)?;
    let driver = FibonacciDriver::from_config(&config.driver);

    let values = driver.sequence(upto).await?;
    for (index, value) in values.iter().enumerate() {
        println!("fib({}) = {}", index, value);
    }

    tracing::debug!(evaluations = driver.evaluations(), "sequence complete");
    Ok(())
}

/// Writes a default configuration in the specified directory.
pub async fn init(path: Option<PathBuf>) -> FibcacheResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("fibcache.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    Config::default_config().save(&config_path)?;

    println!("Configuration created at: {}", config_path.display());
    Ok(())
}

/// Shows the effective configuration.
pub fn config_cmd(config: &Config) -> FibcacheResult<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Shows version.
pub fn version() {
    println!("fibcache {}", env!("CARGO_PKG_VERSION"));
}
