//! # CLI Command Implementations
//!
//! Store maintenance commands treat `AlreadyExists` and `NotFound` as
//! informational: they are logged and the command still succeeds.
//!
//! Only `run` and `seed` create database files. `status` and the removal
//! commands read or modify existing files and report an absent one as empty.

use crate::cancel::{CancellationToken, cancel_on_shutdown_signal};
use crate::config::Config;
use crate::discovery::Discovery;
use crate::error::DiscoveryError;
use crate::oracle::HttpOracle;
use alchemist_core::primitives::DEFAULT_SEEDS;
use alchemist_core::{
    AlchemyError, Element, ElementStore, RedbMetricsLog, RedbStore, StoreStats,
};
use std::path::Path;

/// Log a benign store outcome and carry on; propagate everything else.
fn tolerate_benign(outcome: Result<(), AlchemyError>) -> Result<bool, DiscoveryError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(e) if e.is_benign() => {
            tracing::info!("{}", e);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Open the store at `path` if the file is already there.
fn open_existing_store(path: &Path) -> Result<Option<RedbStore>, DiscoveryError> {
    if !path.is_file() {
        tracing::info!(database = %path.display(), "No store database yet");
        return Ok(None);
    }
    Ok(Some(RedbStore::open(path)?))
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Run the discovery loop until cancelled, the iteration limit, or a fatal error.
pub async fn cmd_run(
    config: &Config,
    json_mode: bool,
    iterations: Option<u64>,
) -> Result<(), DiscoveryError> {
    let store = RedbStore::open(&config.database)?;
    let metrics = RedbMetricsLog::open(&config.metrics_database)?;
    let oracle = HttpOracle::new(&config.oracle)?;

    let mut discovery = Discovery::new(store, oracle, metrics).with_pace(config.pace());
    if let Some(seed) = config.seed {
        discovery = discovery.with_seed(seed);
    }

    tracing::info!(
        database = %config.database.display(),
        metrics_database = %config.metrics_database.display(),
        oracle = %config.oracle.base_url,
        "Opened store and metrics log"
    );

    let cancel = CancellationToken::new();
    cancel_on_shutdown_signal(cancel.clone());

    let summary = discovery.run(&cancel, iterations).await?;

    if json_mode {
        let output = serde_json::json!({
            "agent_id": discovery.agent_id().to_string(),
            "iterations": summary.iterations,
            "skipped": summary.skipped,
            "oracle_calls": summary.oracle_calls,
            "new_elements": summary.new_elements,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Discovery Run Complete");
    println!("======================");
    println!("Agent:        {}", discovery.agent_id());
    println!("Iterations:   {}", summary.iterations);
    println!("Skipped:      {}", summary.skipped);
    println!("Oracle Calls: {}", summary.oracle_calls);
    println!("New Elements: {}", summary.new_elements);

    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Insert seed elements. Already-present seeds are reported, not failed.
pub fn cmd_seed(config: &Config, json_mode: bool, names: &[String]) -> Result<(), DiscoveryError> {
    let mut store = RedbStore::open(&config.database)?;

    let names: Vec<&str> = if names.is_empty() {
        DEFAULT_SEEDS.to_vec()
    } else {
        names.iter().map(String::as_str).collect()
    };

    let mut inserted = Vec::new();
    for name in names {
        if tolerate_benign(store.insert_element(Element::new(name)))? {
            inserted.push(name);
        }
    }

    if json_mode {
        let output = serde_json::json!({
            "inserted": inserted,
            "elements": store.count_elements()?,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Seeded {} element(s)", inserted.len());
    for name in &inserted {
        println!("  + {}", name);
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store and metrics log counts.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), DiscoveryError> {
    let stats = match open_existing_store(&config.database)? {
        Some(store) => store.stats()?,
        None => StoreStats::default(),
    };
    let calls = if config.metrics_database.is_file() {
        RedbMetricsLog::open(&config.metrics_database)?.len()?
    } else {
        0
    };

    if json_mode {
        let output = serde_json::json!({
            "database": config.database.to_string_lossy(),
            "metrics_database": config.metrics_database.to_string_lossy(),
            "elements": stats.elements,
            "combos": stats.combos,
            "first_discoveries": stats.discoveries,
            "oracle_calls": calls,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Alchemist Store Status");
    println!("======================");
    println!("Database: {:?}", config.database);
    println!("Metrics:  {:?}", config.metrics_database);
    println!();
    println!("Elements:          {}", stats.elements);
    println!("Combos:            {}", stats.combos);
    println!("First Discoveries: {}", stats.discoveries);
    println!("Oracle Calls:      {}", calls);

    Ok(())
}

// =============================================================================
// REMOVAL COMMANDS
// =============================================================================

/// Remove one element. A missing element is reported, not failed.
pub fn cmd_remove_element(config: &Config, name: &str) -> Result<(), DiscoveryError> {
    let Some(mut store) = open_existing_store(&config.database)? else {
        return Ok(());
    };
    if tolerate_benign(store.remove_element(name))? {
        println!("Removed element {}", name);
    }
    Ok(())
}

/// Remove one combo edge. A missing combo is reported, not failed.
pub fn cmd_remove_combo(
    config: &Config,
    a: &str,
    b: &str,
    result: &str,
) -> Result<(), DiscoveryError> {
    let Some(mut store) = open_existing_store(&config.database)? else {
        return Ok(());
    };
    if tolerate_benign(store.remove_combo(a, b, result))? {
        println!("Removed combo {} + {} = {}", a, b, result);
    }
    Ok(())
}
