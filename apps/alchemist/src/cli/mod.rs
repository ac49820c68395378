//! # Alchemist CLI Module
//!
//! ## Available Commands
//!
//! - `run` - Start the discovery loop
//! - `seed` - Insert seed elements into the store
//! - `status` - Show store and metrics counts
//! - `remove-element` - Delete one element
//! - `remove-combo` - Delete one combo edge

mod commands;

use crate::config::Config;
use crate::error::DiscoveryError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Alchemist - combinatorial discovery agent
///
/// Repeatedly combines two known elements through the oracle and keeps
/// every new element and combination it learns.
#[derive(Parser, Debug)]
#[command(name = "alchemist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./alchemist.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the element store database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to the metrics log database
    #[arg(short = 'M', long, global = true)]
    pub metrics_database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the discovery loop until Ctrl-C or a fatal error
    Run {
        /// Stop after this many iterations
        #[arg(short = 'n', long)]
        iterations: Option<u64>,

        /// Pause between iterations in milliseconds
        #[arg(short, long)]
        pace_ms: Option<u64>,

        /// Fixed RNG seed for reproducible sampling
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Insert seed elements (Water, Fire, Wind, Earth when none given)
    Seed {
        /// Element names to insert
        names: Vec<String>,
    },

    /// Show store status
    Status,

    /// Remove an element from the store
    RemoveElement {
        /// Element name
        name: String,
    },

    /// Remove a combo edge from the store
    RemoveCombo {
        /// First input element
        a: String,
        /// Second input element
        b: String,
        /// Resulting element
        result: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration: file, then environment, then CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<Config, DiscoveryError> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(db) = &cli.database {
        config.database.clone_from(db);
    }
    if let Some(db) = &cli.metrics_database {
        config.metrics_database.clone_from(db);
    }
    if let Some(Commands::Run { pace_ms, seed, .. }) = &cli.command {
        if let Some(pace) = pace_ms {
            config.pace_ms = *pace;
        }
        if seed.is_some() {
            config.seed = *seed;
        }
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), DiscoveryError> {
    let config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Run { iterations, .. }) => cmd_run(&config, json_mode, iterations).await,
        Some(Commands::Seed { names }) => cmd_seed(&config, json_mode, &names),
        Some(Commands::RemoveElement { name }) => cmd_remove_element(&config, &name),
        Some(Commands::RemoveCombo { a, b, result }) => {
            cmd_remove_combo(&config, &a, &b, &result)
        }
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
    }
}
