//! # Alchemist - Discovery Agent
//!
//! ## Usage
//!
//! ```bash
//! # Seed a fresh store with Water, Fire, Wind and Earth
//! alchemist seed
//!
//! # Explore until Ctrl-C
//! alchemist run
//!
//! # Bounded, reproducible run against a local oracle
//! ALCHEMIST_ORACLE_URL=http://127.0.0.1:9000/pair alchemist run -n 100 --seed 7
//!
//! alchemist status --json-mode
//! ```

use alchemist::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // ALCHEMIST_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("ALCHEMIST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "alchemist=info,alchemist_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
   ▄▀█ █   █▀▀ █ █ █▀▀ █▀▄▀█ █ █▀ ▀█▀
   █▀█ █▄▄ █▄▄ █▀█ ██▄ █ ▀ █ █ ▄█  █

  Discovery Agent v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
