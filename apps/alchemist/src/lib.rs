//! # alchemist
//!
//! The discovery agent: a paced, cancellable loop that samples two known
//! elements, asks the combination oracle what they make, and persists the
//! answer into the `alchemist-core` store.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/alchemist (THE BINARY)              │
//! │                                                          │
//! │  ┌──────────┐   ┌─────────────────┐   ┌──────────────┐   │
//! │  │   CLI    │──▶│ Discovery Loop  │──▶│ Oracle Client│   │
//! │  │  (clap)  │   │ (tokio, paced)  │   │  (reqwest)   │   │
//! │  └──────────┘   └────────┬────────┘   └──────────────┘   │
//! │                          ▼                               │
//! │                 ┌─────────────────┐                      │
//! │                 │ alchemist-core  │                      │
//! │                 │  (THE LOGIC)    │                      │
//! │                 └─────────────────┘                      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod cancel;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod oracle;

pub use cancel::CancellationToken;
pub use config::Config;
pub use discovery::{Discovery, IterationOutcome, RunSummary};
pub use error::DiscoveryError;
pub use oracle::{HttpOracle, Oracle, OracleError, OracleReply, OracleResult};
