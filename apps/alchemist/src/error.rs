//! # Error Classification
//!
//! Every failure the agent can surface, split into the fatal kinds that end
//! the process. Benign store outcomes (`AlreadyExists`, `NotFound`) never
//! reach this type: the discovery loop and the CLI swallow them with a log
//! line.

use crate::oracle::OracleError;
use alchemist_core::AlchemyError;
use thiserror::Error;

/// Errors that terminate the agent.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The store or metrics log failed (transport, corruption, empty store).
    #[error(transparent)]
    Store(#[from] AlchemyError),

    /// The oracle refused the call, was unreachable, or answered garbage.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}
