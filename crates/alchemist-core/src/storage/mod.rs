//! # Persistent Storage
//!
//! redb-backed implementations of `ElementStore` and `MetricsSink`.
//!
//! The store and the metrics log live in separate database files so that an
//! audit append never contends with a store write.

mod redb_metrics;
mod redb_store;

pub use redb_metrics::RedbMetricsLog;
pub use redb_store::RedbStore;

use crate::AlchemyError;

/// Map a redb or transport error into the store's I/O error.
pub(crate) fn io_err(e: impl std::fmt::Display) -> AlchemyError {
    AlchemyError::IoError(e.to_string())
}

/// Map an encode/decode error into the store's serialization error.
pub(crate) fn ser_err(e: impl std::fmt::Display) -> AlchemyError {
    AlchemyError::SerializationError(e.to_string())
}
