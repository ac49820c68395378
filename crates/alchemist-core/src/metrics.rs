//! # Metrics Sink
//!
//! Append-only audit log of oracle calls.

use crate::{AlchemyError, MetricRecord};

/// Appends one record per oracle call. Records are never read back by the
/// discovery loop, updated or deleted.
pub trait MetricsSink {
    /// Append a record.
    fn record(&mut self, record: &MetricRecord) -> Result<(), AlchemyError>;
}

/// In-memory metrics sink.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    records: Vec<MetricRecord>,
}

impl MemoryMetrics {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended so far, in order.
    #[must_use]
    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }
}

impl MetricsSink for MemoryMetrics {
    fn record(&mut self, record: &MetricRecord) -> Result<(), AlchemyError> {
        self.records.push(record.clone());
        Ok(())
    }
}
