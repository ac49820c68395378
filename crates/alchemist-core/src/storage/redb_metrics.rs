//! # redb-backed Metrics Log
//!
//! Append-only log of `MetricRecord`s, one JSON document per oracle call,
//! keyed by a monotonically increasing sequence number.

use super::{io_err, ser_err};
use crate::metrics::MetricsSink;
use crate::{AlchemyError, MetricRecord};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for records: sequence -> JSON document bytes
const METRIC_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("metric_log");

/// A disk-backed, append-only metrics log.
pub struct RedbMetricsLog {
    db: Database,
}

impl std::fmt::Debug for RedbMetricsLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbMetricsLog").finish_non_exhaustive()
    }
}

impl RedbMetricsLog {
    /// Open or create a metrics log at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AlchemyError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;
        let write_txn = db.begin_write().map_err(io_err)?;
        write_txn.open_table(METRIC_LOG).map_err(io_err)?;
        write_txn.commit().map_err(io_err)?;
        Ok(Self { db })
    }

    /// Number of records appended over the log's lifetime.
    pub fn len(&self) -> Result<u64, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(METRIC_LOG).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    /// Whether no record was ever appended.
    pub fn is_empty(&self) -> Result<bool, AlchemyError> {
        Ok(self.len()? == 0)
    }

    /// Records written by one agent, in append order.
    pub fn records_for(&self, agent_id: &str) -> Result<Vec<MetricRecord>, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(METRIC_LOG).map_err(io_err)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let record: MetricRecord = serde_json::from_slice(value.value()).map_err(ser_err)?;
            if record.agent_id == agent_id {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl MetricsSink for RedbMetricsLog {
    fn record(&mut self, record: &MetricRecord) -> Result<(), AlchemyError> {
        let bytes = serde_json::to_vec(record).map_err(ser_err)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(METRIC_LOG).map_err(io_err)?;
            let sequence = table
                .last()
                .map_err(io_err)?
                .map(|(key, _)| key.value().saturating_add(1))
                .unwrap_or(0);
            table
                .insert(sequence, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}
