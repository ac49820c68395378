//! # redb-backed Element Store
//!
//! A disk-backed element/combo store using the redb embedded database.
//!
//! redb provides:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! ## Transactions
//!
//! Every mutation runs in exactly one write transaction: the existence check,
//! the write and the commit. Any early return drops the transaction, which
//! aborts it, so no exit path leaves a half-applied mutation behind.

use super::{io_err, ser_err};
use crate::store::ElementStore;
use crate::{AlchemyError, Combo, ComboKey, Element, NodeType, StoreStats, validate_name};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Table for elements: name -> serialized `StoredElement`
const ELEMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("elements");

/// Table for the dense sampling order: position -> name
const ELEMENT_ORDER: TableDefinition<u64, &str> = TableDefinition::new("element_order");

/// Table for combos: `lo \0 hi \0 result` -> serialized `StoredCombo`
const COMBOS: TableDefinition<&str, &[u8]> = TableDefinition::new("combos");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

#[derive(Debug, Serialize, Deserialize)]
struct StoredElement {
    node_type: NodeType,
    position: u64,
    element: Element,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCombo {
    node_type: NodeType,
    combo: Combo,
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AlchemyError> {
    postcard::from_bytes(bytes).map_err(ser_err)
}

/// A disk-backed element store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AlchemyError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(io_err)?;
        {
            write_txn.open_table(ELEMENTS).map_err(io_err)?;
            write_txn.open_table(ELEMENT_ORDER).map_err(io_err)?;
            write_txn.open_table(COMBOS).map_err(io_err)?;
            write_txn.open_table(METADATA).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        Ok(Self { db })
    }

    /// All combo edges in key order.
    pub fn combos(&self) -> Result<Vec<Combo>, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(COMBOS).map_err(io_err)?;

        let mut combos = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let stored: StoredCombo = decode(value.value())?;
            combos.push(stored.combo);
        }
        Ok(combos)
    }
}

// =============================================================================
// ELEMENTSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl ElementStore for RedbStore {
    fn element_exists(&self, name: &str) -> Result<bool, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ELEMENTS).map_err(io_err)?;
        Ok(table.get(name).map_err(io_err)?.is_some())
    }

    fn get_element(&self, name: &str) -> Result<Option<Element>, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ELEMENTS).map_err(io_err)?;
        match table.get(name).map_err(io_err)? {
            Some(data) => {
                let stored: StoredElement = decode(data.value())?;
                Ok(Some(stored.element))
            }
            None => Ok(None),
        }
    }

    fn insert_element(&mut self, element: Element) -> Result<(), AlchemyError> {
        validate_name(&element.name)?;
        let element = element.normalized();
        let name = element.name.clone();

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut elements = write_txn.open_table(ELEMENTS).map_err(io_err)?;
            if elements.get(name.as_str()).map_err(io_err)?.is_some() {
                return Err(AlchemyError::AlreadyExists {
                    kind: NodeType::Element,
                    key: name,
                });
            }

            let mut order = write_txn.open_table(ELEMENT_ORDER).map_err(io_err)?;
            let position = order.len().map_err(io_err)?;
            let stored = StoredElement {
                node_type: NodeType::Element,
                position,
                element,
            };
            let bytes = postcard::to_allocvec(&stored).map_err(ser_err)?;

            elements
                .insert(name.as_str(), bytes.as_slice())
                .map_err(io_err)?;
            order.insert(position, name.as_str()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn remove_element(&mut self, name: &str) -> Result<(), AlchemyError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut elements = write_txn.open_table(ELEMENTS).map_err(io_err)?;
            let mut order = write_txn.open_table(ELEMENT_ORDER).map_err(io_err)?;

            let removed: Option<StoredElement> = elements
                .remove(name)
                .map_err(io_err)?
                .map(|data| decode(data.value()))
                .transpose()?;
            let Some(removed) = removed else {
                return Err(AlchemyError::NotFound {
                    kind: NodeType::Element,
                    key: name.to_string(),
                });
            };

            // Move the last element into the freed slot to keep positions dense.
            let last = order.len().map_err(io_err)?.saturating_sub(1);
            if removed.position != last {
                let moved_name = order
                    .get(last)
                    .map_err(io_err)?
                    .map(|data| data.value().to_string())
                    .ok_or_else(|| io_err(format!("sampling order has no position {last}")))?;
                let mut moved: StoredElement = elements
                    .get(moved_name.as_str())
                    .map_err(io_err)?
                    .map(|data| decode(data.value()))
                    .transpose()?
                    .ok_or_else(|| io_err(format!("element {moved_name:?} missing from index")))?;
                moved.position = removed.position;
                let bytes = postcard::to_allocvec(&moved).map_err(ser_err)?;

                elements
                    .insert(moved_name.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
                order
                    .insert(removed.position, moved_name.as_str())
                    .map_err(io_err)?;
            }
            order.remove(last).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn combo_exists(&self, a: &str, b: &str) -> Result<bool, AlchemyError> {
        let prefix = ComboKey::pair_prefix(a, b);
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(COMBOS).map_err(io_err)?;

        // Keys are sorted, so the first key at or after the prefix decides.
        let mut range = table.range(prefix.as_str()..).map_err(io_err)?;
        match range.next() {
            Some(entry) => {
                let (key, _) = entry.map_err(io_err)?;
                Ok(key.value().starts_with(prefix.as_str()))
            }
            None => Ok(false),
        }
    }

    fn combo_exists_with_result(
        &self,
        a: &str,
        b: &str,
        result: &str,
    ) -> Result<bool, AlchemyError> {
        let key = ComboKey::new(a, b, result).storage_key();
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(COMBOS).map_err(io_err)?;
        Ok(table.get(key.as_str()).map_err(io_err)?.is_some())
    }

    fn insert_combo(&mut self, a: &str, b: &str, result: &str) -> Result<(), AlchemyError> {
        for name in [a, b, result] {
            validate_name(name)?;
        }
        let key = ComboKey::new(a, b, result).storage_key();

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut combos = write_txn.open_table(COMBOS).map_err(io_err)?;
            if combos.get(key.as_str()).map_err(io_err)?.is_some() {
                return Err(AlchemyError::AlreadyExists {
                    kind: NodeType::Combo,
                    key: format!("{a} + {b} = {result}"),
                });
            }

            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            let id = meta
                .get("next_combo_id")
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            meta.insert("next_combo_id", id.saturating_add(1))
                .map_err(io_err)?;

            let stored = StoredCombo {
                node_type: NodeType::Combo,
                combo: Combo {
                    id,
                    a: a.to_string(),
                    b: b.to_string(),
                    result: result.to_string(),
                },
            };
            let bytes = postcard::to_allocvec(&stored).map_err(ser_err)?;
            combos
                .insert(key.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn remove_combo(&mut self, a: &str, b: &str, result: &str) -> Result<(), AlchemyError> {
        let key = ComboKey::new(a, b, result).storage_key();

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut combos = write_txn.open_table(COMBOS).map_err(io_err)?;
            if combos.remove(key.as_str()).map_err(io_err)?.is_none() {
                return Err(AlchemyError::NotFound {
                    kind: NodeType::Combo,
                    key: format!("{a} + {b} = {result}"),
                });
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn count_elements(&self) -> Result<u64, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ELEMENT_ORDER).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    fn element_at(&self, position: u64) -> Result<Option<String>, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ELEMENT_ORDER).map_err(io_err)?;
        Ok(table
            .get(position)
            .map_err(io_err)?
            .map(|data| data.value().to_string()))
    }

    fn stats(&self) -> Result<StoreStats, AlchemyError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let elements = read_txn.open_table(ELEMENTS).map_err(io_err)?;
        let combos = read_txn.open_table(COMBOS).map_err(io_err)?;

        let mut discoveries = 0u64;
        for entry in elements.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let stored: StoredElement = decode(value.value())?;
            if stored.element.is_new {
                discoveries = discoveries.saturating_add(1);
            }
        }

        Ok(StoreStats {
            elements: elements.len().map_err(io_err)?,
            combos: combos.len().map_err(io_err)?,
            discoveries,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
