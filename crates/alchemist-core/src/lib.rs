//! # alchemist-core
//!
//! The deduplicated discovery store for Alchemist - THE LOGIC.
//!
//! This crate records what the combination oracle has taught the agent:
//! every discovered [`Element`] exactly once, every [`Combo`] edge exactly
//! once per `({A, B}, Result)`, and an append-only [`MetricRecord`] per
//! oracle call.
//!
//! ## Layout
//!
//! - `types` - data model and the error taxonomy
//! - `encoding` - name validation and URL-safe encoding
//! - `store` - the `ElementStore` trait and the in-memory `MemoryStore`
//! - `metrics` - the `MetricsSink` trait and the in-memory `MemoryMetrics`
//! - `storage` - redb-backed `RedbStore` and `RedbMetricsLog`
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - Dedup is enforced by an existence check performed inside the same write
//!   transaction as the insert; the backends have no uniqueness primitive
//!   for the unordered `{A, B}` pair
//! - Randomness is injected by the caller, never owned by the store

// =============================================================================
// MODULES
// =============================================================================

pub mod encoding;
pub mod metrics;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use encoding::{encode_name, validate_name};
pub use metrics::{MemoryMetrics, MetricsSink};
pub use storage::{RedbMetricsLog, RedbStore};
pub use store::{ElementStore, MemoryStore};
pub use types::{AlchemyError, Combo, ComboKey, Element, MetricRecord, NodeType, StoreStats};
