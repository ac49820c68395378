//! # Core Type Definitions
//!
//! This module contains the data model of the discovery space:
//! - Discovered entities (`Element`)
//! - Pairing facts (`Combo`, `ComboKey`)
//! - Oracle audit records (`MetricRecord`)
//! - Store statistics (`StoreStats`)
//! - Error types (`AlchemyError`)

use crate::encoding::encode_name;
use crate::primitives::KEY_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE TYPE
// =============================================================================

/// Type discriminator stamped on every stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// A discovered entity.
    Element,
    /// A pairing fact.
    Combo,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element => f.write_str("Element"),
            Self::Combo => f.write_str("Combo"),
        }
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// A discovered entity, keyed by its case-sensitive `name`.
///
/// `encoded_name` is derived from `name`; stores recompute it on insert and
/// never trust the value supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Unique name (primary key).
    pub name: String,
    /// URL-safe encoding of `name`.
    pub encoded_name: String,
    /// True only if the oracle reported this as a first-ever discovery.
    pub is_new: bool,
    /// Decorative emoji passed through verbatim from the oracle.
    pub emoji: Option<String>,
}

impl Element {
    /// Create a plain element (not a first discovery, no decoration).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            encoded_name: encode_name(&name),
            name,
            is_new: false,
            emoji: None,
        }
    }

    /// Mark whether the oracle reported a first-ever discovery.
    #[must_use]
    pub fn discovered(mut self, is_new: bool) -> Self {
        self.is_new = is_new;
        self
    }

    /// Attach a decorative emoji.
    #[must_use]
    pub fn with_emoji(mut self, emoji: Option<String>) -> Self {
        self.emoji = emoji;
        self
    }

    /// Recompute the derived fields from `name`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.encoded_name = encode_name(&self.name);
        self
    }
}

// =============================================================================
// COMBO
// =============================================================================

/// Canonical dedup key of a combo: the unordered pair plus the result.
///
/// `(A, B, R)` and `(B, A, R)` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComboKey {
    /// Lexicographically smaller input.
    pub lo: String,
    /// Lexicographically larger input.
    pub hi: String,
    /// The produced element.
    pub result: String,
}

impl ComboKey {
    /// Build the canonical key for `{a, b} -> result`.
    #[must_use]
    pub fn new(a: &str, b: &str, result: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            lo: lo.to_string(),
            hi: hi.to_string(),
            result: result.to_string(),
        }
    }

    /// Prefix shared by every storage key of the unordered pair `{a, b}`.
    #[must_use]
    pub fn pair_prefix(a: &str, b: &str) -> String {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        format!("{lo}{KEY_SEPARATOR}{hi}{KEY_SEPARATOR}")
    }

    /// Flat storage key: `lo \0 hi \0 result`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.lo, self.hi, self.result
        )
    }
}

/// A recorded fact: combining `a` and `b` yields `result`.
///
/// `a` and `b` keep the order in which the pair was sent to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combo {
    /// Store-assigned identifier.
    pub id: u64,
    /// First input.
    pub a: String,
    /// Second input.
    pub b: String,
    /// The produced element name.
    pub result: String,
}

impl Combo {
    /// The canonical dedup key of this combo.
    #[must_use]
    pub fn key(&self) -> ComboKey {
        ComboKey::new(&self.a, &self.b, &self.result)
    }
}

// =============================================================================
// METRIC RECORD
// =============================================================================

/// Append-only audit of one oracle interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Identity of the running agent that made the call.
    pub agent_id: String,
    /// The element name returned by the oracle.
    pub result: String,
    /// The exact URL that was requested.
    pub url: String,
    /// HTTP status of the response.
    pub http_status: u16,
    /// Client clock at request time (RFC 1123, GMT).
    pub requested_at: String,
    /// Server clock from the response `Date` header.
    pub responded_at: Option<String>,
}

// =============================================================================
// STORE STATISTICS
// =============================================================================

/// Aggregate counts over a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of distinct elements.
    pub elements: u64,
    /// Number of combo edges.
    pub combos: u64,
    /// Number of elements that were first-ever discoveries.
    pub discoveries: u64,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Alchemist store.
///
/// `AlreadyExists` and `NotFound` are benign: callers log and continue.
/// Everything else is fatal to the running agent.
#[derive(Debug, Error)]
pub enum AlchemyError {
    /// An insert found a matching node already present.
    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: NodeType, key: String },

    /// A removal found no matching node.
    #[error("{kind} not found: {key}")]
    NotFound { kind: NodeType, key: String },

    /// The store holds no elements, so no pair can be formed.
    #[error("Store is empty: no pair can be formed")]
    EmptyStore,

    /// Sampling hit a position with no element behind it.
    #[error("No element at sample position {offset} (bound {bound})")]
    SampleMiss { offset: u64, bound: u64 },

    /// The element name cannot be stored.
    #[error("Invalid element name: {0:?}")]
    InvalidName(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or database transport error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl AlchemyError {
    /// Whether this error is an expected outcome that callers swallow.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::NotFound { .. })
    }
}

// =============================================================================
// TESTS
// =============================================================================
