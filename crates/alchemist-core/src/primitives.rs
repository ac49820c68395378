//! # Store Primitives
//!
//! Fixed limits and defaults compiled into the store.

/// Maximum length in bytes of an element name.
///
/// Names longer than this are rejected with `AlchemyError::InvalidName`.
pub const MAX_NAME_LENGTH: usize = 4096;

/// Separator used inside composite combo keys.
///
/// Element names may never contain it, so `lo \0 hi \0 result` is unambiguous.
pub const KEY_SEPARATOR: char = '\0';

/// The base elements every fresh discovery space starts from.
pub const DEFAULT_SEEDS: [&str; 4] = ["Water", "Fire", "Wind", "Earth"];
