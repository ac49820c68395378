//! # Name Encoding
//!
//! Validation of element names and their URL-safe encoded form.
//!
//! The encoded form uses `application/x-www-form-urlencoded` rules (spaces
//! become `+`), which is exactly how the oracle expects names in its query
//! string.

use crate::AlchemyError;
use crate::primitives::{KEY_SEPARATOR, MAX_NAME_LENGTH};

/// Encode an element name for use in a URL query component.
#[must_use]
pub fn encode_name(name: &str) -> String {
    form_urlencoded::byte_serialize(name.as_bytes()).collect()
}

/// Validate an element name before it reaches storage.
///
/// # Errors
///
/// Returns `AlchemyError::InvalidName` if the name is empty, longer than
/// `MAX_NAME_LENGTH` bytes, or contains the key separator.
pub fn validate_name(name: &str) -> Result<(), AlchemyError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH || name.contains(KEY_SEPARATOR) {
        return Err(AlchemyError::InvalidName(name.to_string()));
    }
    Ok(())
}
