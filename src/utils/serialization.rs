// src/utils/serialization.rs
//! Serialization utilities for the gatekeeper.
//!
//! Provides serialization and deserialization functions for:
//! - Raw JSON request bodies
//! - Canonical JSON bytes that feed hash commitments

use serde::{Deserialize, Serialize};

/// Deserializes a value from JSON bytes.
///
/// # Arguments
/// * `data` - JSON bytes to deserialize
///
/// # Returns
/// - `Ok(T)` with deserialized value on success
/// - `Err(serde_json::Error)` if deserialization fails
///
/// # Note
/// The lifetime parameter allows borrowing string data from the input.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a [u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Serializes a value to canonical JSON bytes.
///
/// Output is compact (no whitespace) and object keys come out in the order the
/// value serializes them. Callers that need key-order independence must use
/// sorted containers (`BTreeMap`) and structs with a fixed field order.
pub fn canonical_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(data)
}
