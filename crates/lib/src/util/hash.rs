//! Hashing utilities for content signatures and content-addressed names.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hash
//! - `hash_bytes()` / `hash_str()`: Arbitrary data hashing
//! - `short_hash()`: A truncated prefix for readable file and namespace names

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::HASH_PREFIX_LEN;

/// A full 64-character SHA-256 hash.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// Returns the first [`HASH_PREFIX_LEN`] characters of the hash.
  pub fn short(&self) -> &str {
    short_hash(&self.0)
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA-256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

/// Hash a string's UTF-8 bytes.
pub fn hash_str(data: &str) -> ContentHash {
  hash_bytes(data.as_bytes())
}

/// Truncate a hex hash to [`HASH_PREFIX_LEN`] characters.
pub fn short_hash(full: &str) -> &str {
  &full[..HASH_PREFIX_LEN.min(full.len())]
}
