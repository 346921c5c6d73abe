//! Hashing utilities for output paths.
//!
//! Planned artifacts live under directories named after the kit that built
//! them, and object files carry a hash of their source path so two sources with
//! the same stem never collide.

use sha2::{Digest, Sha256};

/// Full lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  format!("{:x}", hasher.finalize())
}

/// The first `len` hex characters of the SHA-256 of `data`.
pub fn short_hash(data: &[u8], len: usize) -> String {
  let mut full = hash_bytes(data);
  full.truncate(len);
  full
}
