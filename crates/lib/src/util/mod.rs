//! Shared utilities.
//!
//! Hashing helpers used for output paths, and test helpers.

pub mod hash;

#[cfg(test)]
pub mod testutil;
