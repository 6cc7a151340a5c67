#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Error types for bucket sizing and file I/O.
pub mod error;

/// A keyed map over the chained [`HashTable`].
///
/// This module provides a `HashMap` that hashes keys with a configurable
/// `BuildHasher` and exposes the insert/remove/lookup protocol as boolean
/// results.
pub mod hash_map;

pub mod hash_table;

/// Prime bucket-array sizing.
pub mod prime;

#[cfg(feature = "std")]
pub mod persist;

#[cfg(all(test, feature = "std"))]
mod test_support;

#[cfg(feature = "std")]
pub use error::Error;
pub use error::PrimeError;
pub use hash_map::DefaultHashBuilder;
pub use hash_map::HashMap;
pub use hash_table::HashTable;
#[cfg(feature = "std")]
pub use persist::LoadSummary;
