// SPDX-License-Identifier: CC0-1.0

//! Bloom filter error types.

use thiserror::Error;

/// Errors that can occur when constructing a bloom filter.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum BloomError {
    /// Filter size exceeds the maximum allowed (36 000 bytes).
    #[error("filter size {0} exceeds maximum of 36000 bytes")]
    FilterTooLarge(usize),
    /// A filter must hold at least one byte of data.
    #[error("filter data is empty")]
    EmptyFilter,
    /// Number of hash functions outside the allowed range.
    #[error("hash function count {0} outside the allowed range 1..=50")]
    InvalidHashFuncs(u32),
    /// Invalid false positive rate (must be strictly between 0 and 1).
    #[error("invalid false positive rate {0}, must be between 0 and 1")]
    InvalidFalsePositiveRate(f64),
    /// Invalid number of elements (must be greater than 0).
    #[error("invalid element count {0}, must be greater than 0")]
    InvalidElementCount(u32),
}
