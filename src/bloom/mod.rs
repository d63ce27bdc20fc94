// SPDX-License-Identifier: CC0-1.0

//! Bloom filter support for BIP37-style transaction filtering.
//!
//! A light client inserts the data it cares about (transaction ids,
//! outpoints, script constants) into a [`BloomFilter`] and ships the filter's
//! wire form to a peer, which then relays only matching transactions. False
//! positives are expected and are what preserves the client's privacy; false
//! negatives never happen.

pub mod builder;
pub mod error;
pub mod filter;
pub mod hash;

pub use self::builder::BloomFilterBuilder;
pub use self::error::BloomError;
pub use self::filter::{BloomFilter, BloomFlags, MAX_BLOOM_FILTER_SIZE, MAX_HASH_FUNCS};
pub use self::hash::murmur3;
